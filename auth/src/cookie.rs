//! `Set-Cookie` / `Cookie` header helpers.

use crate::{OAUTH_STATE_TTL_SECS, SESSION_TTL_SECS};

pub const SESSION_COOKIE: &str = "drivepicz.session-token";
pub const STATE_COOKIE: &str = "drivepicz.oauth-state";

fn build(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, value, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn session_cookie(value: &str, secure: bool) -> String {
    build(SESSION_COOKIE, value, SESSION_TTL_SECS, secure)
}

pub fn state_cookie(value: &str, secure: bool) -> String {
    build(STATE_COOKIE, value, OAUTH_STATE_TTL_SECS, secure)
}

pub fn clear_cookie(name: &str, secure: bool) -> String {
    build(name, "", 0, secure)
}

/// Find `name` in a `Cookie` request header. Empty values count as absent.
pub fn read_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}
