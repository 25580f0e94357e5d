use crate::{keys, KeyValueStore};
use chrono::{DateTime, Duration, Utc};

/// How recent a login must be, in hours, for the landing page to skip
/// straight to the gallery.
pub const AUTO_REDIRECT_WINDOW_HOURS: i64 = 48;

#[derive(Clone)]
pub struct LastLogin<S> {
    store: S,
}

impl<S: KeyValueStore> LastLogin<S> {
    pub fn new(store: S) -> Self {
        LastLogin { store }
    }

    pub fn record(&self, now: DateTime<Utc>) {
        if let Err(e) = self
            .store
            .set(keys::LAST_LOGIN, &now.timestamp_millis().to_string())
        {
            tracing::error!(error = %e, "Failed to record last login");
        }
    }

    pub fn get(&self) -> Option<DateTime<Utc>> {
        let raw = self.store.get(keys::LAST_LOGIN).ok().flatten()?;
        let millis = raw.trim().parse::<i64>().ok()?;
        DateTime::from_timestamp_millis(millis)
    }

    pub fn should_auto_redirect(&self, now: DateTime<Utc>, session_active: bool) -> bool {
        if !session_active {
            return false;
        }
        match self.get() {
            Some(last) => {
                now.signed_duration_since(last) <= Duration::hours(AUTO_REDIRECT_WINDOW_HOURS)
            }
            None => false,
        }
    }
}
