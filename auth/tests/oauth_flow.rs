use auth::{GoogleOAuth, OAuthSettings, Session, SessionCodec, DEFAULT_AUTH_URL};
use chrono::Utc;
use mocks::{expect_token, expect_userinfo, httptest::Server};

#[tokio::test]
async fn test_code_exchange_to_session_cookie() {
    let server = Server::run();
    expect_token(&server, "access-1", Some("refresh-1"));
    expect_userinfo(&server, "Ada Lovelace", "ada@example.com");

    let settings = OAuthSettings {
        client_id: "id".into(),
        client_secret: "secret".into(),
        auth_url: DEFAULT_AUTH_URL.into(),
        token_url: server.url_str("/token"),
        userinfo_url: server.url_str("/userinfo"),
        redirect_url: "http://localhost:3000/api/auth/callback/google".into(),
    };
    let oauth = GoogleOAuth::new(&settings).unwrap();
    let request = oauth.authorize();

    let tokens = oauth
        .exchange_code("code".into(), request.pkce_verifier)
        .await
        .unwrap();
    assert_eq!(tokens.access_token, "access-1");
    assert_eq!(tokens.refresh_token.as_deref(), Some("refresh-1"));

    let user = oauth.fetch_profile(&tokens.access_token).await.unwrap();
    assert_eq!(user.email.as_deref(), Some("ada@example.com"));

    let codec = SessionCodec::new(b"test-secret");
    let session = Session::new(tokens, user, Utc::now());
    let cookie_value = codec.encode(&session).unwrap();
    let header = format!("other=1; {}={}", auth::cookie::SESSION_COOKIE, cookie_value);

    let raw = auth::cookie::read_cookie(&header, auth::cookie::SESSION_COOKIE).unwrap();
    let decoded = codec.decode(raw).unwrap();
    assert_eq!(decoded.access_token, "access-1");
    assert_eq!(decoded.user.name.as_deref(), Some("Ada Lovelace"));
}
