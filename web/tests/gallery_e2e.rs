use auth::{Session, SessionCodec, TokenPair, UserProfile};
use chrono::{FixedOffset, NaiveDate, Utc};
use gallery::{
    DateMethod, Driver, Gallery, GalleryOptions, GroupBy, HttpMediaSource, LoadState, LocalZone,
    Message, Orientation, OrientationSource,
};
use mocks::httptest::Server;
use mocks::{
    drive_file, expect_image, expect_list_page, expect_metadata, expect_token, expect_userinfo,
};
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;
use store::MemoryStore;
use web::{router, AppState, WebSettings};

const SECRET: &[u8] = b"e2e-secret";

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::new_rgb8(width, height)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn session_token() -> String {
    let now = Utc::now();
    let session = Session::new(
        TokenPair {
            access_token: "access".into(),
            refresh_token: Some("refresh".into()),
            expires_at: Some(now.timestamp() + 3600),
        },
        UserProfile {
            name: Some("Ada".into()),
            email: Some("ada@example.com".into()),
            picture: None,
        },
        now,
    );
    SessionCodec::new(SECRET).encode(&session).unwrap()
}

/// Serve the real router on an ephemeral port, backed by `drive`.
async fn spawn_server(drive: &Server) -> String {
    let settings = WebSettings {
        drive_api_url: drive.url_str(""),
        ..WebSettings::default()
    };
    let oauth = auth::GoogleOAuth::new(&auth::OAuthSettings {
        client_id: "id".into(),
        client_secret: "secret".into(),
        auth_url: auth::DEFAULT_AUTH_URL.into(),
        token_url: drive.url_str("/token"),
        userinfo_url: drive.url_str("/userinfo"),
        redirect_url: settings.redirect_url(),
    });
    let state = Arc::new(AppState::new(oauth, SessionCodec::new(SECRET), settings));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{}", addr)
}

fn options() -> GalleryOptions {
    GalleryOptions {
        local_zone: LocalZone::Fixed(FixedOffset::east_opt(0).unwrap()),
        today: NaiveDate::from_ymd_opt(2024, 3, 20),
        date_method: DateMethod::Utc,
        group_by: GroupBy::Orientation,
    }
}

#[tokio::test]
async fn test_gallery_scrolls_through_live_server() {
    let drive = Server::run();
    let link = drive.url_str("/thumb/b=s220");
    let undimensioned = json!({
        "id": "b",
        "name": "IMG_b.png",
        "mimeType": "image/png",
        "thumbnailLink": link,
        "createdTime": "2024-03-02T10:00:00.000Z"
    });
    expect_list_page(
        &drive,
        None,
        vec![
            drive_file("a", "a.jpg", "image/jpeg"),
            drive_file("doc", "report.pdf", "application/pdf"),
        ],
        Some("p2"),
    );
    expect_list_page(
        &drive,
        Some("p2"),
        vec![undimensioned, drive_file("v", "clip.mp4", "video/mp4")],
        None,
    );
    expect_metadata(&drive, "b", "image/png", Some(&link));
    expect_image(&drive, "/thumb/b=s1600", "image/png", &png(300, 100));
    expect_token(&drive, "unused", None);
    expect_userinfo(&drive, "Ada", "ada@example.com");

    let base = spawn_server(&drive).await;
    let driver = Driver::new(HttpMediaSource::new(&base, Some(session_token())));
    let mut gallery = Gallery::new(MemoryStore::new(), options());

    driver.dispatch(&mut gallery, Message::Mount).await;
    assert_eq!(gallery.files().len(), 1);
    assert_eq!(gallery.load_state(), LoadState::Idle);

    driver.dispatch(&mut gallery, Message::SentinelVisible).await;
    assert_eq!(gallery.files().len(), 3);
    assert_eq!(gallery.load_state(), LoadState::Exhausted);
    assert!(gallery.errors().is_empty());

    let measured = gallery.file("b").unwrap().clone();
    assert_eq!(
        gallery.orientation_of(&measured),
        (Orientation::Landscape, OrientationSource::Measured)
    );

    let session = driver.source().session().await.unwrap();
    assert_eq!(
        session.user.and_then(|u| u.email).as_deref(),
        Some("ada@example.com")
    );
}

#[tokio::test]
async fn test_gallery_without_session_shows_banner() {
    let drive = Server::run();
    let base = spawn_server(&drive).await;
    let driver = Driver::new(HttpMediaSource::new(&base, None));
    let mut gallery = Gallery::new(MemoryStore::new(), options());

    driver.dispatch(&mut gallery, Message::Mount).await;
    assert!(gallery.files().is_empty());
    assert_eq!(gallery.load_state(), LoadState::Idle);
    assert_eq!(
        gallery.errors().to_vec(),
        vec!["Failed to load media: Not authenticated - No session".to_string()]
    );
}
