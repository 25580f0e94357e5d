use httptest::{matchers::*, responders::*, Expectation, Server};
use serde_json::{json, Value};

pub use httptest;

/// Create a mock server for the OAuth token endpoint.
/// The server will respond to POST `/token` with a fixed access token.
pub fn token_server(access_token: &str) -> Server {
    let server = Server::run();
    expect_token(&server, access_token, None);
    server
}

/// Expect any number of POSTs to `/token`, answering with the given tokens.
pub fn expect_token(server: &Server, access_token: &str, refresh_token: Option<&str>) {
    let mut body = json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3600
    });
    if let Some(refresh) = refresh_token {
        body["refresh_token"] = json!(refresh);
    }
    server.expect(
        Expectation::matching(request::method_path("POST", "/token"))
            .times(0..)
            .respond_with(json_encoded(body)),
    );
}

/// Expect POSTs to `/token` and reject them like a revoked grant.
pub fn expect_token_rejected(server: &Server) {
    server.expect(
        Expectation::matching(request::method_path("POST", "/token"))
            .times(0..)
            .respond_with(
                status_code(400)
                    .insert_header("content-type", "application/json")
                    .body(r#"{"error":"invalid_grant"}"#),
            ),
    );
}

/// Create an empty mock server for Google Drive API endpoints.
pub fn drive_server() -> Server {
    Server::run()
}

/// A Drive `files` resource as returned by the list call.
pub fn drive_file(id: &str, name: &str, mime_type: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "mimeType": mime_type,
        "thumbnailLink": format!("https://lh3.googleusercontent.com/{}=s220", id),
        "webViewLink": format!("https://drive.google.com/file/d/{}/view", id),
        "size": "2048",
        "createdTime": "2024-03-01T23:30:00.000Z",
        "imageMediaMetadata": { "width": 800, "height": 1200 }
    })
}

/// Expect a GET to `/drive/v3/files` for the given page.
/// `page_token == None` matches only requests without a `pageToken` parameter.
pub fn expect_list_page(
    server: &Server,
    page_token: Option<&str>,
    files: Vec<Value>,
    next_page_token: Option<&str>,
) {
    let body = json!({
        "files": files,
        "nextPageToken": next_page_token,
    });
    match page_token {
        Some(token) => server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/drive/v3/files"),
                request::query(url_decoded(contains(("pageToken", token.to_string())))),
            ])
            .times(0..)
            .respond_with(json_encoded(body)),
        ),
        None => server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/drive/v3/files"),
                request::query(url_decoded(not(contains(key("pageToken"))))),
            ])
            .times(0..)
            .respond_with(json_encoded(body)),
        ),
    }
}

/// Expect the list call to fail with the given status.
pub fn expect_list_error(server: &Server, status: u16, message: &str) {
    server.expect(
        Expectation::matching(request::method_path("GET", "/drive/v3/files"))
            .times(0..)
            .respond_with(status_code(status).body(message.to_string())),
    );
}

/// Expect a metadata lookup for `file_id`.
pub fn expect_metadata(server: &Server, file_id: &str, mime_type: &str, thumbnail_link: Option<&str>) {
    let path = format!("/drive/v3/files/{}", file_id);
    let mut body = json!({ "id": file_id, "mimeType": mime_type });
    if let Some(link) = thumbnail_link {
        body["thumbnailLink"] = json!(link);
    }
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", path),
            request::query(url_decoded(not(contains(key("alt"))))),
        ])
        .times(0..)
        .respond_with(json_encoded(body)),
    );
}

/// Expect a metadata lookup for an unknown file.
pub fn expect_metadata_missing(server: &Server, file_id: &str) {
    let path = format!("/drive/v3/files/{}", file_id);
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", path),
            request::query(url_decoded(not(contains(key("alt"))))),
        ])
        .times(0..)
        .respond_with(status_code(404).body(r#"{"error":{"code":404}}"#)),
    );
}

/// Expect a raw content download (`alt=media`).
pub fn expect_content(server: &Server, file_id: &str, mime_type: &str, bytes: &[u8]) {
    let path = format!("/drive/v3/files/{}", file_id);
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", path),
            request::query(url_decoded(contains(("alt", "media")))),
        ])
        .times(0..)
        .respond_with(
            status_code(200)
                .insert_header("content-type", mime_type.to_string())
                .body(bytes.to_vec()),
        ),
    );
}

/// Expect a GET on an arbitrary path serving image bytes (a thumbnail link).
pub fn expect_image(server: &Server, path: &str, mime_type: &str, bytes: &[u8]) {
    server.expect(
        Expectation::matching(request::method_path("GET", path.to_string()))
            .times(0..)
            .respond_with(
                status_code(200)
                    .insert_header("content-type", mime_type.to_string())
                    .body(bytes.to_vec()),
            ),
    );
}

/// Expect the OpenID userinfo call.
pub fn expect_userinfo(server: &Server, name: &str, email: &str) {
    server.expect(
        Expectation::matching(request::method_path("GET", "/userinfo"))
            .times(0..)
            .respond_with(json_encoded(json!({
                "name": name,
                "email": email,
                "picture": "https://example.com/avatar.png"
            }))),
    );
}
