use httpmock::Method::GET;
use httpmock::MockServer;
use fluent_request::{Request, TransferInfo};
use tempfile::TempDir;

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn request_for(url: String, dir: &TempDir) -> Request {
    let jar = dir.path().join("cookies.txt");
    let mut request = Request::new(url).expect("request should build");
    request
        .set_cookie_jar(jar.to_str().expect("utf-8 path"))
        .expect("cookie jar path");
    request
}

#[test]
fn test_get_returns_body_and_status() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/page");
        then.status(200)
            .header("Content-Type", "text/html; charset=utf-8")
            .body("<html>ok</html>");
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let mut request = request_for(server.url("/page"), &dir);
    let body = request.execute().expect("request should succeed").to_string();

    assert_eq!(body, "<html>ok</html>");
    let status = request.status().expect("status after execute");
    assert_eq!(status.http_code, 200);
    assert_eq!(status.url, server.url("/page"));
    assert_eq!(status.content_type.as_deref(), Some("text/html; charset=utf-8"));
    assert_eq!(status.size_download, 15);
    assert_eq!(status.redirect_count, 0);
    assert_eq!(status.primary_port, Some(server.port()));
    mock.assert();
}

#[test]
fn test_error_status_is_not_a_transfer_error() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/missing");
        then.status(404).body("not here");
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let mut request = request_for(server.url("/missing"), &dir);
    request.execute().expect("404 is still a completed transfer");

    assert_eq!(request.response(), "not here");
    assert_eq!(request.status().map(|s| s.http_code), Some(404));
}

#[test]
fn test_default_user_agent_is_sent() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/ua").header(
            "User-Agent",
            "Mozilla/5.0 (X11; U; Linux i686; fr; rv:1.9.1.1) Gecko/20090715 Firefox/3.5.1",
        );
        then.status(200).body("ok");
    });

    let dir = tempfile::tempdir().expect("tempdir");
    request_for(server.url("/ua"), &dir)
        .execute()
        .expect("request should succeed");
    mock.assert();
}

#[test]
fn test_custom_user_agent_is_sent() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/ua").header("User-Agent", "fluent-test/1.0");
        then.status(200).body("ok");
    });

    let dir = tempfile::tempdir().expect("tempdir");
    request_for(server.url("/ua"), &dir)
        .set_user_agent("fluent-test/1.0")
        .execute()
        .expect("request should succeed");
    mock.assert();
}

#[test]
fn test_repeated_execute_replaces_result() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/one");
        then.status(200).body("first");
    });
    server.mock(|when, then| {
        when.method(GET).path("/two");
        then.status(201).body("second");
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let mut request = request_for(server.url("/one"), &dir);
    request.execute().expect("first request");
    assert_eq!(request.to_string(), "first");

    request.set_url(server.url("/two"));
    request.execute().expect("second request");
    assert_eq!(request.to_string(), "second");
    assert_eq!(request.status().map(|s| s.http_code), Some(201));
}

#[test]
fn test_status_serializes_to_json() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/json");
        then.status(200).body("{}");
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let mut request = request_for(server.url("/json"), &dir);
    request.execute().expect("request should succeed");

    let status: &TransferInfo = request.status().expect("status");
    let json = status.to_json().expect("json");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(value["http_code"], 200);
}
