use std::time::Duration;

use httpmock::Method::GET;
use httpmock::MockServer;
use fluent_request::{Request, RequestError, Transport};
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

fn unused_local_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}

#[test]
fn test_connection_refused_maps_to_code_7() {
    if !can_bind_localhost() {
        return;
    }

    let dir = tempfile::tempdir().expect("tempdir");
    let mut request = request_for(unused_local_url(), &dir);
    let err = request.execute().expect_err("nothing listens there");

    assert_eq!(err.transfer_code(), Some(7));
    assert!(err.to_string().starts_with("Error #7 : "));
    assert!(request.status().is_none());
    assert_eq!(request.to_string(), "");
}

#[test]
fn test_timeout_maps_to_code_28() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/slow");
        then.status(200).delay(Duration::from_secs(3)).body("late");
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let mut request = request_for(server.url("/slow"), &dir);
    request.set_timeout(1);
    let err = request.execute().expect_err("should time out");

    assert!(matches!(err, RequestError::Transfer { code: 28, .. }));
}

#[test]
fn test_failure_keeps_previous_response() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/ok");
        then.status(200).body("kept");
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let mut request = request_for(server.url("/ok"), &dir);
    request.execute().expect("first request");

    request.set_url(unused_local_url());
    request.execute().expect_err("second request fails");

    assert_eq!(request.to_string(), "kept");
    assert_eq!(request.status().map(|s| s.http_code), Some(200));
    let attempted = request.transport().info();
    assert_eq!(attempted.http_code, 0);
}

#[test]
fn test_unsupported_protocol_maps_to_code_1() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut request = request_for("ftp://127.0.0.1/file".to_string(), &dir);
    let err = request.execute().expect_err("ftp is not supported");
    assert_eq!(err.transfer_code(), Some(1));
}

#[test]
fn test_malformed_url_maps_to_code_3() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut request = request_for("not a url".to_string(), &dir);
    let err = request.execute().expect_err("malformed url");
    assert_eq!(err.transfer_code(), Some(3));

    request.set_url("");
    let err = request.execute().expect_err("empty url");
    assert_eq!(err.transfer_code(), Some(3));
}

#[test]
fn test_closed_request_fails_with_code_2() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut request = request_for("http://127.0.0.1:1/".to_string(), &dir);
    request.close();
    request.close();
    assert!(!request.transport().is_open());

    let err = request.execute().expect_err("handle released");
    assert_eq!(err.transfer_code(), Some(2));
}

#[test]
fn test_invalid_proxy_maps_to_code_5() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut extra = fluent_request::TransferOptions::new();
    extra.set(fluent_request::OptionKey::Proxy, "::not a proxy::");

    let mut request = request_for("http://127.0.0.1:1/".to_string(), &dir);
    request.set_extra_options(extra);
    let err = request.execute().expect_err("bad proxy");
    assert_eq!(err.transfer_code(), Some(5));
}

#[tokio::test]
async fn test_execute_inside_runtime_reports_transfer_error() {
    if !can_bind_localhost() {
        return;
    }

    let dir = tempfile::tempdir().expect("tempdir");
    let mut request = request_for(unused_local_url(), &dir);
    let err = request.execute().expect_err("nothing listens there");
    assert_eq!(err.transfer_code(), Some(7));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_execute_inside_runtime_completes_transfer() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/async-caller");
            then.status(200).body("from a runtime");
        })
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let mut request = request_for(server.url("/async-caller"), &dir);
    request.execute().expect("request should succeed");

    assert_eq!(request.response(), "from a runtime");
    mock.assert_async().await;
}
