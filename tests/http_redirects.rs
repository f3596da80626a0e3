use httpmock::Method::GET;
use httpmock::MockServer;
use fluent_request::{Request, RequestError};
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
fn test_follow_redirect_get() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start();
    let start = server.mock(|when, then| {
        when.method(GET).path("/start");
        then.status(302).header("Location", "/final");
    });
    let end = server.mock(|when, then| {
        when.method(GET).path("/final");
        then.status(200).body("ok");
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let mut request = request_for(server.url("/start"), &dir);
    request.execute().expect("request should succeed");

    assert_eq!(request.response(), "ok");
    let status = request.status().expect("status");
    assert_eq!(status.http_code, 200);
    assert_eq!(status.redirect_count, 1);
    assert_eq!(status.url, server.url("/final"));
    start.assert();
    end.assert();
}

#[test]
fn test_redirect_not_followed_when_disabled() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/start");
        then.status(301).header("Location", "/final").body("moved");
    });
    let end = server.mock(|when, then| {
        when.method(GET).path("/final");
        then.status(200).body("ok");
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let mut request = request_for(server.url("/start"), &dir);
    request.set_follow(false);
    request.execute().expect("request should succeed");

    assert_eq!(request.response(), "moved");
    assert_eq!(request.status().map(|s| s.http_code), Some(301));
    end.assert_hits(0);
}

#[test]
fn test_redirect_chain_stops_at_limit() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start();
    let hops: Vec<_> = (0..3)
        .map(|hop| {
            let location = format!("/hop{}", hop + 1);
            server.mock(|when, then| {
                when.method(GET).path(format!("/hop{}", hop));
                then.status(302).header("Location", location.as_str());
            })
        })
        .collect();
    let end = server.mock(|when, then| {
        when.method(GET).path("/hop3");
        then.status(200).body("ok");
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let mut request = request_for(server.url("/hop0"), &dir);
    request.set_max_redirects(2);
    let err = request.execute().expect_err("too many redirects");

    assert!(matches!(err, RequestError::Transfer { code: 47, .. }));
    assert!(err.to_string().starts_with("Error #47 : "));
    assert!(request.status().is_none());
    for hop in &hops {
        hop.assert();
    }
    end.assert_hits(0);
}

#[test]
fn test_redirect_chain_within_limit_succeeds() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start();
    for hop in 0..3 {
        let location = format!("/hop{}", hop + 1);
        server.mock(|when, then| {
            when.method(GET).path(format!("/hop{}", hop));
            then.status(302).header("Location", location.as_str());
        });
    }
    server.mock(|when, then| {
        when.method(GET).path("/hop3");
        then.status(200).body("ok");
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let mut request = request_for(server.url("/hop0"), &dir);
    request.set_max_redirects(3);
    request.execute().expect("three redirects are allowed");

    assert_eq!(request.response(), "ok");
    assert_eq!(request.status().map(|s| s.redirect_count), Some(3));
}

#[test]
fn test_zero_max_redirects_rejects_first_redirect() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/start");
        then.status(302).header("Location", "/final");
    });
    let end = server.mock(|when, then| {
        when.method(GET).path("/final");
        then.status(200).body("ok");
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let mut request = request_for(server.url("/start"), &dir);
    request.set_max_redirects(0);
    let err = request.execute().expect_err("redirect limit");

    assert_eq!(err.transfer_code(), Some(47));
    end.assert_hits(0);
}
