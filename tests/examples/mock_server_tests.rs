use jsonmock::prelude::*;

use crate::common::ResponseData;

fn call(server: &MockServer, method: Method, uri: &str) -> Result<String, AssertionError> {
    let response = RequestBuilder::new(method, uri)
        .perform(server)?
        .and_return();
    Ok(response.body_string())
}

#[test]
fn incorrect_method_is_reported() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock(|when, then| {
        when.request_to("/testendpoint").method(POST);
        then.respond_json(|_| ResponseData::new(2022, 7, 12, "OK"));
    });

    // Act
    let err = call(&server, GET, "/testendpoint").unwrap_err();

    // Assert
    assert_eq!(err.message(), "Request method incorrect; expected POST, was GET");
}

#[test]
fn mock_get_matches_get_requests() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    let m = server.mock_get("/testendpoint", |_, then| {
        then.respond_json(|_| ResponseData::new(2022, 7, 12, "OK"));
    });

    // Act
    let body = call(&server, GET, "/testendpoint").unwrap();

    // Assert
    assert_eq!(body, r#"{"date":"2022-07-12","extra":"OK"}"#);
    m.assert();
}

#[test]
fn mock_get_rejects_post_requests() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock_get("/testendpoint", |_, then| {
        then.respond_json(|_| ResponseData::new(2022, 7, 12, "OK"));
    });

    // Act
    let err = call(&server, POST, "/testendpoint").unwrap_err();

    // Assert
    assert_eq!(err.message(), "Request method incorrect; expected GET, was POST");
}

#[test]
fn mock_post_and_friends_filter_by_method() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    let post = server.mock_post("/a", |_, then| {
        then.respond("post");
    });
    let put = server.mock_put("/a", |_, then| {
        then.respond("put");
    });
    let patch = server.mock_patch("/a", |_, then| {
        then.respond("patch");
    });
    let delete = server.mock_delete("/a", |_, then| {
        then.respond("delete");
    });

    // Act
    let bodies: Vec<String> = [DELETE, PATCH, PUT, POST]
        .into_iter()
        .map(|method| call(&server, method, "/a").unwrap())
        .collect();

    // Assert
    assert_eq!(bodies, vec!["delete", "patch", "put", "post"]);
    for m in [post, put, patch, delete] {
        m.assert_hits(1);
    }
}

#[test]
fn multiple_requests_are_matched_in_sequence() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock(|when, then| {
        when.request_to("/testendpointA").method(GET);
        then.respond_json(|_| ResponseData::new(2022, 7, 12, "AAAA"));
    });
    server.mock(|when, then| {
        when.request_to("/testendpointB").method(GET);
        then.respond_json(|_| ResponseData::new(2022, 7, 12, "BBBB"));
    });

    // Act
    let a = call(&server, GET, "/testendpointA").unwrap();
    let b = call(&server, GET, "/testendpointB").unwrap();

    // Assert
    assert_eq!(a, r#"{"date":"2022-07-12","extra":"AAAA"}"#);
    assert_eq!(b, r#"{"date":"2022-07-12","extra":"BBBB"}"#);
    server.verify().unwrap();
}

#[test]
fn exhausted_mock_fails_at_dispatch_time() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock(|when, then| {
        when.request_to("/once");
        then.respond_status(204);
    });

    // Act
    let first = call(&server, GET, "/once");
    let second = call(&server, GET, "/once");

    // Assert
    assert!(first.is_ok());
    assert_eq!(
        second.unwrap_err().message(),
        "No further requests expected: HTTP GET /once\n1 request(s) executed."
    );
}

#[test]
fn best_candidate_failure_is_surfaced() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock(|when, then| {
        when.method(POST);
        then.respond_status(201);
    });
    server.mock(|when, then| {
        when.method(GET)
            .request_to("/customers")
            .header("X-Tenant", ["blue"]);
        then.respond_status(200);
    });

    // Act
    let err = RequestBuilder::get("/customers")
        .header("X-Tenant", "red")
        .perform(&server)
        .unwrap_err();

    // Assert
    assert_eq!(
        err.message(),
        "Request header [X-Tenant] incorrect; expected blue, was red"
    );
}

#[test]
fn mock_times_accepts_the_declared_number_of_calls() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    let m = server.mock_times(2..=3, |when, then| {
        when.request_to("/poll");
        then.respond("pending");
    });

    // Act
    for _ in 0..3 {
        call(&server, GET, "/poll").unwrap();
    }
    let fourth = call(&server, GET, "/poll");

    // Assert
    assert!(fourth.is_err());
    assert_eq!(m.hits(), 3);
    m.assert();
}

#[test]
fn mock_with_options_prechecks_method_and_uri() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    let options = MockOptions::new()
        .count(ExpectedCount::min(1))
        .method(PUT)
        .uri("/settings");
    let m = server.mock_with(options, |when, then| {
        when.content_type_json();
        then.respond_status(204);
    });

    // Act
    let response = RequestBuilder::put("/settings?force=true")
        .content_json(&serde_json::json!({ "dark": true }))
        .perform(&server)
        .unwrap()
        .and_return();

    // Assert
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    m.assert_hits(1);
}

#[test]
fn expect_without_response_fails_matching_requests() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    let _ = server.expect(matchers::request_to("/nothing"));

    // Act
    let err = call(&server, GET, "/nothing").unwrap_err();

    // Assert
    assert_eq!(
        err.message(),
        "No response has been defined for the mock matching HTTP GET /nothing"
    );
}

#[test]
fn requests_are_recorded_in_order() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock_times(ExpectedCount::many_times(), |_, then| {
        then.respond_status(200);
    });

    // Act
    call(&server, GET, "/one").unwrap();
    call(&server, DELETE, "/two").unwrap();

    // Assert
    let requests: Vec<String> = server.requests().iter().map(|r| r.to_string()).collect();
    assert_eq!(requests, vec!["HTTP GET /one", "HTTP DELETE /two"]);
}
