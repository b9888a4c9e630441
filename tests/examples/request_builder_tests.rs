use jsonmock::prelude::*;
use serde_json::json;

use crate::common::RequestData;

#[test]
fn json_request_is_prepared() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    let m = server.mock_post("/customers", |when, then| {
        when.accept_json()
            .content_type_json()
            .request_content(r#"{"id":"1","name":"Mary"}"#);
        then.respond_status(201);
    });

    // Act
    let result = server.post_for_json_with("/customers", |req| {
        req.content_json(&RequestData {
            id: "1".to_string(),
            name: "Mary".to_string(),
        })
    });

    // Assert
    result
        .unwrap()
        .and_expect(|r| r.status().is_created())
        .unwrap();
    m.assert();
}

#[test]
fn request_is_available_after_dispatch() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock(|_, then| {
        then.respond_status(200);
    });

    // Act
    let result = server
        .get_for_json_with("/search", |req| req.param("q", "a&b").header("X-Trace", "1"))
        .unwrap();

    // Assert
    let request = result.request();
    assert_eq!(request.method(), &Method::GET);
    assert_eq!(request.uri_str(), "/search?q=a%26b");
    assert_eq!(request.header_values("accept"), vec!["application/json"]);
    assert_eq!(request.header_values("x-trace"), vec!["1"]);
}

#[test]
fn json_config_controls_request_bodies() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::with_config(JsonConfig::new().pretty(true));
    let m = server.mock(|when, then| {
        when.request_content("{\n  \"a\": 1\n}");
        then.respond_status(200);
    });

    // Act
    let result = server.put_for_json_with("/pretty", |req| {
        req.content_json(&serde_json::json!({ "a": 1 }))
    });

    // Assert
    assert!(result.is_ok());
    m.assert();
}

#[test]
fn invalid_request_is_reported() {
    let _ = env_logger::try_init();

    let server = MockServer::new();

    let err = RequestBuilder::get_template("/a/{first}/{second}", ["x"])
        .perform(&server)
        .unwrap_err();

    assert_eq!(
        err.message(),
        "Unable to build request - Invalid URI: Not enough variable values available to expand 'second'"
    );
}

#[test]
fn json_shortcuts_expand_uri_templates() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    let get_mock = server.mock(|when, then| {
        when.method(GET).request_to("/customers/42/orders/a%20b").accept_json();
        then.respond_json(|_| json!({ "orders": [] }));
    });
    let post_mock = server.mock(|when, then| {
        when.method(POST)
            .request_to("/customers/42/notes")
            .accept_json()
            .header("x-trace", ["abc"]);
        then.respond_status(201);
    });

    // Act
    let get = server.get_for_json_template("/customers/{id}/orders/{order}", ["42", "a b"]);
    let post = server.post_for_json_template_with("/customers/{id}/notes", [42], |req| {
        req.header("X-Trace", "abc")
    });
    let missing = server.get_for_json_template("/customers/{id}", Vec::<String>::new());

    // Assert
    assert!(get.is_ok());
    assert_eq!(post.unwrap().response().status(), StatusCode::CREATED);
    assert_eq!(
        missing.unwrap_err().message(),
        "Unable to build request - Invalid URI: Not enough variable values available to expand 'id'"
    );
    get_mock.assert();
    post_mock.assert();
}
