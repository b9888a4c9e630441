use jsonmock::prelude::*;

#[test]
fn request_to_ignores_query_string() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    let m = server.mock(|when, then| {
        when.request_to("/testendpoint");
        then.respond_status(200);
    });

    // Act
    let result = RequestBuilder::get("/testendpoint?abc=123").perform(&server);

    // Assert
    assert!(result.is_ok());
    m.assert();
}

#[test]
fn request_to_rejects_other_path() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock(|when, then| {
        when.request_to("/testendpoint");
        then.respond_status(200);
    });

    // Act
    let err = RequestBuilder::get("/other").perform(&server).unwrap_err();

    // Assert
    assert_eq!(
        err.message(),
        "Request URI doesn't match; expected /testendpoint, was /other"
    );
}

#[test]
fn request_to_compares_absolute_uris() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock(|when, then| {
        when.request_to("http://example.com:8080/api");
        then.respond_status(200);
    });

    // Act
    let same = RequestBuilder::get("http://example.com:8080/api?page=2").perform(&server);
    let other_port = RequestBuilder::get("http://example.com:9090/api").perform(&server);

    // Assert
    assert!(same.is_ok());
    assert!(other_port.is_err());
}

#[test]
fn request_to_compares_uris_as_written() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock(|when, then| {
        when.request_to("http://example.com/api");
        then.respond_status(200);
    });
    server.mock(|when, then| {
        when.request_to("/a/c");
        then.respond_status(200);
    });

    // Act
    let explicit_port = RequestBuilder::get("http://example.com:80/api").perform(&server);
    let dot_segments = RequestBuilder::get("/a/b/../c").perform(&server);

    // Assert
    assert!(explicit_port.is_err());
    assert!(dot_segments.is_err());
}

#[test]
fn request_to_matching_uses_predicate() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock(|when, then| {
        when.request_to_matching(|uri| uri.starts_with("/test"))
            .method(GET);
        then.respond("matched");
    });

    // Act
    let body = RequestBuilder::get("/testendpoint")
        .perform(&server)
        .unwrap()
        .and_return()
        .body_string();

    // Assert
    assert_eq!(body, "matched");
}

#[test]
fn failing_uri_predicate_reports_actual_uri() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock(|when, then| {
        when.request_to_matching(|uri| uri.starts_with("/testpointend"))
            .method(GET);
        then.respond("matched");
    });

    // Act
    let err = RequestBuilder::get("/testendpoint")
        .perform(&server)
        .unwrap_err();

    // Assert
    assert_eq!(err.message(), "Request URI doesn't match; was /testendpoint");
}

#[test]
fn failing_uri_regex_names_pattern_and_uri() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock(|when, then| {
        when.request_to_regex("^/testpointend").method(GET);
        then.respond("matched");
    });

    // Act
    let err = RequestBuilder::get("/testendpoint")
        .perform(&server)
        .unwrap_err();

    // Assert
    let message = err.message();
    assert!(message.contains("Request URI"));
    assert!(message.contains("/testpointend"));
    assert!(message.contains("/testendpoint"));
}

#[test]
fn uri_templates_are_expanded() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    let m = server.mock_get("/customers/Mary%20Jane/orders/7", |_, then| {
        then.respond_json(|req| serde_json::json!({ "path": req.path() }));
    });

    // Act
    let body = RequestBuilder::get_template("/customers/{name}/orders/{id}", ["Mary Jane", "7"])
        .perform(&server)
        .unwrap()
        .and_return()
        .body_string();

    // Assert
    assert_eq!(body, r#"{"path":"/customers/Mary%20Jane/orders/7"}"#);
    m.assert();
}
