use jsonmock::prelude::*;

use crate::common::ResponseData;

#[test]
fn header_matches() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    let m = server.mock(|when, then| {
        when.request_to("/testendpoint")
            .method(GET)
            .header("X-Custom-1", ["ABC"]);
        then.respond_json(|_| ResponseData::new(2022, 7, 12, "OK"));
    });

    // Act
    let response = RequestBuilder::get("/testendpoint")
        .header("X-Custom-1", "ABC")
        .perform(&server)
        .unwrap()
        .and_return();

    // Assert
    assert_eq!(response.body_string(), r#"{"date":"2022-07-12","extra":"OK"}"#);
    m.assert();
}

#[test]
fn incorrect_header_value() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock(|when, then| {
        when.header("X-Custom-1", ["ABC"]);
        then.respond_status(200);
    });

    // Act
    let err = RequestBuilder::get("/testendpoint")
        .header("X-Custom-1", "AAA")
        .perform(&server)
        .unwrap_err();

    // Assert
    assert_eq!(
        err.message(),
        "Request header [X-Custom-1] incorrect; expected ABC, was AAA"
    );
}

#[test]
fn header_predicate() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock_times(2, |when, then| {
        when.header_matching("X-Custom-1", |value| value.starts_with('A'));
        then.respond_status(200);
    });

    // Act
    let accepted = RequestBuilder::get("/x")
        .header("X-Custom-1", "ABC")
        .perform(&server);
    let rejected = RequestBuilder::get("/x")
        .header("X-Custom-1", "BBB")
        .perform(&server);

    // Assert
    assert!(accepted.is_ok());
    assert_eq!(
        rejected.unwrap_err().message(),
        "Request header [X-Custom-1] incorrect; was BBB"
    );
}

#[test]
fn missing_and_repeated_headers() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock_times(ExpectedCount::many_times(), |when, then| {
        when.header("X-Custom-1", ["ABC"]);
        then.respond_status(200);
    });

    // Act
    let missing = RequestBuilder::get("/x").perform(&server);
    let repeated = RequestBuilder::get("/x")
        .header("X-Custom-1", "ABC")
        .header("X-Custom-1", "DEF")
        .perform(&server);

    // Assert
    assert_eq!(missing.unwrap_err().message(), "Header [X-Custom-1] not found");
    assert_eq!(
        repeated.unwrap_err().message(),
        "Request [X-Custom-1] header; expected single header, was multiple (2)"
    );
}

#[test]
fn accept_header() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock_times(ExpectedCount::many_times(), |when, then| {
        when.accept_json();
        then.respond_status(200);
    });

    // Act
    let json = RequestBuilder::get("/x").accept_json().perform(&server);
    let listed = RequestBuilder::get("/x")
        .header("Accept", "text/html, application/*;q=0.8")
        .perform(&server);
    let wildcard = RequestBuilder::get("/x")
        .header("Accept", "*/*")
        .perform(&server);
    let plain = RequestBuilder::get("/x")
        .accept(MediaType::TEXT_PLAIN)
        .perform(&server);

    // Assert
    assert!(json.is_ok());
    assert!(listed.is_ok());
    assert!(wildcard.is_ok());
    assert_eq!(
        plain.unwrap_err().message(),
        "Request [Accept] header incorrect; expected application/json, was text/plain"
    );
}

#[test]
fn content_type_header() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock_times(ExpectedCount::many_times(), |when, then| {
        when.method(POST).content_type_json();
        then.respond_json(|_| ResponseData::new(2022, 7, 21, "OK"));
    });

    // Act
    let json = RequestBuilder::post("/testendpoint")
        .content_type("application/json;charset=UTF-8")
        .body(r#"{"id":"1","name":"Mary"}"#)
        .perform(&server);
    let plain = RequestBuilder::post("/testendpoint")
        .content_type(MediaType::TEXT_PLAIN)
        .body("Mary")
        .perform(&server);
    let invalid = RequestBuilder::post("/testendpoint")
        .header("Content-Type", "application")
        .perform(&server);

    // Assert
    assert_eq!(
        json.unwrap().and_return().body_string(),
        r#"{"date":"2022-07-21","extra":"OK"}"#
    );
    assert_eq!(
        plain.unwrap_err().message(),
        "Request [Content-Type] header incorrect; expected application/json, was text/plain"
    );
    assert_eq!(
        invalid.unwrap_err().message(),
        "Request [Content-Type] header media type invalid: application"
    );
}

#[test]
fn header_does_not_exist() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock_times(2, |when, then| {
        when.header_does_not_exist("X-Test-1");
        then.respond_status(200);
    });

    // Act
    let absent = RequestBuilder::get("/x").perform(&server);
    let present = RequestBuilder::get("/x")
        .header("X-Test-1", "anything")
        .perform(&server);

    // Assert
    assert!(absent.is_ok());
    assert_eq!(
        present.unwrap_err().message(),
        "Request [X-Test-1] header expected not to be present"
    );
}
