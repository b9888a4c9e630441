use jsonmock::prelude::*;
use serde::Serialize;
use serde_json::json;

use crate::common::ResponseData;

fn get(server: &MockServer, uri: &str) -> MockResponse {
    RequestBuilder::get(uri)
        .perform(server)
        .unwrap()
        .and_return()
}

#[test]
fn respond_json_with_data() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock(|when, then| {
        when.request_to("/testendpoint");
        then.respond_json(|_| ResponseData::new(2022, 7, 12, "XXX"));
    });

    // Act
    let response = get(&server, "/testendpoint");

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body_string(), r#"{"date":"2022-07-12","extra":"XXX"}"#);
    assert_eq!(response.content_type().as_deref(), Some("application/json"));
}

#[test]
fn producer_reads_the_matched_request() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock_times(2, |when, then| {
        when.request_to_regex("^/customers/[0-9]+$");
        then.respond_json(|req| {
            let id = req.path().rsplit('/').next().unwrap_or_default().to_string();
            json!({ "id": id })
        });
    });

    // Act
    let first = get(&server, "/customers/17");
    let second = get(&server, "/customers/42");

    // Assert
    assert_eq!(first.body_string(), r#"{"id":"17"}"#);
    assert_eq!(second.body_string(), r#"{"id":"42"}"#);
}

#[test]
fn respond_json_with_status_and_headers() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    let mut headers = HeaderMap::new();
    headers.insert("Location", HeaderValue::from_static("/customers/1"));

    server
        .expect(matchers::method(POST))
        .respond_json_with(201, headers, |_| json!({ "id": 1 }));

    // Act
    let response = RequestBuilder::post("/customers")
        .perform(&server)
        .unwrap()
        .and_return();

    // Assert
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.header_values("location"), vec!["/customers/1"]);
    assert_eq!(response.content_type().as_deref(), Some("application/json"));
    assert_eq!(response.body_string(), r#"{"id":1}"#);
}

#[test]
fn respond_with_string_and_status() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock(|when, then| {
        when.request_to("/text");
        then.respond("OK!");
    });
    server.mock(|when, then| {
        when.request_to("/created");
        then.respond_status(201);
    });

    // Act
    let text = get(&server, "/text");
    let created = get(&server, "/created");

    // Assert
    assert_eq!(text.body_string(), "OK!");
    assert_eq!(created.status(), StatusCode::CREATED);
    assert!(created.body().is_empty());
}

#[test]
fn then_builder_sets_status_headers_and_body() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock(|_, then| {
        then.status(418)
            .header("X-Flavour", "earl grey")
            .json_body(json!({ "teapot": true }));
    });

    // Act
    let response = get(&server, "/brew");

    // Assert
    assert_eq!(response.status().as_u16(), 418);
    assert_eq!(response.header_values("X-Flavour"), vec!["earl grey"]);
    assert_eq!(response.body_string(), r#"{"teapot":true}"#);
}

#[test]
fn respond_with_closure() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock(|_, then| {
        then.respond_with(|req: &CapturedRequest| {
            MockResponse::new(StatusCode::ACCEPTED).with_body(req.method().to_string())
        });
    });

    // Act
    let response = RequestBuilder::delete("/jobs/1")
        .perform(&server)
        .unwrap()
        .and_return();

    // Assert
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response.body_string(), "DELETE");
}

#[test]
fn server_json_config_is_used_for_responses() {
    let _ = env_logger::try_init();

    #[derive(Serialize)]
    struct Customer {
        name: &'static str,
        nickname: Option<&'static str>,
    }

    // Arrange
    let server = MockServer::with_config(JsonConfig::new().include_nulls(false));
    server.mock(|_, then| {
        then.respond_json(|_| Customer {
            name: "Mary",
            nickname: None,
        });
    });

    // Act
    let response = get(&server, "/customers/1");

    // Assert
    assert_eq!(response.body_string(), r#"{"name":"Mary"}"#);
}

#[test]
fn failing_serialization_is_reported() {
    let _ = env_logger::try_init();

    struct Broken;

    impl Serialize for Broken {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("broken value"))
        }
    }

    // Arrange
    let server = MockServer::new();
    server.mock(|_, then| {
        then.respond_json(|_| Broken);
    });

    // Act
    let err = RequestBuilder::get("/broken").perform(&server).unwrap_err();

    // Assert
    assert!(err
        .message()
        .starts_with("Unable to serialize response body - "));
}

#[test]
fn respond_keeps_earlier_status_and_headers() {
    let _ = env_logger::try_init();

    // Arrange
    let server = MockServer::new();
    server.mock(|when, then| {
        when.request_to("/customers");
        then.status(201)
            .header("Location", "/customers/1")
            .respond_json(|_| json!({ "id": 1 }));
    });
    server.mock(|when, then| {
        when.request_to("/gone");
        then.body("stale").respond_status(410);
    });

    // Act
    let created = get(&server, "/customers");
    let gone = get(&server, "/gone");

    // Assert
    assert_eq!(created.status(), StatusCode::CREATED);
    assert_eq!(created.header_values("location"), vec!["/customers/1"]);
    assert_eq!(created.body_string(), r#"{"id":1}"#);
    assert_eq!(gone.status(), StatusCode::GONE);
    assert!(gone.body().is_empty());
}
