use jsonmock::prelude::*;

use crate::common::{RequestData, TestController};

#[test]
fn get_for_json_test() {
    let _ = env_logger::try_init();

    TestController
        .get_for_json("/testendpoint")
        .unwrap()
        .and_expect(|r| {
            r.status().is_ok()?;
            r.content().matches_json(|json| {
                json.property("date", "2022-07-06").property("extra", "Hello!");
            })
        })
        .unwrap();
}

#[test]
fn get_for_json_with_headers() {
    let _ = env_logger::try_init();

    TestController
        .get_for_json_with("/testheaders", |req| req.header("testheader1", "Hello"))
        .unwrap()
        .and_expect(|r| {
            r.status().is_ok()?;
            r.content().matches_json(|json| {
                json.property_with("testheader1", |header| {
                    header.count(1).item(0, "Hello");
                })
                .property_with("accept", |header| {
                    header.count(1).item(0, "application/json");
                });
            })
        })
        .unwrap();
}

#[test]
fn post_for_json_test() {
    let _ = env_logger::try_init();

    TestController
        .post_for_json_with("/testendpoint", |req| {
            req.content_json_with(|| RequestData {
                id: "50b4f2c8-fdf8-11ec-be56-3fb4fd705ec6".to_string(),
                name: "Mary".to_string(),
            })
        })
        .unwrap()
        .and_expect(|r| {
            r.status().is_ok()?;
            r.content().matches_json(|json| {
                json.property("date", "2022-07-06")
                    .property("extra", "50b4f2c8-fdf8-11ec-be56-3fb4fd705ec6|Mary");
            })
        })
        .unwrap();
}

#[test]
fn post_for_json_without_body_is_rejected() {
    let _ = env_logger::try_init();

    let err = TestController
        .post_for_json("/testendpoint")
        .unwrap()
        .and_expect(|r| r.status().is_ok())
        .unwrap_err();

    assert_eq!(err.message(), "Status expected:<200> but was:<400>");
}

#[test]
fn content_type_assertions() {
    let _ = env_logger::try_init();

    let result = TestController.get_for_json("/testendpoint").unwrap();

    result
        .and_expect(|r| {
            r.content().content_type("application/json;charset=UTF-8")?;
            r.content()
                .content_type(MediaType::APPLICATION_JSON.with_param("charset", "UTF-8"))?;
            r.content().content_type_compatible_with("application/json")?;
            r.content().content_type_compatible_with(MediaType::APPLICATION_JSON)?;
            r.content().encoding("UTF-8")
        })
        .unwrap();

    let wrong_type = result
        .and_expect(|r| r.content().content_type("text/plain"))
        .unwrap_err();
    let incompatible = result
        .and_expect(|r| r.content().content_type_compatible_with("image/jpeg"))
        .unwrap_err();

    assert_eq!(
        wrong_type.message(),
        "Content type expected:<text/plain> but was:<application/json;charset=UTF-8>"
    );
    assert_eq!(
        incompatible.message(),
        "Content type [application/json;charset=UTF-8] is not compatible with [image/jpeg]"
    );
}

#[test]
fn content_as_string_and_bytes() {
    let _ = env_logger::try_init();

    let expected = r#"{"date":"2022-07-06","extra":"Hello!"}"#;
    let result = TestController.get_for_json("/testendpoint").unwrap();

    result
        .and_expect(|r| {
            r.content().string(expected)?;
            r.content().bytes(expected.as_bytes())
        })
        .unwrap();

    let err = result
        .and_expect(|r| r.content().string("wrong"))
        .unwrap_err();
    assert_eq!(
        err.message(),
        format!("Response content expected:<wrong> but was:<{}>", expected)
    );
}

#[test]
fn lenient_json_comparison() {
    let _ = env_logger::try_init();

    let result = TestController.get_for_json("/testendpoint").unwrap();

    result
        .and_expect(|r| r.content().json(r#"{"extra":"Hello!"}"#))
        .unwrap();

    let err = result
        .and_expect(|r| r.content().json(r#"{"extra":"Goodbye!"}"#))
        .unwrap_err();
    assert!(err.message().starts_with("JSON content doesn't match - "));
}

#[test]
fn json_mismatch_in_result() {
    let _ = env_logger::try_init();

    let err = TestController
        .get_for_json("/testendpoint")
        .unwrap()
        .and_expect(|r| {
            r.content().matches_json(|json| {
                json.property("extra", "Goodbye!");
            })
        })
        .unwrap_err();

    assert_eq!(
        err.message(),
        r#"/extra: JSON value doesn't match - expected "Goodbye!", was "Hello!""#
    );
}

#[test]
fn status_ranges_and_headers() {
    let _ = env_logger::try_init();

    let result = TestController.get_for_json("/unknown").unwrap();

    result
        .and_expect(|r| {
            r.status().is_not_found()?;
            r.status().is_4xx_client_error()?;
            r.header().does_not_exist("Content-Type")
        })
        .unwrap();

    let err = result
        .and_expect(|r| r.status().is_2xx_successful())
        .unwrap_err();
    assert_eq!(
        err.message(),
        "Range for response status value 404 expected:<SUCCESSFUL> but was:<CLIENT_ERROR>"
    );
}

#[test]
fn and_return_hands_out_the_response() {
    let _ = env_logger::try_init();

    let response = TestController
        .get_for_json("/testendpoint")
        .unwrap()
        .and_return();

    let data: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(data["extra"], "Hello!");
}
