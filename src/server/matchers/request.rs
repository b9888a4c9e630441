use http::Method;

use crate::{
    common::{
        data::{fail, AssertionError, CapturedRequest},
        uri::RequestUri,
    },
    server::matchers::predicate::StringPredicate,
};

pub(crate) fn check_method(req: &CapturedRequest, expected: &Method) -> Result<(), AssertionError> {
    if req.method() != expected {
        return fail(format!(
            "Request method incorrect; expected {}, was {}",
            expected,
            req.method()
        ));
    }
    Ok(())
}

pub(crate) fn check_uri(req: &CapturedRequest, expected: &RequestUri) -> Result<(), AssertionError> {
    if !req.uri().equals_ignoring_query(expected) {
        return fail(format!(
            "Request URI doesn't match; expected {}, was {}",
            expected,
            req.uri()
        ));
    }
    Ok(())
}

pub(crate) fn check_uri_matching(
    req: &CapturedRequest,
    predicate: &StringPredicate,
) -> Result<(), AssertionError> {
    if predicate.test(req.uri_str()) {
        return Ok(());
    }

    match predicate.description() {
        Some(description) => fail(format!(
            "Request URI doesn't match; expected {}, was {}",
            description,
            req.uri()
        )),
        None => fail(format!("Request URI doesn't match; was {}", req.uri())),
    }
}

/// Query parameters are taken verbatim from the raw query string: no percent-decoding
/// and no `+` to space translation.
pub(crate) fn check_query_param(
    req: &CapturedRequest,
    name: &str,
    expected: &[String],
) -> Result<(), AssertionError> {
    let prefix = format!("{}=", name);
    let entries: Vec<&str> = req
        .query()
        .map(|query| query.split('&').filter(|e| e.starts_with(&prefix)).collect())
        .unwrap_or_default();

    if entries.is_empty() {
        return fail(format!("Request query param [{}] not found", name));
    }

    if entries.len() != expected.len() {
        return fail(format!(
            "Request query param [{}] number incorrect; expected {}, was {}",
            name,
            expected.len(),
            entries.len()
        ));
    }

    for (expected, entry) in expected.iter().zip(entries) {
        let actual = &entry[prefix.len()..];
        if expected != actual {
            return fail(format!(
                "Request query param [{}] incorrect; expected {}, was {}",
                name, expected, actual
            ));
        }
    }

    Ok(())
}
