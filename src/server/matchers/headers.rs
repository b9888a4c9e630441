use crate::{
    common::{
        data::{fail, AssertionError, CapturedRequest},
        media_type::MediaType,
    },
    server::matchers::predicate::StringPredicate,
};

const ACCEPT_NAME: &str = "Accept";
const CONTENT_TYPE_NAME: &str = "Content-Type";

pub(crate) fn check_header(
    req: &CapturedRequest,
    name: &str,
    expected: &[String],
) -> Result<(), AssertionError> {
    let values = header_values(req, name, expected.len())?;

    for (expected, actual) in expected.iter().zip(values.iter()) {
        if expected != actual {
            return fail(format!(
                "Request header [{}] incorrect; expected {}, was {}",
                name, expected, actual
            ));
        }
    }

    Ok(())
}

pub(crate) fn check_header_matching(
    req: &CapturedRequest,
    name: &str,
    predicates: &[StringPredicate],
) -> Result<(), AssertionError> {
    let values = header_values(req, name, predicates.len())?;

    for (predicate, actual) in predicates.iter().zip(values.iter()) {
        if predicate.test(actual) {
            continue;
        }
        return match predicate.description() {
            Some(description) => fail(format!(
                "Request header [{}] incorrect; expected {}, was {}",
                name, description, actual
            )),
            None => fail(format!("Request header [{}] incorrect; was {}", name, actual)),
        };
    }

    Ok(())
}

/// The `Accept` header may list several media types. One compatible entry is enough.
pub(crate) fn check_accept(req: &CapturedRequest, expected: &MediaType) -> Result<(), AssertionError> {
    let values = header_values(req, ACCEPT_NAME, 1)?;
    let header = &values[0];

    for token in header.split(',').map(str::trim) {
        if parse_media_type(token, ACCEPT_NAME)?.is_compatible_with(expected) {
            return Ok(());
        }
    }

    fail(format!(
        "Request [{}] header incorrect; expected {}, was {}",
        ACCEPT_NAME, expected, header
    ))
}

pub(crate) fn check_content_type(
    req: &CapturedRequest,
    expected: &MediaType,
) -> Result<(), AssertionError> {
    let values = header_values(req, CONTENT_TYPE_NAME, 1)?;
    let header = &values[0];

    if !parse_media_type(header, CONTENT_TYPE_NAME)?.is_compatible_with(expected) {
        return fail(format!(
            "Request [{}] header incorrect; expected {}, was {}",
            CONTENT_TYPE_NAME, expected, header
        ));
    }

    Ok(())
}

pub(crate) fn check_header_absent(req: &CapturedRequest, name: &str) -> Result<(), AssertionError> {
    if req.contains_header(name) {
        return fail(format!("Request [{}] header expected not to be present", name));
    }
    Ok(())
}

/// Fetches all values of `name`, insisting on exactly `expected_count` of them.
fn header_values(
    req: &CapturedRequest,
    name: &str,
    expected_count: usize,
) -> Result<Vec<String>, AssertionError> {
    let values = req.header_values(name);

    if values.is_empty() {
        return fail(format!("Header [{}] not found", name));
    }

    if values.len() != expected_count {
        if expected_count == 1 {
            return fail(format!(
                "Request [{}] header; expected single header, was multiple ({})",
                name,
                values.len()
            ));
        }
        return fail(format!(
            "Request [{}] header number incorrect; expected {}, was {}",
            name,
            expected_count,
            values.len()
        ));
    }

    Ok(values)
}

fn parse_media_type(value: &str, header_name: &str) -> Result<MediaType, AssertionError> {
    match value.parse::<MediaType>() {
        Ok(media_type) => Ok(media_type),
        Err(err) => {
            tracing::trace!("Cannot parse [{}] header value '{}': {}", header_name, value, err);
            fail(format!(
                "Request [{}] header media type invalid: {}",
                header_name, value
            ))
        }
    }
}
