use crate::{
    common::{
        data::{fail, AssertionError, CapturedRequest},
        json::JsonExpect,
        media_type::MediaType,
    },
    server::matchers::{headers::check_content_type, predicate::StringPredicate},
};

pub(crate) fn check_content(req: &CapturedRequest, expected: &str) -> Result<(), AssertionError> {
    if req.body_string() != expected {
        return fail("Request body incorrect");
    }
    Ok(())
}

pub(crate) fn check_content_matching(
    req: &CapturedRequest,
    predicate: &StringPredicate,
) -> Result<(), AssertionError> {
    if !predicate.test(req.body_string()) {
        return fail("Request body incorrect");
    }
    Ok(())
}

/// The request must declare a JSON content type before its body is inspected.
pub(crate) fn check_json(req: &CapturedRequest, expect: &JsonExpect) -> Result<(), AssertionError> {
    check_content_type(req, &MediaType::APPLICATION_JSON)?;
    expect.check(req.body_string())
}
