use std::fmt;

use assert_json_diff::{assert_json_matches_no_panic, CompareMode, Config};
use http::StatusCode;
use serde_json::Value;

use crate::common::{
    data::{fail, AssertionError, CapturedRequest, MockResponse},
    json::JsonExpect,
    media_type::{IntoMediaType, MediaType},
};

/// A completed dispatch: the request that was sent and the response that came back.
///
/// ```
/// use jsonmock::prelude::*;
///
/// let handler = |_: CapturedRequest| -> Result<MockResponse, AssertionError> {
///     Ok(MockResponse::ok()
///         .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
///         .with_body(r#"{"name":"Mary"}"#))
/// };
///
/// handler
///     .get_for_json("/people/1")
///     .unwrap()
///     .and_expect(|r| {
///         r.status().is_ok()?;
///         r.content().content_type_compatible_with("application/json")?;
///         r.content().matches_json(|json| {
///             json.property("name", "Mary");
///         })
///     })
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ResultActions {
    request: CapturedRequest,
    response: MockResponse,
}

impl ResultActions {
    pub(crate) fn new(request: CapturedRequest, response: MockResponse) -> Self {
        Self { request, response }
    }

    pub fn request(&self) -> &CapturedRequest {
        &self.request
    }

    pub fn response(&self) -> &MockResponse {
        &self.response
    }

    /// Runs a block of assertions against the response. The first failing assertion is
    /// returned.
    pub fn and_expect<F>(&self, f: F) -> Result<&Self, AssertionError>
    where
        F: FnOnce(&ResultMatchers<'_>) -> Result<(), AssertionError>,
    {
        f(&ResultMatchers {
            response: &self.response,
        })?;
        Ok(self)
    }

    pub fn and_return(self) -> MockResponse {
        self.response
    }
}

/// Entry point of the assertion block passed to [ResultActions::and_expect].
pub struct ResultMatchers<'a> {
    response: &'a MockResponse,
}

impl<'a> ResultMatchers<'a> {
    pub fn status(&self) -> StatusResultMatchers {
        StatusResultMatchers {
            status: self.response.status(),
        }
    }

    pub fn header(&self) -> HeaderResultMatchers<'a> {
        HeaderResultMatchers {
            response: self.response,
        }
    }

    pub fn content(&self) -> ContentResultMatchers<'a> {
        ContentResultMatchers {
            response: self.response,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Series {
    Informational,
    Successful,
    Redirection,
    ClientError,
    ServerError,
    Unknown,
}

impl Series {
    fn of(status: StatusCode) -> Self {
        match status.as_u16() / 100 {
            1 => Series::Informational,
            2 => Series::Successful,
            3 => Series::Redirection,
            4 => Series::ClientError,
            5 => Series::ServerError,
            _ => Series::Unknown,
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Series::Informational => "INFORMATIONAL",
            Series::Successful => "SUCCESSFUL",
            Series::Redirection => "REDIRECTION",
            Series::ClientError => "CLIENT_ERROR",
            Series::ServerError => "SERVER_ERROR",
            Series::Unknown => "UNKNOWN",
        })
    }
}

pub struct StatusResultMatchers {
    status: StatusCode,
}

impl StatusResultMatchers {
    pub fn is(&self, expected: u16) -> Result<(), AssertionError> {
        let actual = self.status.as_u16();
        if actual != expected {
            return fail(format!(
                "Status expected:<{}> but was:<{}>",
                expected, actual
            ));
        }
        Ok(())
    }

    pub fn is_ok(&self) -> Result<(), AssertionError> {
        self.is(200)
    }

    pub fn is_created(&self) -> Result<(), AssertionError> {
        self.is(201)
    }

    pub fn is_accepted(&self) -> Result<(), AssertionError> {
        self.is(202)
    }

    pub fn is_no_content(&self) -> Result<(), AssertionError> {
        self.is(204)
    }

    pub fn is_found(&self) -> Result<(), AssertionError> {
        self.is(302)
    }

    pub fn is_not_modified(&self) -> Result<(), AssertionError> {
        self.is(304)
    }

    pub fn is_bad_request(&self) -> Result<(), AssertionError> {
        self.is(400)
    }

    pub fn is_unauthorized(&self) -> Result<(), AssertionError> {
        self.is(401)
    }

    pub fn is_forbidden(&self) -> Result<(), AssertionError> {
        self.is(403)
    }

    pub fn is_not_found(&self) -> Result<(), AssertionError> {
        self.is(404)
    }

    pub fn is_method_not_allowed(&self) -> Result<(), AssertionError> {
        self.is(405)
    }

    pub fn is_conflict(&self) -> Result<(), AssertionError> {
        self.is(409)
    }

    pub fn is_unprocessable_entity(&self) -> Result<(), AssertionError> {
        self.is(422)
    }

    pub fn is_internal_server_error(&self) -> Result<(), AssertionError> {
        self.is(500)
    }

    pub fn is_service_unavailable(&self) -> Result<(), AssertionError> {
        self.is(503)
    }

    pub fn is_1xx_informational(&self) -> Result<(), AssertionError> {
        self.in_series(Series::Informational)
    }

    pub fn is_2xx_successful(&self) -> Result<(), AssertionError> {
        self.in_series(Series::Successful)
    }

    pub fn is_3xx_redirection(&self) -> Result<(), AssertionError> {
        self.in_series(Series::Redirection)
    }

    pub fn is_4xx_client_error(&self) -> Result<(), AssertionError> {
        self.in_series(Series::ClientError)
    }

    pub fn is_5xx_server_error(&self) -> Result<(), AssertionError> {
        self.in_series(Series::ServerError)
    }

    fn in_series(&self, expected: Series) -> Result<(), AssertionError> {
        let actual = Series::of(self.status);
        if actual != expected {
            return fail(format!(
                "Range for response status value {} expected:<{}> but was:<{}>",
                self.status.as_u16(),
                expected,
                actual
            ));
        }
        Ok(())
    }
}

pub struct HeaderResultMatchers<'a> {
    response: &'a MockResponse,
}

impl<'a> HeaderResultMatchers<'a> {
    /// Checks the first value of the header.
    pub fn string(&self, name: &str, expected: &str) -> Result<(), AssertionError> {
        let actual = self.response.header_values(name).into_iter().next();
        match actual {
            Some(actual) if actual == expected => Ok(()),
            actual => fail(format!(
                "Response header '{}' expected:<{}> but was:<{}>",
                name,
                expected,
                actual.as_deref().unwrap_or("null")
            )),
        }
    }

    /// Checks all values of the header, in order.
    pub fn values<I, S>(&self, name: &str, expected: I) -> Result<(), AssertionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let expected: Vec<String> = expected.into_iter().map(Into::into).collect();
        let actual = self.response.header_values(name);
        if actual != expected {
            return fail(format!(
                "Response header '{}' expected:<[{}]> but was:<[{}]>",
                name,
                expected.join(", "),
                actual.join(", ")
            ));
        }
        Ok(())
    }

    pub fn exists(&self, name: &str) -> Result<(), AssertionError> {
        if !self.response.headers().contains_key(name) {
            return fail(format!("Response should contain header '{}'", name));
        }
        Ok(())
    }

    pub fn does_not_exist(&self, name: &str) -> Result<(), AssertionError> {
        if self.response.headers().contains_key(name) {
            return fail(format!("Response should not contain header '{}'", name));
        }
        Ok(())
    }
}

pub struct ContentResultMatchers<'a> {
    response: &'a MockResponse,
}

impl<'a> ContentResultMatchers<'a> {
    /// Checks that the `Content-Type` equals `expected`, parameters included.
    ///
    /// # Panics
    /// Panics if `expected` is not a valid media type.
    pub fn content_type<M: IntoMediaType>(&self, expected: M) -> Result<(), AssertionError> {
        let expected = expected
            .into_media_type()
            .expect("cannot convert provided value into a media type");
        let (raw, actual) = self.actual_content_type()?;

        if actual != expected {
            return fail(format!(
                "Content type expected:<{}> but was:<{}>",
                expected, raw
            ));
        }
        Ok(())
    }

    /// # Panics
    /// Panics if `expected` is not a valid media type.
    pub fn content_type_compatible_with<M: IntoMediaType>(
        &self,
        expected: M,
    ) -> Result<(), AssertionError> {
        let expected = expected
            .into_media_type()
            .expect("cannot convert provided value into a media type");
        let (raw, actual) = self.actual_content_type()?;

        if !actual.is_compatible_with(&expected) {
            return fail(format!(
                "Content type [{}] is not compatible with [{}]",
                raw, expected
            ));
        }
        Ok(())
    }

    /// Checks the `charset` parameter of the `Content-Type`, ignoring case.
    pub fn encoding(&self, expected: &str) -> Result<(), AssertionError> {
        let charset = self
            .response
            .content_type()
            .and_then(|raw| MediaType::parse(&raw).ok())
            .and_then(|media_type| media_type.charset().map(str::to_string));

        match charset {
            Some(actual) if actual.eq_ignore_ascii_case(expected) => Ok(()),
            actual => fail(format!(
                "Character encoding expected:<{}> but was:<{}>",
                expected,
                actual.as_deref().unwrap_or("null")
            )),
        }
    }

    pub fn string(&self, expected: &str) -> Result<(), AssertionError> {
        let actual = self.response.body_string();
        if actual != expected {
            return fail(format!(
                "Response content expected:<{}> but was:<{}>",
                expected, actual
            ));
        }
        Ok(())
    }

    pub fn bytes<B: AsRef<[u8]>>(&self, expected: B) -> Result<(), AssertionError> {
        let expected = expected.as_ref();
        let actual = self.response.body().as_ref();
        if actual != expected {
            return fail(format!(
                "Response content expected:<{:?}> but was:<{:?}>",
                expected, actual
            ));
        }
        Ok(())
    }

    /// Checks the body with a structural JSON expectation.
    pub fn matches_json<F: FnOnce(&mut JsonExpect)>(&self, f: F) -> Result<(), AssertionError> {
        let mut expect = JsonExpect::new();
        f(&mut expect);
        expect.check(&self.response.body_string())
    }

    /// Compares the body with `expected`. Properties of the body that `expected` does not
    /// mention are ignored.
    pub fn json(&self, expected: &str) -> Result<(), AssertionError> {
        let (actual, expected) = self.parse_both(expected)?;
        assert_json_matches_no_panic(&actual, &expected, Config::new(CompareMode::Inclusive))
            .map_err(|diff| AssertionError::new(format!("JSON content doesn't match - {}", diff)))
    }

    /// Compares the body with `expected`, requiring both documents to be equal.
    pub fn json_strict(&self, expected: &str) -> Result<(), AssertionError> {
        let (actual, expected) = self.parse_both(expected)?;
        assert_json_matches_no_panic(&actual, &expected, Config::new(CompareMode::Strict))
            .map_err(|diff| AssertionError::new(format!("JSON content doesn't match - {}", diff)))
    }

    fn parse_both(&self, expected: &str) -> Result<(Value, Value), AssertionError> {
        let actual = serde_json::from_str(&self.response.body_string())
            .map_err(|err| AssertionError::new(format!("Unable to parse JSON - {}", err)))?;
        let expected = serde_json::from_str(expected).map_err(|err| {
            AssertionError::new(format!("Unable to parse expected JSON - {}", err))
        })?;
        Ok((actual, expected))
    }

    fn actual_content_type(&self) -> Result<(String, MediaType), AssertionError> {
        let raw = match self.response.content_type() {
            Some(raw) => raw.into_owned(),
            None => return fail("Content type not set"),
        };

        match MediaType::parse(&raw) {
            Ok(media_type) => Ok((raw, media_type)),
            Err(_) => fail(format!(
                "Response [Content-Type] header media type invalid: {}",
                raw
            )),
        }
    }
}
