use std::{fmt, sync::Arc};

use http::Method;
use regex::Regex;

use crate::common::{
    data::{AssertionError, CapturedRequest},
    json::JsonExpect,
    media_type::{IntoMediaType, MediaType},
    uri::RequestUri,
};

pub use predicate::StringPredicate;

mod body;
mod headers;
mod predicate;
mod request;

/// A single check against a captured request.
///
/// Implementations return `Ok(())` when the request is acceptable and an [AssertionError]
/// describing the first problem otherwise. Plain closures work as matchers too:
///
/// ```
/// use jsonmock::prelude::*;
///
/// let matcher = |req: &CapturedRequest| -> Result<(), AssertionError> {
///     if req.body().is_empty() {
///         return fail("Request body missing");
///     }
///     Ok(())
/// };
/// # let _ = matcher;
/// ```
pub trait RequestMatcher: Send + Sync {
    fn matches(&self, req: &CapturedRequest) -> Result<(), AssertionError>;

    /// A short description used in verification reports.
    fn describe(&self) -> String {
        String::from("custom request matcher")
    }

    /// Expected and actual text shown as a diff in reports when this matcher fails.
    fn diff_texts(&self, _req: &CapturedRequest) -> Option<(String, String)> {
        None
    }
}

impl<F> RequestMatcher for F
where
    F: Fn(&CapturedRequest) -> Result<(), AssertionError> + Send + Sync,
{
    fn matches(&self, req: &CapturedRequest) -> Result<(), AssertionError> {
        (self)(req)
    }
}

/// The built-in checks.
#[derive(Debug, Clone)]
pub enum Expectation {
    Method(Method),
    RequestTo(RequestUri),
    RequestToMatching(StringPredicate),
    QueryParam(String, Vec<String>),
    Header(String, Vec<String>),
    HeaderMatching(String, Vec<StringPredicate>),
    Accept(MediaType),
    ContentType(MediaType),
    HeaderDoesNotExist(String),
    RequestContent(String),
    RequestContentMatching(StringPredicate),
    RequestJson(Arc<JsonExpect>),
}

impl Expectation {
    pub fn check(&self, req: &CapturedRequest) -> Result<(), AssertionError> {
        match self {
            Expectation::Method(expected) => request::check_method(req, expected),
            Expectation::RequestTo(expected) => request::check_uri(req, expected),
            Expectation::RequestToMatching(predicate) => request::check_uri_matching(req, predicate),
            Expectation::QueryParam(name, values) => request::check_query_param(req, name, values),
            Expectation::Header(name, values) => headers::check_header(req, name, values),
            Expectation::HeaderMatching(name, predicates) => {
                headers::check_header_matching(req, name, predicates)
            }
            Expectation::Accept(expected) => headers::check_accept(req, expected),
            Expectation::ContentType(expected) => headers::check_content_type(req, expected),
            Expectation::HeaderDoesNotExist(name) => headers::check_header_absent(req, name),
            Expectation::RequestContent(expected) => body::check_content(req, expected),
            Expectation::RequestContentMatching(predicate) => {
                body::check_content_matching(req, predicate)
            }
            Expectation::RequestJson(expect) => body::check_json(req, expect),
        }
    }
}

impl RequestMatcher for Expectation {
    fn matches(&self, req: &CapturedRequest) -> Result<(), AssertionError> {
        self.check(req)
    }

    fn describe(&self) -> String {
        self.to_string()
    }

    fn diff_texts(&self, req: &CapturedRequest) -> Option<(String, String)> {
        match self {
            Expectation::RequestContent(expected) => {
                Some((expected.clone(), req.body_string().to_string()))
            }
            Expectation::RequestTo(expected) => {
                Some((expected.to_string(), req.uri_str().to_string()))
            }
            _ => None,
        }
    }
}

/// All expectations must hold, evaluated in order.
impl RequestMatcher for Vec<Expectation> {
    fn matches(&self, req: &CapturedRequest) -> Result<(), AssertionError> {
        self.iter().try_for_each(|e| e.check(req))
    }

    fn describe(&self) -> String {
        self.iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn diff_texts(&self, req: &CapturedRequest) -> Option<(String, String)> {
        self.iter()
            .find(|e| e.check(req).is_err())
            .and_then(|e| e.diff_texts(req))
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Method(method) => write!(f, "method {}", method),
            Expectation::RequestTo(uri) => write!(f, "request to {}", uri),
            Expectation::RequestToMatching(predicate) => write!(f, "request to {}", predicate),
            Expectation::QueryParam(name, values) => {
                write!(f, "query param [{}] = {}", name, values.join(", "))
            }
            Expectation::Header(name, values) => {
                write!(f, "header [{}] = {}", name, values.join(", "))
            }
            Expectation::HeaderMatching(name, predicates) => write!(
                f,
                "header [{}] {}",
                name,
                predicates
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Expectation::Accept(media_type) => write!(f, "accept {}", media_type),
            Expectation::ContentType(media_type) => write!(f, "content type {}", media_type),
            Expectation::HeaderDoesNotExist(name) => write!(f, "no header [{}]", name),
            Expectation::RequestContent(_) => write!(f, "request content"),
            Expectation::RequestContentMatching(predicate) => {
                write!(f, "request content {}", predicate)
            }
            Expectation::RequestJson(_) => write!(f, "request JSON"),
        }
    }
}

// ================================================================================================
// Constructors
// ================================================================================================

pub fn method(method: Method) -> Expectation {
    Expectation::Method(method)
}

/// Matches scheme, user info, host, port and path. The query string is ignored.
///
/// # Panics
/// Panics if `uri` is not a valid URI reference.
pub fn request_to<U: TryInto<RequestUri>>(uri: U) -> Expectation
where
    U::Error: fmt::Display,
{
    match uri.try_into() {
        Ok(uri) => Expectation::RequestTo(uri),
        Err(err) => panic!("cannot convert URI: {}", err),
    }
}

pub fn request_to_matching<F>(test: F) -> Expectation
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    Expectation::RequestToMatching(StringPredicate::new(test))
}

/// # Panics
/// Panics if `pattern` is not a valid regular expression.
pub fn request_to_regex(pattern: &str) -> Expectation {
    let regex = Regex::new(pattern).expect("cannot convert provided value into regex");
    Expectation::RequestToMatching(StringPredicate::regex(regex))
}

/// The raw query string must contain `name` exactly as often as values are given, with
/// the values in the given order.
pub fn query_param<I, S>(name: &str, values: I) -> Expectation
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Expectation::QueryParam(name.to_string(), values.into_iter().map(Into::into).collect())
}

pub fn header<I, S>(name: &str, values: I) -> Expectation
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Expectation::Header(name.to_string(), values.into_iter().map(Into::into).collect())
}

/// The header must occur exactly once with a value satisfying `test`.
pub fn header_matching<F>(name: &str, test: F) -> Expectation
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    Expectation::HeaderMatching(name.to_string(), vec![StringPredicate::new(test)])
}

/// One predicate per expected header value, in order.
pub fn header_predicates(name: &str, predicates: Vec<StringPredicate>) -> Expectation {
    Expectation::HeaderMatching(name.to_string(), predicates)
}

/// # Panics
/// Panics if `pattern` is not a valid regular expression.
pub fn header_regex(name: &str, pattern: &str) -> Expectation {
    let regex = Regex::new(pattern).expect("cannot convert provided value into regex");
    Expectation::HeaderMatching(name.to_string(), vec![StringPredicate::regex(regex)])
}

/// # Panics
/// Panics if `media_type` cannot be parsed.
pub fn accept<M: IntoMediaType>(media_type: M) -> Expectation {
    Expectation::Accept(
        media_type
            .into_media_type()
            .expect("cannot convert provided value into a media type"),
    )
}

pub fn accept_json() -> Expectation {
    Expectation::Accept(MediaType::APPLICATION_JSON)
}

/// # Panics
/// Panics if `media_type` cannot be parsed.
pub fn content_type<M: IntoMediaType>(media_type: M) -> Expectation {
    Expectation::ContentType(
        media_type
            .into_media_type()
            .expect("cannot convert provided value into a media type"),
    )
}

pub fn content_type_json() -> Expectation {
    Expectation::ContentType(MediaType::APPLICATION_JSON)
}

pub fn header_does_not_exist(name: &str) -> Expectation {
    Expectation::HeaderDoesNotExist(name.to_string())
}

pub fn request_content<S: Into<String>>(expected: S) -> Expectation {
    Expectation::RequestContent(expected.into())
}

pub fn request_content_matching<F>(test: F) -> Expectation
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    Expectation::RequestContentMatching(StringPredicate::new(test))
}

/// Requires a JSON content type and a body satisfying the structural description.
pub fn request_json<F: FnOnce(&mut JsonExpect)>(f: F) -> Expectation {
    let mut expect = JsonExpect::new();
    f(&mut expect);
    Expectation::RequestJson(Arc::new(expect))
}
