use std::{
    borrow::Cow,
    convert::TryFrom,
    fmt,
    ops::{Bound, RangeBounds},
    sync::OnceLock,
};

use bytes::Bytes;
use http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

use crate::common::uri::RequestUri;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid URI: {0}")]
    InvalidUri(String),
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    #[error("JSONConversionError: {0}")]
    JSONConversionError(#[from] serde_json::Error),
    #[error("Cannot convert request to/from internal structure: {0}")]
    RequestConversionError(String),
}

/// The single failure type raised by every expectation, verification and result assertion.
///
/// It carries nothing but the message, so test frameworks can print
/// it as is and tests can compare it verbatim.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AssertionError {
    message: String,
}

impl AssertionError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Raises an [AssertionError] with the given message.
pub fn fail<T, S: Into<String>>(message: S) -> Result<T, AssertionError> {
    Err(AssertionError::new(message))
}

/// An immutable snapshot of one HTTP call, as seen by the matchers and response producers.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    method: Method,
    uri: RequestUri,
    headers: HeaderMap,
    body: Bytes,
    body_text: OnceLock<String>,
}

impl CapturedRequest {
    pub fn new(method: Method, uri: RequestUri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            body_text: OnceLock::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &RequestUri {
        &self.uri
    }

    /// The URI exactly as it was dispatched.
    pub fn uri_str(&self) -> &str {
        self.uri.as_str()
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The raw (still percent-encoded) query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns all values of the header with the given name in the order they were added.
    /// Name lookup is case-insensitive. Values that are not valid UTF-8 are decoded lossily.
    pub fn header_values(&self, name: &str) -> Vec<String> {
        self.headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).to_string())
            .collect()
    }

    pub fn contains_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body decoded as UTF-8 text. Decoding happens on first access only.
    pub fn body_string(&self) -> &str {
        self.body_text
            .get_or_init(|| String::from_utf8_lossy(&self.body).to_string())
    }
}

impl fmt::Display for CapturedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {} {}", self.method, self.uri)
    }
}

impl TryFrom<&http::Request<Bytes>> for CapturedRequest {
    type Error = Error;

    fn try_from(value: &http::Request<Bytes>) -> Result<Self, Self::Error> {
        let uri = value
            .uri()
            .to_string()
            .parse::<RequestUri>()
            .map_err(|err| Error::RequestConversionError(err.to_string()))?;

        // Since Bytes shares data, clone does not copy the body.
        Ok(CapturedRequest::new(
            value.method().clone(),
            uri,
            value.headers().clone(),
            value.body().clone(),
        ))
    }
}

/// A complete response as returned to the caller of a dispatch.
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl MockResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header_values(&self, name: &str) -> Vec<String> {
        self.headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).to_string())
            .collect()
    }

    /// The raw `Content-Type` header value, if present.
    pub fn content_type(&self) -> Option<Cow<'_, str>> {
        self.headers
            .get(CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

impl From<MockResponse> for http::Response<Bytes> {
    fn from(value: MockResponse) -> Self {
        let mut response = http::Response::new(value.body);
        *response.status_mut() = value.status;
        *response.headers_mut() = value.headers;
        response
    }
}

/// The number of times a registered mock may be invoked.
///
/// Both bounds are inclusive. Conversions from `usize` and from ranges follow the
/// usual Rust range semantics, so `2..` means "at least twice" and `..=3` means
/// "at most three times".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedCount {
    min: usize,
    max: usize,
}

impl ExpectedCount {
    pub fn once() -> Self {
        Self::times(1)
    }

    pub fn twice() -> Self {
        Self::times(2)
    }

    pub fn times(count: usize) -> Self {
        Self {
            min: count,
            max: count,
        }
    }

    pub fn min(min: usize) -> Self {
        Self {
            min,
            max: usize::MAX,
        }
    }

    pub fn max(max: usize) -> Self {
        Self { min: 0, max }
    }

    /// # Panics
    /// Panics if `min` is greater than `max`.
    pub fn between(min: usize, max: usize) -> Self {
        assert!(
            min <= max,
            "invalid expected count: min {} is greater than max {}",
            min,
            max
        );
        Self { min, max }
    }

    pub fn many_times() -> Self {
        Self::min(1)
    }

    pub fn never() -> Self {
        Self::times(0)
    }

    pub fn min_count(&self) -> usize {
        self.min
    }

    pub fn max_count(&self) -> usize {
        self.max
    }

    /// Whether `calls` invocations satisfy both bounds.
    pub fn is_satisfied_by(&self, calls: usize) -> bool {
        calls >= self.min && calls <= self.max
    }

    /// Whether a mock that has already been called `calls` times may accept another call.
    pub fn accepts_more(&self, calls: usize) -> bool {
        calls < self.max
    }

    fn from_bounds<R: RangeBounds<usize>>(range: R) -> Self {
        let min = match range.start_bound() {
            Bound::Included(v) => *v,
            Bound::Excluded(v) => v.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let max = match range.end_bound() {
            Bound::Included(v) => *v,
            Bound::Excluded(v) => v.saturating_sub(1),
            Bound::Unbounded => usize::MAX,
        };
        Self::between(min, max)
    }
}

impl Default for ExpectedCount {
    fn default() -> Self {
        Self::once()
    }
}

impl From<usize> for ExpectedCount {
    fn from(value: usize) -> Self {
        Self::times(value)
    }
}

impl From<std::ops::Range<usize>> for ExpectedCount {
    fn from(value: std::ops::Range<usize>) -> Self {
        Self::from_bounds(value)
    }
}

impl From<std::ops::RangeInclusive<usize>> for ExpectedCount {
    fn from(value: std::ops::RangeInclusive<usize>) -> Self {
        Self::from_bounds(value)
    }
}

impl From<std::ops::RangeFrom<usize>> for ExpectedCount {
    fn from(value: std::ops::RangeFrom<usize>) -> Self {
        Self::from_bounds(value)
    }
}

impl From<std::ops::RangeTo<usize>> for ExpectedCount {
    fn from(value: std::ops::RangeTo<usize>) -> Self {
        Self::from_bounds(value)
    }
}

impl From<std::ops::RangeToInclusive<usize>> for ExpectedCount {
    fn from(value: std::ops::RangeToInclusive<usize>) -> Self {
        Self::from_bounds(value)
    }
}

impl fmt::Display for ExpectedCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (1, 1) => write!(f, "once"),
            (0, 0) => write!(f, "never"),
            (min, max) if min == max => write!(f, "exactly {} times", min),
            (min, usize::MAX) => write!(f, "at least {} {}", min, times_str(min)),
            (0, max) => write!(f, "at most {} {}", max, times_str(max)),
            (min, max) => write!(f, "between {} and {} times", min, max),
        }
    }
}

#[inline]
fn times_str<'a>(v: usize) -> &'a str {
    if v == 1 {
        return "time";
    }

    "times"
}
