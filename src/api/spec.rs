use std::{cell::Cell, fmt, rc::Rc, sync::Arc};

use bytes::Bytes;
use http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::{
    common::{
        data::{AssertionError, CapturedRequest, Error, MockResponse},
        json::{JsonConfig, JsonExpect},
        media_type::IntoMediaType,
        uri::RequestUri,
        util::update_cell,
    },
    server::matchers::{self, RequestMatcher},
};

/// Produces the response for a request that matched a mock.
///
/// Responders run only after every expectation of the mock has passed, so they may read
/// anything from the matched request.
pub trait Responder: Send + Sync {
    fn respond(
        &self,
        req: &CapturedRequest,
        config: &JsonConfig,
    ) -> Result<MockResponse, AssertionError>;
}

impl<F> Responder for F
where
    F: Fn(&CapturedRequest) -> MockResponse + Send + Sync,
{
    fn respond(&self, req: &CapturedRequest, _: &JsonConfig) -> Result<MockResponse, AssertionError> {
        Ok((self)(req))
    }
}

impl Responder for MockResponse {
    fn respond(&self, _: &CapturedRequest, _: &JsonConfig) -> Result<MockResponse, AssertionError> {
        Ok(self.clone())
    }
}

type JsonProducer = Arc<dyn Fn(&CapturedRequest, &JsonConfig) -> Result<String, Error> + Send + Sync>;

#[derive(Clone, Default)]
enum BodySource {
    #[default]
    Empty,
    Literal(Bytes),
    Json(JsonProducer),
}

impl fmt::Debug for BodySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodySource::Empty => f.write_str("Empty"),
            BodySource::Literal(bytes) => f.debug_tuple("Literal").field(bytes).finish(),
            BodySource::Json(_) => f.write_str("Json(<producer>)"),
        }
    }
}

/// A canned response: status, headers and a body that is either fixed or produced from the
/// matched request.
///
/// JSON bodies are serialized with the [JsonConfig] of the server at dispatch time and always
/// carry `Content-Type: application/json`, replacing any content type set before.
#[derive(Debug, Clone, Default)]
pub struct ResponseSpec {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BodySource,
}

impl ResponseSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    /// Panics if `status` is not a valid HTTP status code.
    pub fn status<U16: TryInto<u16>>(mut self, status: U16) -> Self
    where
        <U16 as TryInto<u16>>::Error: fmt::Debug,
    {
        let status = status.try_into().expect("cannot parse status code to u16");
        self.status = Some(StatusCode::from_u16(status).expect("invalid HTTP status code"));
        self
    }

    /// Appends a header. Earlier values with the same name are kept.
    ///
    /// # Panics
    /// Panics if the name or value is not a valid header name or value.
    pub fn header<N: AsRef<str>, V: AsRef<str>>(mut self, name: N, value: V) -> Self {
        let name = HeaderName::try_from(name.as_ref()).expect("cannot convert header name");
        let value = HeaderValue::try_from(value.as_ref()).expect("cannot convert header value");
        self.headers.append(name, value);
        self
    }

    /// Appends all given headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.headers.append(name.clone(), value.clone());
        }
        self
    }

    pub fn body<B: AsRef<[u8]>>(mut self, body: B) -> Self {
        self.body = BodySource::Literal(Bytes::copy_from_slice(body.as_ref()));
        self
    }

    pub(crate) fn without_body(mut self) -> Self {
        self.body = BodySource::Empty;
        self
    }

    pub fn json_body<V: Into<Value>>(mut self, body: V) -> Self {
        let body = body.into();
        self.body = BodySource::Json(Arc::new(move |_, config| config.stringify(&body)));
        self
    }

    /// Uses the value returned by `producer` for the matched request as JSON body.
    pub fn json_with<T, F>(mut self, producer: F) -> Self
    where
        T: Serialize,
        F: Fn(&CapturedRequest) -> T + Send + Sync + 'static,
    {
        self.body = BodySource::Json(Arc::new(move |req, config| config.stringify(&producer(req))));
        self
    }

    pub fn build(
        &self,
        req: &CapturedRequest,
        config: &JsonConfig,
    ) -> Result<MockResponse, AssertionError> {
        let mut headers = self.headers.clone();

        let body = match &self.body {
            BodySource::Empty => Bytes::new(),
            BodySource::Literal(bytes) => bytes.clone(),
            BodySource::Json(producer) => {
                let text = producer(req, config).map_err(|err| {
                    AssertionError::new(format!("Unable to serialize response body - {}", err))
                })?;
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Bytes::from(text)
            }
        };

        Ok(MockResponse::new(self.status.unwrap_or(StatusCode::OK))
            .with_headers(headers)
            .with_body(body))
    }
}

impl Responder for ResponseSpec {
    fn respond(
        &self,
        req: &CapturedRequest,
        config: &JsonConfig,
    ) -> Result<MockResponse, AssertionError> {
        self.build(req, config)
    }
}

/// The expectations a request must satisfy to be served by a mock.
///
/// Expectations are evaluated in the order they are declared, and evaluation stops at the
/// first one that fails.
///
/// ```
/// use jsonmock::prelude::*;
///
/// let server = MockServer::new();
/// let m = server.mock(|when, then| {
///     when.method(POST)
///         .request_to("/testendpoint")
///         .accept_json()
///         .request_json(|json| {
///             json.property("name", "Mary");
///         });
///     then.respond_json(|_| serde_json::json!({"id": 1}));
/// });
/// # let _ = m;
/// ```
pub struct When {
    pub(crate) expectations: Rc<Cell<Vec<Box<dyn RequestMatcher>>>>,
}

impl When {
    fn push<M: RequestMatcher + 'static>(self, matcher: M) -> Self {
        update_cell(&self.expectations, |e| e.push(Box::new(matcher)));
        self
    }

    /// Adds a prepared [Expectation](crate::Expectation) or any other [RequestMatcher].
    pub fn matches<M: RequestMatcher + 'static>(self, matcher: M) -> Self {
        self.push(matcher)
    }

    /// # Panics
    /// Panics if `method` cannot be converted into a [Method].
    pub fn method<M: TryInto<Method>>(self, method: M) -> Self
    where
        <M as TryInto<Method>>::Error: fmt::Debug,
    {
        let method = method
            .try_into()
            .expect("cannot convert method into http::Method");
        self.push(matchers::method(method))
    }

    pub fn request_to<U: TryInto<RequestUri>>(self, uri: U) -> Self
    where
        U::Error: fmt::Display,
    {
        self.push(matchers::request_to(uri))
    }

    pub fn request_to_matching<F>(self, test: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.push(matchers::request_to_matching(test))
    }

    pub fn request_to_regex(self, pattern: &str) -> Self {
        self.push(matchers::request_to_regex(pattern))
    }

    pub fn query_param<I, S>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(matchers::query_param(name, values))
    }

    pub fn header<I, S>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(matchers::header(name, values))
    }

    pub fn header_matching<F>(self, name: &str, test: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.push(matchers::header_matching(name, test))
    }

    pub fn header_regex(self, name: &str, pattern: &str) -> Self {
        self.push(matchers::header_regex(name, pattern))
    }

    pub fn accept<M: IntoMediaType>(self, media_type: M) -> Self {
        self.push(matchers::accept(media_type))
    }

    pub fn accept_json(self) -> Self {
        self.push(matchers::accept_json())
    }

    pub fn content_type<M: IntoMediaType>(self, media_type: M) -> Self {
        self.push(matchers::content_type(media_type))
    }

    pub fn content_type_json(self) -> Self {
        self.push(matchers::content_type_json())
    }

    pub fn header_does_not_exist(self, name: &str) -> Self {
        self.push(matchers::header_does_not_exist(name))
    }

    pub fn request_content<S: Into<String>>(self, expected: S) -> Self {
        self.push(matchers::request_content(expected))
    }

    pub fn request_content_matching<F>(self, test: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.push(matchers::request_content_matching(test))
    }

    /// Requires `Content-Type: application/json` (or a compatible type) and a body that
    /// satisfies the structural description.
    pub fn request_json<F: FnOnce(&mut JsonExpect)>(self, f: F) -> Self {
        self.push(matchers::request_json(f))
    }
}

/// The response a mock returns.
///
/// By default a mock answers with `200 OK` and an empty body. The `respond*` methods replace
/// the body. Status and headers configured earlier are kept unless the call sets its own.
/// [Then::respond_with] takes over the whole response.
pub struct Then {
    pub(crate) response: Rc<Cell<ResponseSpec>>,
    pub(crate) responder: Rc<Cell<Option<Arc<dyn Responder>>>>,
}

impl Then {
    fn update<F: FnOnce(ResponseSpec) -> ResponseSpec>(self, f: F) -> Self {
        update_cell(&self.response, |r| *r = f(std::mem::take(r)));
        self.responder.set(None);
        self
    }

    pub fn status<U16: TryInto<u16>>(self, status: U16) -> Self
    where
        <U16 as TryInto<u16>>::Error: fmt::Debug,
    {
        self.update(|r| r.status(status))
    }

    pub fn header<N: AsRef<str>, V: AsRef<str>>(self, name: N, value: V) -> Self {
        self.update(|r| r.header(name, value))
    }

    pub fn headers(self, headers: HeaderMap) -> Self {
        self.update(|r| r.headers(headers))
    }

    pub fn body<B: AsRef<[u8]>>(self, body: B) -> Self {
        self.update(|r| r.body(body))
    }

    pub fn json_body<V: Into<Value>>(self, body: V) -> Self {
        self.update(|r| r.json_body(body))
    }

    /// Responds with the JSON serialization of the value returned by `producer`.
    /// The producer runs once per matched request.
    pub fn respond_json<T, F>(self, producer: F) -> Self
    where
        T: Serialize,
        F: Fn(&CapturedRequest) -> T + Send + Sync + 'static,
    {
        self.update(|r| r.json_with(producer))
    }

    /// Like [Then::respond_json] with an explicit status and additional headers.
    pub fn respond_json_with<U16, T, F>(self, status: U16, headers: HeaderMap, producer: F) -> Self
    where
        U16: TryInto<u16>,
        <U16 as TryInto<u16>>::Error: fmt::Debug,
        T: Serialize,
        F: Fn(&CapturedRequest) -> T + Send + Sync + 'static,
    {
        self.update(|r| r.status(status).headers(headers).json_with(producer))
    }

    /// Responds with the given text.
    pub fn respond<S: AsRef<str>>(self, body: S) -> Self {
        self.update(|r| r.body(body.as_ref()))
    }

    /// Responds with the given status and an empty body.
    pub fn respond_status<U16: TryInto<u16>>(self, status: U16) -> Self
    where
        <U16 as TryInto<u16>>::Error: fmt::Debug,
    {
        self.update(|r| r.status(status).without_body())
    }

    /// Hands the matched request to `f`, which builds the complete response.
    pub fn respond_with<F>(self, f: F) -> Self
    where
        F: Fn(&CapturedRequest) -> MockResponse + Send + Sync + 'static,
    {
        self.responder.set(Some(Arc::new(f)));
        self
    }
}
