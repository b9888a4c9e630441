use std::{
    cell::Cell,
    fmt,
    rc::Rc,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use http::Method;

use crate::{
    api::{
        mock::{Mock, ResponseActions},
        output,
        spec::{ResponseSpec, Then, When},
        Dispatcher,
    },
    common::{
        data::{AssertionError, CapturedRequest, ExpectedCount, MockResponse},
        json::JsonConfig,
        uri::RequestUri,
        util::read_env,
    },
    server::{
        matchers::{self, Expectation, RequestMatcher},
        state::{JsonMockStateManager, StateManager},
    },
};

/// Optional pre-checks and the expected count of a mock created with [MockServer::mock_with].
#[derive(Debug, Clone, Default)]
pub struct MockOptions {
    count: ExpectedCount,
    method: Option<Method>,
    uri: Option<RequestUri>,
}

impl MockOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count<C: Into<ExpectedCount>>(mut self, count: C) -> Self {
        self.count = count.into();
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// # Panics
    /// Panics if `uri` is not a valid URI reference.
    pub fn uri<U: TryInto<RequestUri>>(mut self, uri: U) -> Self
    where
        U::Error: fmt::Display,
    {
        match uri.try_into() {
            Ok(uri) => self.uri = Some(uri),
            Err(err) => panic!("cannot convert URI: {}", err),
        }
        self
    }

    fn filters(&self) -> Vec<Expectation> {
        let mut filters = Vec::new();
        if let Some(method) = &self.method {
            filters.push(matchers::method(method.clone()));
        }
        if let Some(uri) = &self.uri {
            filters.push(Expectation::RequestTo(uri.clone()));
        }
        filters
    }
}

/// An in-process mock server session.
///
/// Mocks are registered with [MockServer::mock] or [MockServer::expect], requests are handed
/// to the server through the [Dispatcher] trait, and [MockServer::verify] confirms at the end
/// of a test that every mock was called as often as expected.
///
/// ```
/// use jsonmock::prelude::*;
///
/// let server = MockServer::new();
///
/// let m = server.mock_get("/customers/42", |when, then| {
///     when.accept_json();
///     then.respond_json(|_| serde_json::json!({"id": 42}));
/// });
///
/// let response = server
///     .get_for_json("/customers/42")
///     .unwrap()
///     .and_return();
///
/// assert_eq!(response.body_string(), r#"{"id":42}"#);
/// m.assert();
/// server.verify().unwrap();
/// ```
pub struct MockServer {
    pub(crate) state: JsonMockStateManager,
    config: JsonConfig,
}

impl MockServer {
    /// Creates a session that serializes JSON with [JsonConfig::global].
    pub fn new() -> Self {
        Self::with_config(JsonConfig::global())
    }

    pub fn with_config(config: JsonConfig) -> Self {
        Self {
            state: JsonMockStateManager::new(),
            config,
        }
    }

    pub fn config(&self) -> &JsonConfig {
        &self.config
    }

    /// Registers a mock that is expected to be called once. The returned chain must be
    /// completed with one of the `respond*` methods.
    pub fn expect<M: RequestMatcher + 'static>(&self, matcher: M) -> ResponseActions<'_> {
        self.expect_times(ExpectedCount::once(), matcher)
    }

    pub fn expect_times<C, M>(&self, count: C, matcher: M) -> ResponseActions<'_>
    where
        C: Into<ExpectedCount>,
        M: RequestMatcher + 'static,
    {
        let matcher: Box<dyn RequestMatcher> = Box::new(matcher);
        let id = self.state.add_mock(count.into(), Vec::new(), vec![matcher]);

        ResponseActions { id, server: self }
    }

    /// Registers a mock that is expected to be called once.
    pub fn mock<F>(&self, spec_fn: F) -> Mock<'_>
    where
        F: FnOnce(When, Then),
    {
        self.mock_with(MockOptions::new(), spec_fn)
    }

    pub fn mock_times<C, F>(&self, count: C, spec_fn: F) -> Mock<'_>
    where
        C: Into<ExpectedCount>,
        F: FnOnce(When, Then),
    {
        self.mock_with(MockOptions::new().count(count), spec_fn)
    }

    pub fn mock_get<U, F>(&self, uri: U, spec_fn: F) -> Mock<'_>
    where
        U: TryInto<RequestUri>,
        U::Error: fmt::Display,
        F: FnOnce(When, Then),
    {
        self.mock_with(MockOptions::new().method(Method::GET).uri(uri), spec_fn)
    }

    pub fn mock_post<U, F>(&self, uri: U, spec_fn: F) -> Mock<'_>
    where
        U: TryInto<RequestUri>,
        U::Error: fmt::Display,
        F: FnOnce(When, Then),
    {
        self.mock_with(MockOptions::new().method(Method::POST).uri(uri), spec_fn)
    }

    pub fn mock_put<U, F>(&self, uri: U, spec_fn: F) -> Mock<'_>
    where
        U: TryInto<RequestUri>,
        U::Error: fmt::Display,
        F: FnOnce(When, Then),
    {
        self.mock_with(MockOptions::new().method(Method::PUT).uri(uri), spec_fn)
    }

    pub fn mock_patch<U, F>(&self, uri: U, spec_fn: F) -> Mock<'_>
    where
        U: TryInto<RequestUri>,
        U::Error: fmt::Display,
        F: FnOnce(When, Then),
    {
        self.mock_with(MockOptions::new().method(Method::PATCH).uri(uri), spec_fn)
    }

    pub fn mock_delete<U, F>(&self, uri: U, spec_fn: F) -> Mock<'_>
    where
        U: TryInto<RequestUri>,
        U::Error: fmt::Display,
        F: FnOnce(When, Then),
    {
        self.mock_with(MockOptions::new().method(Method::DELETE).uri(uri), spec_fn)
    }

    /// Registers a mock. The method and URI of `options` are checked before any expectation
    /// declared in `spec_fn`.
    pub fn mock_with<F>(&self, options: MockOptions, spec_fn: F) -> Mock<'_>
    where
        F: FnOnce(When, Then),
    {
        let expectations = Rc::new(Cell::new(Vec::new()));
        let response = Rc::new(Cell::new(ResponseSpec::new()));
        let responder = Rc::new(Cell::new(None));

        spec_fn(
            When {
                expectations: expectations.clone(),
            },
            Then {
                response: response.clone(),
                responder: responder.clone(),
            },
        );

        let id = self
            .state
            .add_mock(options.count, options.filters(), expectations.take());

        match responder.take() {
            Some(responder) => self.state.set_responder(id, responder),
            None => self.state.set_responder(id, Arc::new(response.take())),
        };

        Mock { id, server: self }
    }

    /// Checks that every registered mock has been called as often as expected.
    pub fn verify(&self) -> Result<(), AssertionError> {
        let summaries = self.state.summaries();

        let first_unsatisfied = match summaries.iter().find(|s| !s.is_satisfied()) {
            Some(summary) => summary.id,
            None => return Ok(()),
        };

        let executed = summaries.iter().map(|s| s.hits).sum();
        let closest = self
            .state
            .closest_match(first_unsatisfied)
            .map(|c| (first_unsatisfied, c));

        Err(AssertionError::new(output::verification_failure(
            &summaries, executed, closest,
        )))
    }

    /// Like [MockServer::verify], but keeps checking until `timeout` elapses. Requests may
    /// arrive from other threads in the meantime.
    ///
    /// The polling interval is read from `JSONMOCK_VERIFY_POLL_INTERVAL_MS` (default 10).
    pub fn verify_timeout(&self, timeout: Duration) -> Result<(), AssertionError> {
        let interval = read_env("JSONMOCK_VERIFY_POLL_INTERVAL_MS", "10")
            .parse::<u64>()
            .expect("Cannot parse environment variable JSONMOCK_VERIFY_POLL_INTERVAL_MS to an integer");
        let interval = Duration::from_millis(interval.max(1));
        let deadline = Instant::now() + timeout;

        loop {
            let result = self.verify();
            if result.is_ok() || Instant::now() >= deadline {
                return result;
            }
            thread::sleep(interval.min(deadline.saturating_duration_since(Instant::now())));
        }
    }

    /// Deletes all mocks and clears the request history.
    pub fn reset(&self) {
        self.state.reset();
    }

    /// All requests dispatched to this server, matched or not, in arrival order.
    pub fn requests(&self) -> Vec<Arc<CapturedRequest>> {
        self.state.history()
    }
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher for MockServer {
    fn dispatch(&self, req: CapturedRequest) -> Result<MockResponse, AssertionError> {
        self.state.serve_mock(req, &self.config)
    }

    fn json_config(&self) -> JsonConfig {
        self.config
    }
}
