use std::{fmt, sync::Arc};

use http::HeaderMap;
use serde::Serialize;

use crate::{
    api::{
        output,
        spec::{Responder, ResponseSpec},
    },
    common::data::{AssertionError, CapturedRequest},
    server::{
        matchers::RequestMatcher,
        state::{MockSummary, StateManager},
    },
    MockServer,
};

/// A handle to a mock registered on a [MockServer].
///
/// # Example
/// ```
/// use jsonmock::prelude::*;
///
/// let server = MockServer::new();
/// let m = server.mock_times(2, |when, then| {
///     when.request_to("/hits");
///     then.respond_status(204);
/// });
///
/// server.dispatch(RequestBuilder::get("/hits").build().unwrap()).unwrap();
/// assert_eq!(m.hits(), 1);
///
/// server.dispatch(RequestBuilder::get("/hits").build().unwrap()).unwrap();
/// m.assert();
/// ```
pub struct Mock<'a> {
    pub(crate) id: usize,
    pub(crate) server: &'a MockServer,
}

impl<'a> Mock<'a> {
    pub fn id(&self) -> usize {
        self.id
    }

    /// How often the mock has been matched so far. Returns 0 after the server was reset.
    pub fn hits(&self) -> usize {
        self.server.state.hits(self.id).unwrap_or(0)
    }

    /// Checks that the mock has been called as often as expected.
    pub fn verify(&self) -> Result<(), AssertionError> {
        let summary = match self.summary() {
            Some(summary) => summary,
            None => {
                return Err(AssertionError::new(format!(
                    "Mock #{} no longer exists on the mock server",
                    self.id + 1
                )))
            }
        };

        if summary.is_satisfied() {
            return Ok(());
        }

        let closest = self.server.state.closest_match(self.id);
        Err(AssertionError::new(output::mock_failure(&summary, closest)))
    }

    /// # Panics
    /// Panics with a report of the closest unmatched request if the mock has not been
    /// called as often as expected.
    #[track_caller]
    pub fn assert(&self) {
        if let Err(err) = self.verify() {
            panic!("{}", err)
        }
    }

    /// # Panics
    /// Panics if the mock has not been called exactly `hits` times.
    #[track_caller]
    pub fn assert_hits(&self, hits: usize) {
        let actual = self.hits();
        if actual == hits {
            return;
        }

        let report = match self.summary() {
            Some(summary) => {
                output::mock_failure(&summary, self.server.state.closest_match(self.id))
            }
            None => format!("Mock #{} no longer exists on the mock server", self.id + 1),
        };
        panic!(
            "Expected mock #{} to be called {} time(s) but it was called {} time(s).\n{}",
            self.id + 1,
            hits,
            actual,
            report
        )
    }

    fn summary(&self) -> Option<MockSummary> {
        self.server
            .state
            .summaries()
            .into_iter()
            .find(|s| s.id == self.id)
    }
}

impl fmt::Debug for Mock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mock").field("id", &self.id).finish()
    }
}

/// The second step of [MockServer::expect]: more matchers, then exactly one response.
///
/// Until a response is defined, a request matching this mock fails.
#[must_use = "a mock without a response fails every matching request"]
pub struct ResponseActions<'a> {
    pub(crate) id: usize,
    pub(crate) server: &'a MockServer,
}

impl<'a> ResponseActions<'a> {
    pub fn and_expect<M: RequestMatcher + 'static>(self, matcher: M) -> Self {
        self.server.state.add_matcher(self.id, Box::new(matcher));
        self
    }

    pub fn and_respond<R: Responder + 'static>(self, responder: R) -> Mock<'a> {
        self.server.state.set_responder(self.id, Arc::new(responder));
        Mock {
            id: self.id,
            server: self.server,
        }
    }

    /// Responds with `200 OK` and the JSON serialization of the value returned by `producer`.
    pub fn respond_json<T, F>(self, producer: F) -> Mock<'a>
    where
        T: Serialize,
        F: Fn(&CapturedRequest) -> T + Send + Sync + 'static,
    {
        self.and_respond(ResponseSpec::new().json_with(producer))
    }

    pub fn respond_json_with<U16, T, F>(self, status: U16, headers: HeaderMap, producer: F) -> Mock<'a>
    where
        U16: TryInto<u16>,
        <U16 as TryInto<u16>>::Error: fmt::Debug,
        T: Serialize,
        F: Fn(&CapturedRequest) -> T + Send + Sync + 'static,
    {
        self.and_respond(
            ResponseSpec::new()
                .status(status)
                .headers(headers)
                .json_with(producer),
        )
    }

    /// Responds with `200 OK` and the given text.
    pub fn respond<S: AsRef<str>>(self, body: S) -> Mock<'a> {
        self.and_respond(ResponseSpec::new().body(body.as_ref()))
    }

    pub fn respond_status<U16: TryInto<u16>>(self, status: U16) -> Mock<'a>
    where
        <U16 as TryInto<u16>>::Error: fmt::Debug,
    {
        self.and_respond(ResponseSpec::new().status(status))
    }
}
