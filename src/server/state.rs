use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    api::spec::Responder,
    common::{
        data::{fail, AssertionError, CapturedRequest, ExpectedCount, MockResponse},
        json::JsonConfig,
    },
    server::matchers::{Expectation, RequestMatcher},
};

/// A registered mock: what it accepts, how often, and how it answers.
pub(crate) struct MockRegistration {
    pub id: usize,
    pub count: ExpectedCount,
    /// Method and URI pre-checks. A request failing one of them never reaches `matchers`.
    pub filters: Vec<Expectation>,
    pub matchers: Vec<Box<dyn RequestMatcher>>,
    pub responder: Option<Arc<dyn Responder>>,
    pub call_counter: usize,
}

impl MockRegistration {
    /// Runs all checks in declaration order, stopping at the first failure.
    fn evaluate(&self, req: &CapturedRequest) -> Result<(), Mismatch> {
        let mut passed = 0;

        for filter in &self.filters {
            run_check(filter, req, passed)?;
            passed += 1;
        }

        for matcher in &self.matchers {
            run_check(matcher.as_ref(), req, passed)?;
            passed += 1;
        }

        Ok(())
    }

    pub fn description(&self) -> String {
        let parts: Vec<String> = self
            .filters
            .iter()
            .map(|f| f.to_string())
            .chain(self.matchers.iter().map(|m| m.describe()))
            .collect();

        if parts.is_empty() {
            return String::from("any request");
        }
        parts.join(", ")
    }
}

fn run_check(
    check: &dyn RequestMatcher,
    req: &CapturedRequest,
    passed: usize,
) -> Result<(), Mismatch> {
    check.matches(req).map_err(|error| Mismatch {
        score: passed,
        diff: check.diff_texts(req),
        error,
    })
}

/// Why a request was not accepted by a mock.
#[derive(Debug, Clone)]
pub(crate) struct Mismatch {
    /// Number of checks that passed before the failing one.
    pub score: usize,
    pub error: AssertionError,
    pub diff: Option<(String, String)>,
}

/// The recorded request that came closest to satisfying a mock.
#[derive(Debug, Clone)]
pub(crate) struct ClosestMatch {
    pub request_index: usize,
    pub request: Arc<CapturedRequest>,
    pub mismatch: Mismatch,
}

/// A snapshot of one registration, used for reports.
#[derive(Debug, Clone)]
pub(crate) struct MockSummary {
    pub id: usize,
    pub description: String,
    pub expected: ExpectedCount,
    pub hits: usize,
}

impl MockSummary {
    pub fn is_satisfied(&self) -> bool {
        self.expected.is_satisfied_by(self.hits)
    }
}

#[derive(Default)]
pub(crate) struct MockServerState {
    next_mock_id: usize,
    pub mocks: BTreeMap<usize, MockRegistration>,
    pub history: Vec<Arc<CapturedRequest>>,
}

pub(crate) trait StateManager {
    fn reset(&self);
    fn add_mock(
        &self,
        count: ExpectedCount,
        filters: Vec<Expectation>,
        matchers: Vec<Box<dyn RequestMatcher>>,
    ) -> usize;
    fn add_matcher(&self, id: usize, matcher: Box<dyn RequestMatcher>) -> bool;
    fn set_responder(&self, id: usize, responder: Arc<dyn Responder>) -> bool;
    fn hits(&self, id: usize) -> Option<usize>;
    fn summaries(&self) -> Vec<MockSummary>;
    fn history(&self) -> Vec<Arc<CapturedRequest>>;
    fn closest_match(&self, id: usize) -> Option<ClosestMatch>;
    fn serve_mock(
        &self,
        req: CapturedRequest,
        config: &JsonConfig,
    ) -> Result<MockResponse, AssertionError>;
}

pub(crate) struct JsonMockStateManager {
    state: Mutex<MockServerState>,
}

impl JsonMockStateManager {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockServerState::default()),
        }
    }

    // A panic inside a user supplied matcher poisons the lock. The state itself stays
    // consistent, so later calls keep working.
    fn lock(&self) -> MutexGuard<'_, MockServerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for JsonMockStateManager {
    fn default() -> Self {
        JsonMockStateManager::new()
    }
}

impl StateManager for JsonMockStateManager {
    fn reset(&self) {
        let mut state = self.lock();
        state.mocks.clear();
        state.history.clear();
        tracing::debug!("Deleted all mocks and the request history");
    }

    fn add_mock(
        &self,
        count: ExpectedCount,
        filters: Vec<Expectation>,
        matchers: Vec<Box<dyn RequestMatcher>>,
    ) -> usize {
        let mut state = self.lock();

        let id = state.next_mock_id;
        state.next_mock_id += 1;

        let registration = MockRegistration {
            id,
            count,
            filters,
            matchers,
            responder: None,
            call_counter: 0,
        };

        tracing::debug!(
            "Adding new mock with ID={} expected {}: {}",
            id,
            count,
            registration.description()
        );

        state.mocks.insert(id, registration);
        id
    }

    fn add_matcher(&self, id: usize, matcher: Box<dyn RequestMatcher>) -> bool {
        match self.lock().mocks.get_mut(&id) {
            Some(mock) => {
                mock.matchers.push(matcher);
                true
            }
            None => false,
        }
    }

    fn set_responder(&self, id: usize, responder: Arc<dyn Responder>) -> bool {
        match self.lock().mocks.get_mut(&id) {
            Some(mock) => {
                mock.responder = Some(responder);
                true
            }
            None => false,
        }
    }

    fn hits(&self, id: usize) -> Option<usize> {
        self.lock().mocks.get(&id).map(|m| m.call_counter)
    }

    fn summaries(&self) -> Vec<MockSummary> {
        self.lock()
            .mocks
            .values()
            .map(|m| MockSummary {
                id: m.id,
                description: m.description(),
                expected: m.count,
                hits: m.call_counter,
            })
            .collect()
    }

    fn history(&self) -> Vec<Arc<CapturedRequest>> {
        self.lock().history.clone()
    }

    fn closest_match(&self, id: usize) -> Option<ClosestMatch> {
        let state = self.lock();
        let mock = state.mocks.get(&id)?;

        let mut closest: Option<ClosestMatch> = None;
        for (request_index, request) in state.history.iter().enumerate() {
            let mismatch = match mock.evaluate(request) {
                Ok(()) => continue,
                Err(mismatch) => mismatch,
            };

            let better = closest
                .as_ref()
                .map_or(true, |c| mismatch.score > c.mismatch.score);
            if better {
                closest = Some(ClosestMatch {
                    request_index,
                    request: request.clone(),
                    mismatch,
                });
            }
        }

        closest
    }

    fn serve_mock(
        &self,
        req: CapturedRequest,
        config: &JsonConfig,
    ) -> Result<MockResponse, AssertionError> {
        let req = Arc::new(req);
        let mut state = self.lock();

        tracing::trace!("Matching incoming request {}", req);

        let executed: usize = state.mocks.values().map(|m| m.call_counter).sum();
        state.history.push(req.clone());

        let mut selected = None;
        let mut best: Option<Mismatch> = None;

        for mock in state.mocks.values() {
            if !mock.count.accepts_more(mock.call_counter) {
                tracing::trace!("Skipping mock with id={} (expected {})", mock.id, mock.count);
                continue;
            }

            match mock.evaluate(&req) {
                Ok(()) => {
                    selected = Some(mock.id);
                    break;
                }
                Err(mismatch) => {
                    tracing::trace!("Mock with id={} rejected the request: {}", mock.id, mismatch.error);
                    if best.as_ref().map_or(true, |b| mismatch.score > b.score) {
                        best = Some(mismatch);
                    }
                }
            }
        }

        let found_id = match selected {
            Some(id) => id,
            None => {
                tracing::debug!("Could not match any mock to the request {}", req);
                return match best {
                    Some(mismatch) => Err(mismatch.error),
                    None => fail(format!(
                        "No further requests expected: {}\n{} request(s) executed.",
                        req, executed
                    )),
                };
            }
        };

        let responder = match state.mocks.get_mut(&found_id) {
            Some(mock) => {
                mock.call_counter += 1;
                mock.responder.clone()
            }
            None => None,
        };

        // Responders run without holding the lock.
        drop(state);

        tracing::debug!("Matched mock with id={} to the request {}", found_id, req);

        match responder {
            Some(responder) => responder.respond(&req, config),
            None => fail(format!(
                "No response has been defined for the mock matching {}",
                req
            )),
        }
    }
}
