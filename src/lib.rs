//! `jsonmock` is a Rust crate for testing code that talks JSON over HTTP without a network.
//! It contains two major components:
//!
//! * a **mock server session** that stubs outbound calls: requests are checked against
//!   declared expectations and answered with canned or computed JSON responses, and
//! * a **request and result DSL** that sends JSON requests to any in-process [Dispatcher] and
//!   asserts on the response with precise, human-readable failures.
//!
//! Every check reports its problem as an [AssertionError] that carries nothing but a message,
//! e.g. `/name: JSON value doesn't match - expected "Mary", was "Maria"`.
//!
//! # Getting Started
//! Add `jsonmock` to your `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! jsonmock = "0.1.0"
//! ```
//!
//! You can then use `jsonmock` in your tests like shown in the following example:
//! ```rust
//! use jsonmock::prelude::*;
//! use serde_json::json;
//!
//! // Arrange
//! let server = MockServer::new();
//!
//! let search_mock = server.mock(|when, then| {
//!     when.method(GET)
//!         .request_to("/search")
//!         .query_param("query", ["metallica"])
//!         .accept_json();
//!     then.respond_json(|_| json!({ "results": 1 }));
//! });
//!
//! // Act: this would normally happen in the code under test.
//! let result = server.get_for_json("/search?query=metallica").unwrap();
//!
//! // Assert
//! result
//!     .and_expect(|r| {
//!         r.status().is_ok()?;
//!         r.content().matches_json(|json| {
//!             json.property("results", 1);
//!         })
//!     })
//!     .unwrap();
//! search_mock.assert();
//! server.verify().unwrap();
//! ```
//!
//! # Matching Requests
//! Expectations are evaluated in the order in which they were declared. The first one that
//! fails aborts the evaluation. When no mock accepts a request, the dispatch fails with the
//! message of the mock that came closest, i.e. the one that passed the most checks.
//!
//! Instead of the [When] block, a single [RequestMatcher] can be registered with
//! [MockServer::expect]. Any closure taking a [CapturedRequest] works, as do the prepared
//! [Expectation]s from the [matchers] module:
//!
//! ```rust
//! use jsonmock::prelude::*;
//!
//! let server = MockServer::new();
//!
//! server
//!     .expect(matchers::request_to("/customers"))
//!     .and_expect(matchers::content_type_json())
//!     .and_expect(matchers::request_json(|json| {
//!         json.property("name", "Mary");
//!     }))
//!     .respond_json_with(201, HeaderMap::new(), |req| {
//!         serde_json::json!({ "id": 1, "echo": req.body_string() })
//!     });
//!
//! let err = server
//!     .post_for_json_with("/customers", |req| {
//!         req.content_json(&serde_json::json!({ "name": "Maria" }))
//!     })
//!     .unwrap_err();
//!
//! assert_eq!(
//!     err.message(),
//!     r#"/name: JSON value doesn't match - expected "Mary", was "Maria""#
//! );
//! ```
//!
//! # Response Bodies
//! JSON bodies are produced when a request matches, never at registration time, so they may
//! depend on the request. Serialization follows the server's [JsonConfig], which defaults to
//! [JsonConfig::global]. The global configuration is read from the environment variables
//! `JSONMOCK_PRETTY_PRINT` and `JSONMOCK_INCLUDE_NULLS`.
//!
//! # Verification
//! [MockServer::verify] checks that every mock has been called as often as its
//! [ExpectedCount] requires. The report lists all mocks and the request that came closest to an
//! unsatisfied one, including a diff where that helps.
mod api;
mod common;
mod server;

pub use api::*;
pub use common::{
    data::{fail, AssertionError, CapturedRequest, Error, ExpectedCount, MockResponse},
    json::{expect_json, JsonConfig, JsonExpect},
    media_type::{IntoMediaType, MediaType, MediaTypeError},
    uri::RequestUri,
};
pub use server::matchers;
pub use server::matchers::{Expectation, RequestMatcher, StringPredicate};

pub use http::{Method, StatusCode};

pub mod prelude {
    #[doc(no_inline)]
    pub use crate::{
        expect_json, fail, matchers, AssertionError, CapturedRequest, Dispatcher,
        DispatcherExt, Expectation, ExpectedCount, JsonConfig, JsonExpect, MediaType, Mock,
        MockOptions, MockResponse, MockServer, RequestBuilder, RequestMatcher, Responder,
        ResponseSpec, ResultActions, StringPredicate, Then, When,
    };

    #[doc(no_inline)]
    pub use http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderMap, HeaderValue, Method, StatusCode,
    };

    pub const GET: Method = Method::GET;
    pub const HEAD: Method = Method::HEAD;
    pub const POST: Method = Method::POST;
    pub const PUT: Method = Method::PUT;
    pub const PATCH: Method = Method::PATCH;
    pub const DELETE: Method = Method::DELETE;
    pub const OPTIONS: Method = Method::OPTIONS;
}
