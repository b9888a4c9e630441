use std::fmt;

use http::Method;

use crate::{
    api::{request::RequestBuilder, result::ResultActions},
    common::{
        data::{AssertionError, CapturedRequest, MockResponse},
        json::JsonConfig,
    },
};

/// Hands a request to whatever serves it in-process and returns the reply.
///
/// [MockServer](crate::MockServer) implements this trait. Any closure taking a
/// [CapturedRequest] does as well, which makes it easy to test request handlers directly.
pub trait Dispatcher {
    fn dispatch(&self, req: CapturedRequest) -> Result<MockResponse, AssertionError>;

    /// The configuration used to serialize JSON request bodies sent to this dispatcher.
    fn json_config(&self) -> JsonConfig {
        JsonConfig::global()
    }
}

impl<F> Dispatcher for F
where
    F: Fn(CapturedRequest) -> Result<MockResponse, AssertionError>,
{
    fn dispatch(&self, req: CapturedRequest) -> Result<MockResponse, AssertionError> {
        (self)(req)
    }
}

/// JSON shortcuts available on every [Dispatcher]. Each one presets
/// `Accept: application/json` before the optional configuration closure runs.
pub trait DispatcherExt: Dispatcher {
    fn perform(&self, builder: RequestBuilder) -> Result<ResultActions, AssertionError> {
        builder.perform(self)
    }

    fn get_for_json(&self, uri: &str) -> Result<ResultActions, AssertionError> {
        self.get_for_json_with(uri, |req| req)
    }

    fn get_for_json_with<F>(&self, uri: &str, f: F) -> Result<ResultActions, AssertionError>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        self.request_for_json(Method::GET, uri, f)
    }

    fn post_for_json(&self, uri: &str) -> Result<ResultActions, AssertionError> {
        self.post_for_json_with(uri, |req| req)
    }

    fn post_for_json_with<F>(&self, uri: &str, f: F) -> Result<ResultActions, AssertionError>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        self.request_for_json(Method::POST, uri, f)
    }

    /// Like [get_for_json](DispatcherExt::get_for_json), with the `{...}` placeholders of
    /// `template` replaced by `vars` in order.
    fn get_for_json_template<I>(&self, template: &str, vars: I) -> Result<ResultActions, AssertionError>
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        self.get_for_json_template_with(template, vars, |req| req)
    }

    fn get_for_json_template_with<I, F>(
        &self,
        template: &str,
        vars: I,
        f: F,
    ) -> Result<ResultActions, AssertionError>
    where
        I: IntoIterator,
        I::Item: fmt::Display,
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        self.perform_for_json(RequestBuilder::from_template(Method::GET, template, vars), f)
    }

    fn post_for_json_template<I>(&self, template: &str, vars: I) -> Result<ResultActions, AssertionError>
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        self.post_for_json_template_with(template, vars, |req| req)
    }

    fn post_for_json_template_with<I, F>(
        &self,
        template: &str,
        vars: I,
        f: F,
    ) -> Result<ResultActions, AssertionError>
    where
        I: IntoIterator,
        I::Item: fmt::Display,
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        self.perform_for_json(RequestBuilder::from_template(Method::POST, template, vars), f)
    }

    fn put_for_json_with<F>(&self, uri: &str, f: F) -> Result<ResultActions, AssertionError>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        self.request_for_json(Method::PUT, uri, f)
    }

    fn patch_for_json_with<F>(&self, uri: &str, f: F) -> Result<ResultActions, AssertionError>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        self.request_for_json(Method::PATCH, uri, f)
    }

    fn delete_for_json(&self, uri: &str) -> Result<ResultActions, AssertionError> {
        self.request_for_json(Method::DELETE, uri, |req| req)
    }

    fn request_for_json<F>(
        &self,
        method: Method,
        uri: &str,
        f: F,
    ) -> Result<ResultActions, AssertionError>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        self.perform_for_json(RequestBuilder::new(method, uri), f)
    }

    fn perform_for_json<F>(&self, builder: RequestBuilder, f: F) -> Result<ResultActions, AssertionError>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let builder = builder.json_config(self.json_config()).accept_json();
        f(builder).perform(self)
    }
}

impl<D: Dispatcher + ?Sized> DispatcherExt for D {}
