use std::fmt;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;

use crate::{
    api::{dispatcher::Dispatcher, result::ResultActions},
    common::{
        data::{AssertionError, CapturedRequest, Error},
        json::JsonConfig,
        media_type::{IntoMediaType, MediaType},
        uri::RequestUri,
    },
};

const ACCEPT: &str = "Accept";
const CONTENT_TYPE: &str = "Content-Type";

/// Builds a [CapturedRequest] to hand to a [Dispatcher].
///
/// Problems with the provided values (an invalid header, a URI template without enough
/// variables, a body that cannot be serialized) are reported when the request is built.
///
/// ```
/// use jsonmock::prelude::*;
///
/// let req = RequestBuilder::post_template("/customers/{id}/orders", [17])
///     .param("draft", "true")
///     .content_json(&serde_json::json!({"item": "book"}))
///     .build()
///     .unwrap();
///
/// assert_eq!(req.uri_str(), "/customers/17/orders?draft=true");
/// assert_eq!(req.header_values("content-type"), vec!["application/json"]);
/// assert_eq!(req.body_string(), r#"{"item":"book"}"#);
/// ```
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    uri: String,
    params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Bytes,
    config: JsonConfig,
    error: Option<Error>,
}

impl RequestBuilder {
    pub fn new<U: Into<String>>(method: Method, uri: U) -> Self {
        Self {
            method,
            uri: uri.into(),
            params: Vec::new(),
            headers: Vec::new(),
            body: Bytes::new(),
            config: JsonConfig::global(),
            error: None,
        }
    }

    /// Creates a request to `template` with its `{...}` placeholders replaced by `vars`, in
    /// order. Each value is percent-encoded.
    pub fn from_template<I>(method: Method, template: &str, vars: I) -> Self
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        match expand_uri_template(template, vars) {
            Ok(uri) => Self::new(method, uri),
            Err(err) => {
                let mut builder = Self::new(method, template);
                builder.error = Some(err);
                builder
            }
        }
    }

    pub fn get<U: Into<String>>(uri: U) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post<U: Into<String>>(uri: U) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn put<U: Into<String>>(uri: U) -> Self {
        Self::new(Method::PUT, uri)
    }

    pub fn patch<U: Into<String>>(uri: U) -> Self {
        Self::new(Method::PATCH, uri)
    }

    pub fn delete<U: Into<String>>(uri: U) -> Self {
        Self::new(Method::DELETE, uri)
    }

    pub fn get_template<I>(template: &str, vars: I) -> Self
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        Self::from_template(Method::GET, template, vars)
    }

    pub fn post_template<I>(template: &str, vars: I) -> Self
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        Self::from_template(Method::POST, template, vars)
    }

    /// Sets the configuration used by [RequestBuilder::content_json]. Only bodies added
    /// afterwards are affected.
    pub fn json_config(mut self, config: JsonConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a header value. Existing values of the same header are kept.
    pub fn header<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replaces the `Accept` header.
    ///
    /// # Panics
    /// Panics if `media_type` is not a valid media type.
    pub fn accept<M: IntoMediaType>(self, media_type: M) -> Self {
        let media_type = media_type
            .into_media_type()
            .expect("cannot convert provided value into a media type");
        self.replace_header(ACCEPT, media_type.to_string())
    }

    pub fn accept_json(self) -> Self {
        self.accept(MediaType::APPLICATION_JSON)
    }

    /// Replaces the `Content-Type` header.
    ///
    /// # Panics
    /// Panics if `media_type` is not a valid media type.
    pub fn content_type<M: IntoMediaType>(self, media_type: M) -> Self {
        let media_type = media_type
            .into_media_type()
            .expect("cannot convert provided value into a media type");
        self.replace_header(CONTENT_TYPE, media_type.to_string())
    }

    /// Adds a query parameter. Names and values are form-urlencoded when the request is built.
    pub fn param<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    /// Serializes `value` as the request body and sets `Content-Type: application/json`.
    pub fn content_json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match self.config.stringify(value) {
            Ok(json) => self.body = Bytes::from(json),
            Err(err) => self.error = self.error.or(Some(err)),
        }
        self.content_type(MediaType::APPLICATION_JSON)
    }

    /// Like [RequestBuilder::content_json], with the value taken from `producer`.
    pub fn content_json_with<T, F>(self, producer: F) -> Self
    where
        T: Serialize,
        F: FnOnce() -> T,
    {
        let value = producer();
        self.content_json(&value)
    }

    pub fn build(self) -> Result<CapturedRequest, Error> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let uri = append_query(&self.uri, &self.params).parse::<RequestUri>()?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| Error::InvalidHeader(format!("{}: {}", name, err)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|err| Error::InvalidHeader(format!("{}: {}", name, err)))?;
            headers.append(header_name, header_value);
        }

        Ok(CapturedRequest::new(self.method, uri, headers, self.body))
    }

    /// Builds the request, dispatches it and wraps the exchange for assertions.
    pub fn perform<D: Dispatcher + ?Sized>(
        self,
        dispatcher: &D,
    ) -> Result<ResultActions, AssertionError> {
        let request = self
            .build()
            .map_err(|err| AssertionError::new(format!("Unable to build request - {}", err)))?;

        tracing::debug!("Performing request {}", request);

        let response = dispatcher.dispatch(request.clone())?;
        Ok(ResultActions::new(request, response))
    }

    fn replace_header(mut self, name: &str, value: String) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value));
        self
    }
}

/// Replaces each `{...}` placeholder in `template` with the next value of `vars`.
pub fn expand_uri_template<I>(template: &str, vars: I) -> Result<String, Error>
where
    I: IntoIterator,
    I::Item: fmt::Display,
{
    let mut vars = vars.into_iter();
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let end = match rest[start..].find('}') {
            Some(offset) => start + offset,
            None => {
                return Err(Error::InvalidUri(format!(
                    "Unclosed variable in URI template '{}'",
                    template
                )))
            }
        };

        let name = &rest[start + 1..end];
        let value = match vars.next() {
            Some(value) => value.to_string(),
            None => {
                return Err(Error::InvalidUri(format!(
                    "Not enough variable values available to expand '{}'",
                    name
                )))
            }
        };

        result.push_str(&rest[..start]);
        result.push_str(&encode_uri_component(&value));
        rest = &rest[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

fn encode_uri_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn append_query(uri: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return uri.to_string();
    }

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();

    let (base, fragment) = match uri.find('#') {
        Some(idx) => uri.split_at(idx),
        None => (uri, ""),
    };

    let separator = match base.find('?') {
        None => "?",
        Some(idx) if idx + 1 == base.len() || base.ends_with('&') => "",
        Some(_) => "&",
    };

    format!("{}{}{}{}", base, separator, query, fragment)
}
