//! Per-request configuration for the gateway.

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

/// Method, body and extra headers of one gateway call.
///
/// Defaults to a bodiless `GET`.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    method: Method,
    body: Option<Vec<u8>>,
    headers: HeaderMap,
}

impl RequestOptions {
    /// A request with the given method.
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// `GET`.
    #[must_use]
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    /// `POST`.
    #[must_use]
    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    /// `PUT`.
    #[must_use]
    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    /// `DELETE`.
    #[must_use]
    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Serialize `body` as the JSON payload.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    /// Use an already serialized payload.
    #[must_use]
    pub fn raw_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add an extra header. The gateway's credential header still wins.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub(crate) fn into_parts(self) -> (Method, Option<Vec<u8>>, HeaderMap) {
        (self.method, self.body, self.headers)
    }
}
