//! Authenticated request gateway.
//!
//! Every call to the remote API goes through [`Gateway::send`], which
//! - resolves the endpoint against the configured API origin
//! - sets `Content-Type: application/json` unless the caller overrides it
//! - attaches `Authorization: Bearer <token>` when a credential is stored
//! - tags the request with an `x-request-id` for log correlation
//!
//! and enforces a single failure policy: an HTTP 401 clears the stored
//! credential, broadcasts [`AuthEvent::SessionExpired`], and yields
//! [`GatewayResponse::Unauthorized`]. The gateway never navigates; callers
//! decide what to do with the [`ReauthRequired`] they get back.
//!
//! There is no retry, no token refresh and no backoff.
//!
//! [`AuthEvent::SessionExpired`]: crate::session::AuthEvent::SessionExpired

mod options;

pub use options::RequestOptions;

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{Span, instrument};
use url::Url;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::session::Session;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Notice shown on the login screen after the server rejected the credential.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

/// Where the user must go to authenticate again, and what to tell them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReauthRequired {
    login_path: String,
    message: String,
}

impl ReauthRequired {
    /// A re-authentication target at `login_path` carrying `message`.
    #[must_use]
    pub fn new(login_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            message: message.into(),
        }
    }

    /// Path of the login entry point.
    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Notice for the user.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Login path with the notice as a `message` query parameter,
    /// e.g. `/login?message=Session+expired.+Please+log+in+again.`
    #[must_use]
    pub fn location(&self) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("message", &self.message)
            .finish();
        format!("{}?{query}", self.login_path)
    }
}

/// Outcome of a gateway call that produced an HTTP response.
#[derive(Debug)]
pub enum GatewayResponse {
    /// The server accepted the credential (or none was needed). The response
    /// is untouched; its status may still be any non-401 code.
    Authorized(reqwest::Response),
    /// The server answered 401. The credential has been cleared.
    Unauthorized(ReauthRequired),
}

impl GatewayResponse {
    /// The response, or [`ApiError::SessionExpired`].
    ///
    /// # Errors
    ///
    /// Returns `ApiError::SessionExpired` for an unauthorized outcome.
    pub fn into_authorized(self) -> Result<reqwest::Response, ApiError> {
        match self {
            Self::Authorized(response) => Ok(response),
            Self::Unauthorized(reauth) => Err(ApiError::SessionExpired(reauth)),
        }
    }

    /// Whether the credential was rejected.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

// =============================================================================
// Gateway
// =============================================================================

/// Issues requests against the remote API on behalf of the current session.
///
/// Cheap to clone; clones share the HTTP connection pool and the session.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    http: reqwest::Client,
    base_url: Url,
    session: Session,
    reauth: ReauthRequired,
}

impl Gateway {
    /// Create a gateway for `config` acting on behalf of `session`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, session: Session) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("lm-store/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(GatewayInner {
                http,
                base_url: config.api_base_url.clone(),
                session,
                reauth: ReauthRequired::new(config.login_path.clone(), SESSION_EXPIRED_MESSAGE),
            }),
        })
    }

    /// The session this gateway authenticates with.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// The API origin endpoints are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Issue an authenticated request.
    ///
    /// # Errors
    ///
    /// - `ApiError::Network` if no response was received
    /// - `ApiError::InvalidEndpoint` / `ApiError::InvalidHeader` for malformed input
    /// - `ApiError::Session` if the credential cannot be read
    #[instrument(
        skip(self, options),
        fields(method = %options.method(), endpoint = %endpoint, request_id = tracing::field::Empty)
    )]
    pub async fn send(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<GatewayResponse, ApiError> {
        let request = self.prepare(endpoint, options, true)?;
        let response = self.execute(request).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(GatewayResponse::Unauthorized(self.reject_credential()));
        }

        Ok(GatewayResponse::Authorized(response))
    }

    /// Issue a request that deliberately carries no credential and is exempt
    /// from the session-expiry policy (login, registration).
    ///
    /// # Errors
    ///
    /// Same as [`Gateway::send`], minus session errors.
    #[instrument(
        skip(self, options),
        fields(method = %options.method(), endpoint = %endpoint, request_id = tracing::field::Empty)
    )]
    pub async fn send_public(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<reqwest::Response, ApiError> {
        let request = self.prepare(endpoint, options, false)?;
        self.execute(request).await
    }

    /// Resolve `endpoint` against the API origin: `origin + endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidEndpoint` if the result is not a valid URL or
    /// the endpoint is absolute.
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, ApiError> {
        if endpoint.contains("://") {
            return Err(ApiError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: "must be relative to the API origin".to_string(),
            });
        }

        let base = self.inner.base_url.as_str().trim_end_matches('/');
        let joined = if endpoint.starts_with('/') {
            format!("{base}{endpoint}")
        } else {
            format!("{base}/{endpoint}")
        };

        Url::parse(&joined).map_err(|e| ApiError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }

    /// Build the outgoing request without sending it.
    ///
    /// Header precedence, lowest first: default content type, caller headers,
    /// bearer credential.
    pub(crate) fn prepare(
        &self,
        endpoint: &str,
        options: RequestOptions,
        authenticated: bool,
    ) -> Result<reqwest::Request, ApiError> {
        let url = self.endpoint_url(endpoint)?;
        let (method, body, extra_headers) = options.into_parts();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &extra_headers {
            headers.insert(name.clone(), value.clone());
        }

        if authenticated && let Some(credential) = self.inner.session.credential()? {
            let mut value = HeaderValue::from_str(&credential.token.bearer())
                .map_err(|_| ApiError::InvalidHeader("stored credential is not a valid header value".to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let request_id = Uuid::new_v4().to_string();
        Span::current().record("request_id", request_id.as_str());
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert(REQUEST_ID_HEADER, value);
        }

        let mut builder = self.inner.http.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        Ok(builder.build()?)
    }

    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, ApiError> {
        let method = request.method().clone();
        let url = request.url().clone();

        match self.inner.http.execute(request).await {
            Ok(response) => {
                tracing::debug!(status = %response.status(), "API response");
                Ok(response)
            }
            Err(e) => {
                tracing::error!(error = %e, method = %method, url = %url, "API request failed");
                Err(ApiError::Network(e))
            }
        }
    }

    /// Apply the session-expiry policy and return where to send the user.
    pub(crate) fn reject_credential(&self) -> ReauthRequired {
        if let Err(e) = self.inner.session.expire() {
            tracing::error!(error = %e, "Failed to clear rejected credential");
        }
        self.inner.reauth.clone()
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.inner.base_url.as_str())
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::session::{AuthEvent, MemorySessionStore, SessionCredential};
    use reqwest::Method;
    use reqwest::header::HeaderName;

    fn gateway_with(store: MemorySessionStore) -> Gateway {
        let config = ClientConfig::for_base_url("http://127.0.0.1:8000/api").unwrap();
        Gateway::new(&config, Session::new(store)).unwrap()
    }

    fn logged_in() -> Gateway {
        gateway_with(MemorySessionStore::with_credential(
            SessionCredential::from_token("abc123"),
        ))
    }

    #[test]
    fn test_reauth_location_encodes_message() {
        let reauth = ReauthRequired::new("/login", SESSION_EXPIRED_MESSAGE);
        assert_eq!(
            reauth.location(),
            "/login?message=Session+expired.+Please+log+in+again."
        );
    }

    #[test]
    fn test_bearer_header_and_default_get() {
        let request = logged_in()
            .prepare("/cart", RequestOptions::default(), true)
            .unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url().as_str(), "http://127.0.0.1:8000/api/cart");
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer abc123");
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert!(request.headers().contains_key(REQUEST_ID_HEADER));
        assert!(request.body().is_none());
    }

    #[test]
    fn test_no_credential_no_authorization_header() {
        let request = gateway_with(MemorySessionStore::default())
            .prepare("/products", RequestOptions::default(), true)
            .unwrap();

        assert!(!request.headers().contains_key(AUTHORIZATION));
    }

    #[test]
    fn test_public_request_never_carries_credential() {
        let request = logged_in()
            .prepare("/login", RequestOptions::post(), false)
            .unwrap();

        assert!(!request.headers().contains_key(AUTHORIZATION));
    }

    #[test]
    fn test_caller_headers_merge_under_auth() {
        let options = RequestOptions::default()
            .header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .header(AUTHORIZATION, HeaderValue::from_static("Bearer forged"))
            .header(
                HeaderName::from_static("x-client"),
                HeaderValue::from_static("cli"),
            );

        let request = logged_in().prepare("/cart", options, true).unwrap();

        assert_eq!(request.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer abc123");
        assert_eq!(request.headers()["x-client"], "cli");
    }

    #[test]
    fn test_json_body_and_method() {
        let options = RequestOptions::post()
            .json(&serde_json::json!({"product_id": 1, "quantity": 2}))
            .unwrap();

        let request = logged_in().prepare("/cart/add", options, true).unwrap();

        assert_eq!(request.method(), Method::POST);
        let body = request.body().unwrap().as_bytes().unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(parsed["quantity"], 2);
    }

    #[test]
    fn test_endpoint_without_leading_slash_and_query() {
        let gateway = logged_in();
        assert_eq!(
            gateway.endpoint_url("orders").unwrap().as_str(),
            "http://127.0.0.1:8000/api/orders"
        );
        assert_eq!(
            gateway
                .endpoint_url("/admin/product/4/stock?stock=10")
                .unwrap()
                .as_str(),
            "http://127.0.0.1:8000/api/admin/product/4/stock?stock=10"
        );
    }

    #[test]
    fn test_absolute_endpoint_rejected() {
        let err = logged_in()
            .endpoint_url("http://evil.example.com/steal")
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidEndpoint { .. }));
    }

    #[test]
    fn test_reject_credential_clears_and_announces_once() {
        let gateway = logged_in();
        let mut events = gateway.session().subscribe();

        let reauth = gateway.reject_credential();

        assert!(!gateway.session().is_authenticated());
        assert_eq!(reauth.login_path(), "/login");
        assert_eq!(reauth.message(), SESSION_EXPIRED_MESSAGE);
        assert_eq!(events.try_recv().unwrap(), AuthEvent::SessionExpired);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_into_authorized_maps_unauthorized() {
        let outcome =
            GatewayResponse::Unauthorized(ReauthRequired::new("/login", SESSION_EXPIRED_MESSAGE));
        assert!(outcome.is_unauthorized());
        let err = outcome.into_authorized().unwrap_err();
        assert!(err.reauth().is_some());
    }
}
