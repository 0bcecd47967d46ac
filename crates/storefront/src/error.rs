//! Unified error handling for storefront API calls.
//!
//! Every service returns `Result<T, ApiError>`. The variants follow the three
//! failure classes the front end has to present differently:
//! - credential rejected ([`ApiError::SessionExpired`]) - send the user to log in again
//! - transport failure ([`ApiError::Network`]) - show a connection problem
//! - application rejection ([`ApiError::Rejected`]) - show the server's detail inline
//!
//! Nothing is retried automatically.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::gateway::ReauthRequired;
use crate::session::SessionError;

/// Longest server message carried into an error before truncation.
const MAX_DETAIL_CHARS: usize = 200;

/// Error type for every storefront API operation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server rejected the credential; it has already been cleared.
    #[error("Session expired: {}", .0.message())]
    SessionExpired(ReauthRequired),

    /// The request never produced a response (DNS, refused connection, timeout).
    #[error("Could not reach the store: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{detail} (HTTP {status})")]
    Rejected {
        /// Response status.
        status: StatusCode,
        /// Human-readable detail extracted from the body.
        detail: String,
    },

    /// A request or response body was not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Client storage failed.
    #[error("Session storage error: {0}")]
    Session(#[from] SessionError),

    /// Endpoint could not be joined to the API origin.
    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint {
        /// The endpoint as given.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A header name or value could not be encoded.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Input rejected before any request was sent.
    #[error("{0}")]
    Validation(String),
}

impl ApiError {
    /// The re-authentication target when the session expired.
    #[must_use]
    pub const fn reauth(&self) -> Option<&ReauthRequired> {
        match self {
            Self::SessionExpired(reauth) => Some(reauth),
            _ => None,
        }
    }

    /// HTTP status of an application-level rejection.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server refused the operation for this account (HTTP 403).
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(StatusCode::FORBIDDEN)
    }

    pub(crate) fn rejected(status: StatusCode, body: &str) -> Self {
        Self::Rejected {
            status,
            detail: extract_detail(status, body),
        }
    }
}

/// Result type alias for `ApiError`.
pub type Result<T> = std::result::Result<T, ApiError>;

// =============================================================================
// Error body parsing
// =============================================================================

/// Error bodies produced by the remote API.
///
/// - `{"detail": "Cart is empty"}` from explicit rejections
/// - `{"detail": [{"msg": "...", "loc": [...]}]}` from request validation
/// - `{"message": "...", "details": "..."}` from the global exception handler
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Detail>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Detail {
    Text(String),
    Items(Vec<DetailItem>),
}

#[derive(Deserialize)]
struct DetailItem {
    msg: String,
    #[serde(default)]
    loc: Vec<serde_json::Value>,
}

impl DetailItem {
    fn describe(&self) -> String {
        let field = self
            .loc
            .iter()
            .filter_map(serde_json::Value::as_str)
            .filter(|part| *part != "body" && *part != "query" && *part != "path")
            .collect::<Vec<_>>()
            .join(".");
        if field.is_empty() {
            self.msg.clone()
        } else {
            format!("{field}: {}", self.msg)
        }
    }
}

/// Pull a human-readable message out of a non-success response body.
fn extract_detail(status: StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();

    let detail = parsed.and_then(|b| match b.detail {
        Some(Detail::Text(text)) => Some(text),
        Some(Detail::Items(items)) if !items.is_empty() => Some(
            items
                .iter()
                .map(DetailItem::describe)
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => b.message,
    });

    detail
        .filter(|d| !d.trim().is_empty())
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty() && !trimmed.starts_with('{'))
                .then(|| trimmed.chars().take(MAX_DETAIL_CHARS).collect())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_string() {
        let detail = extract_detail(
            StatusCode::BAD_REQUEST,
            r#"{"detail": "Only 2 available in stock. You already have 1 in cart."}"#,
        );
        assert_eq!(detail, "Only 2 available in stock. You already have 1 in cart.");
    }

    #[test]
    fn test_detail_validation_list() {
        let body = r#"{"detail": [
            {"loc": ["body", "quantity"], "msg": "Input should be a valid integer", "type": "int_parsing"},
            {"loc": ["body", "product_id"], "msg": "Field required", "type": "missing"}
        ]}"#;
        let detail = extract_detail(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert_eq!(
            detail,
            "quantity: Input should be a valid integer; product_id: Field required"
        );
    }

    #[test]
    fn test_global_handler_message() {
        let body = r#"{"message": "Oops! Something went wrong on our side.", "details": "boom"}"#;
        let detail = extract_detail(StatusCode::INTERNAL_SERVER_ERROR, body);
        assert_eq!(detail, "Oops! Something went wrong on our side.");
    }

    #[test]
    fn test_plain_text_body_is_truncated() {
        let body = "x".repeat(500);
        let detail = extract_detail(StatusCode::BAD_GATEWAY, &body);
        assert_eq!(detail.len(), MAX_DETAIL_CHARS);
    }

    #[test]
    fn test_empty_body_falls_back_to_reason() {
        assert_eq!(extract_detail(StatusCode::FORBIDDEN, ""), "Forbidden");
        assert_eq!(extract_detail(StatusCode::NOT_FOUND, "{}"), "Not Found");
    }

    #[test]
    fn test_rejected_display_and_status() {
        let err = ApiError::rejected(StatusCode::FORBIDDEN, r#"{"detail": "You do not have admin privileges."}"#);
        assert_eq!(err.to_string(), "You do not have admin privileges. (HTTP 403 Forbidden)");
        assert!(err.is_forbidden());
        assert!(err.reauth().is_none());
    }
}
