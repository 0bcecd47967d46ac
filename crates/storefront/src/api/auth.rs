//! Login, registration and logout.

use lm_store_core::{Credentials, LoginResponse, MessageResponse, Password};
use reqwest::StatusCode;
use tracing::instrument;

use super::decode;
use crate::error::ApiError;
use crate::gateway::{Gateway, ReauthRequired, RequestOptions};
use crate::session::SessionCredential;

/// Notice shown on the login screen after an explicit logout.
pub const LOGGED_OUT_MESSAGE: &str = "You've been logged out";

/// Notice shown on the login screen after a successful registration.
pub const ACCOUNT_CREATED_MESSAGE: &str = "Account created!";

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Account entry points. Login and registration bypass the session-expiry
/// policy: a 401 there means wrong credentials, not an expired session.
#[derive(Debug, Clone)]
pub struct AuthService {
    gateway: Gateway,
    login_path: String,
}

impl AuthService {
    pub(crate) fn new(gateway: Gateway, login_path: String) -> Self {
        Self {
            gateway,
            login_path,
        }
    }

    /// Log in and store the returned credential.
    ///
    /// # Errors
    ///
    /// - `ApiError::Validation` if either field is blank
    /// - `ApiError::Rejected` with "Invalid username or password" on bad credentials
    /// - `ApiError::Network` if the server is unreachable
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionCredential, ApiError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ApiError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        let options = RequestOptions::post().json(&Credentials { username, password })?;
        let response = self.gateway.send_public("/login", options).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::info!("Login rejected");
            return Err(ApiError::Rejected {
                status: StatusCode::UNAUTHORIZED,
                detail: INVALID_CREDENTIALS.to_string(),
            });
        }

        let login: LoginResponse = decode(response).await?;
        if login.access_token.is_empty() {
            return Err(ApiError::Validation(
                "Server returned an empty access token".to_string(),
            ));
        }

        let credential = SessionCredential::from(login);
        self.gateway.session().begin(credential.clone())?;
        Ok(credential)
    }

    /// Create an account. The password policy is checked locally first so
    /// the user sees every failing rule at once.
    ///
    /// Returns where to send the user next (the login screen with a notice).
    ///
    /// # Errors
    ///
    /// - `ApiError::Validation` if the username is blank or the password is weak
    /// - `ApiError::Rejected` with the server's detail (e.g. user already exists)
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn register(&self, username: &str, password: &str) -> Result<ReauthRequired, ApiError> {
        if username.trim().is_empty() {
            return Err(ApiError::Validation("Username is required".to_string()));
        }
        let password = Password::parse(password).map_err(|e| ApiError::Validation(e.to_string()))?;

        let options = RequestOptions::post().json(&Credentials {
            username,
            password: password.expose(),
        })?;
        let response = self.gateway.send_public("/register", options).await?;
        let created: MessageResponse = decode(response).await?;
        tracing::info!(message = %created.message, "Account registered");

        Ok(ReauthRequired::new(
            self.login_path.clone(),
            ACCOUNT_CREATED_MESSAGE,
        ))
    }

    /// Forget the stored credential and announce the logout.
    ///
    /// Returns where to send the user next.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Session` if the credential cannot be removed.
    pub fn logout(&self) -> Result<ReauthRequired, ApiError> {
        self.gateway.session().end()?;
        Ok(ReauthRequired::new(
            self.login_path.clone(),
            LOGGED_OUT_MESSAGE,
        ))
    }

    /// The stored credential, if logged in.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Session` if client storage cannot be read.
    pub fn current(&self) -> Result<Option<SessionCredential>, ApiError> {
        Ok(self.gateway.session().credential()?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::session::{AuthEvent, MemorySessionStore, Session};

    fn service() -> AuthService {
        // Port 9 (discard) is never contacted: every test fails validation first
        let config = ClientConfig::for_base_url("http://127.0.0.1:9/api").unwrap();
        let session = Session::new(MemorySessionStore::with_credential(
            SessionCredential::from_token("abc123"),
        ));
        AuthService::new(Gateway::new(&config, session).unwrap(), config.login_path)
    }

    #[tokio::test]
    async fn test_login_requires_both_fields() {
        let err = service().login("  ", "secret").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_register_reports_every_password_rule() {
        let err = service().register("ada", "abc").await.unwrap_err();
        let ApiError::Validation(message) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(message.contains("at least 8 characters"));
        assert!(message.contains("uppercase"));
        assert!(message.contains("number"));
    }

    #[test]
    fn test_logout_clears_and_points_to_login() {
        let auth = service();
        let mut events = auth.gateway.session().subscribe();

        let next = auth.logout().unwrap();

        assert!(auth.current().unwrap().is_none());
        assert_eq!(next.location(), "/login?message=You%27ve+been+logged+out");
        assert_eq!(events.try_recv().unwrap(), AuthEvent::LoggedOut);
    }
}
