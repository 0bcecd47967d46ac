//! Account and admin reporting payloads.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{AccessToken, OrderId, Price, Role, UserId, wire};

/// Body of `POST /login` and `POST /register`.
///
/// Only ever built from user input right before it is sent.
#[derive(Serialize)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// The `user` object embedded in the login response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub role: Role,
}

/// Response of `POST /login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: AccessToken,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: AuthenticatedUser,
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

/// A row of `GET /admin/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub role: Role,
    #[serde(with = "wire::timestamp")]
    pub created_at: NaiveDateTime,
}

/// A row of `GET /admin/activities`: an order joined with its buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminActivity {
    pub username: String,
    pub order_id: OrderId,
    pub total_amount: Price,
    #[serde(with = "wire::timestamp")]
    pub created_at: NaiveDateTime,
}
