//! Admin user accounts and session payloads.

use serde::{Deserialize, Serialize};

/// The only role the site knows.
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    /// bcrypt hash
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of the signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: String,
    pub user: SessionUser,
}
