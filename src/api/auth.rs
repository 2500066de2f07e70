//! Login and session endpoints.

use axum::extract::State;

use super::{success, ApiResult, JsonBody};
use crate::auth::{check_credentials, AuthSession};
use crate::errors::AppError;
use crate::models::{LoginRequest, LoginResponse, SessionUser};
use crate::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let found = state.repo.find_user_by_email(&request.email).await?;
    let user = check_credentials(found, &request.password, state.config.bcrypt_cost)
        .ok_or_else(|| {
            tracing::info!("Failed login attempt");
            AppError::Unauthorized(INVALID_CREDENTIALS.to_string())
        })?;

    let (token, expires_at) = state.sessions.issue(&user)?;
    tracing::info!("User {} logged in", user.id);

    success(LoginResponse {
        token,
        expires_at,
        user: SessionUser {
            id: user.id,
            email: user.email,
            role: user.role,
        },
    })
}

/// GET /api/auth/session - The user behind the presented token.
pub async fn session(AuthSession(claims): AuthSession) -> ApiResult<SessionUser> {
    success(claims.user())
}
