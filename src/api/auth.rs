use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::db::User;
use crate::security::fingerprint::Fingerprint;
use crate::security::validation;
use crate::services::auth_service::{
    LoginResult, RegisterInput, RegisterResult, UserInfo,
};

const SESSION_TOKEN_KEY: &str = "session_token";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub repeat_password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Parsed user-agent data; missing fields default to N/A.
    #[serde(default)]
    pub fingerprint: Fingerprint,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub repeat_password: String,
}

#[derive(Deserialize)]
pub struct RecoverRequest {
    pub username: String,
    pub recovery_password: String,
    pub new_password: String,
    pub repeat_password: String,
}

#[derive(Serialize)]
pub struct RecoverResponse {
    pub recovery_password: String,
}

#[derive(Deserialize)]
pub struct PasswordStrengthRequest {
    pub password: String,
}

#[derive(Serialize)]
pub struct PasswordStrengthResponse {
    pub entropy_bits: f64,
    pub acceptable: bool,
    pub failures: Vec<String>,
}

/// The authenticated user, inserted by the middleware as a request
/// extension.
#[derive(Debug, Clone)]
pub struct AuthedUser(pub User);

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware that accepts the action token from:
/// 1. The session cookie (from login)
/// 2. The `X-Session-Token` header
///
/// The token is only valid while it belongs to the user's most recent
/// login; a newer login from anywhere expires it.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let Some(token) = extract_token(&session, &headers).await else {
        let response = (StatusCode::UNAUTHORIZED, "Unauthorized");
        return Ok(response.into_response());
    };

    match state.auth_service().validate_session_token(&token).await {
        Ok(user) => {
            tracing::Span::current().record("user_id", user.id);
            request.extensions_mut().insert(AuthedUser(user));
            Ok(next.run(request).await)
        }
        Err(_) => {
            let response = (StatusCode::UNAUTHORIZED, "Session expired");
            Ok(response.into_response())
        }
    }
}

async fn extract_token(session: &Session, headers: &HeaderMap) -> Option<String> {
    if let Ok(Some(token)) = session.get::<String>(SESSION_TOKEN_KEY).await {
        return Some(token);
    }

    if let Some(value) = headers.get("X-Session-Token")
        && let Ok(token) = value.to_str()
    {
        return Some(token.to_string());
    }

    None
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
/// Create an account; the response carries the one-time recovery password.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<RegisterResult>>, ApiError> {
    let result = state
        .auth_service()
        .register(RegisterInput {
            username: payload.username,
            first_name: payload.first_name,
            last_name: payload.last_name,
            password: payload.password,
            repeat_password: payload.repeat_password,
        })
        .await?;

    Ok(Json(ApiResponse::success(result)))
}

/// POST /auth/login
/// Authenticate with username and password, returns the action token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResult>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let result = state
        .auth_service()
        .login(&payload.username, &payload.password, &payload.fingerprint)
        .await?;

    if let Err(e) = session
        .insert(SESSION_TOKEN_KEY, &result.session_token)
        .await
    {
        return Err(ApiError::internal(format!("Failed to create session: {e}")));
    }

    Ok(Json(ApiResponse::success(result)))
}

/// POST /auth/logout
/// Invalidate the current session
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.flush().await;
    (StatusCode::OK, "Logged out")
}

/// GET /auth/me
pub async fn get_current_user(
    axum::Extension(AuthedUser(user)): axum::Extension<AuthedUser>,
) -> Json<ApiResponse<UserInfo>> {
    Json(ApiResponse::success(UserInfo::from(user)))
}

/// PUT /auth/password
/// Change password (requires current password verification)
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    axum::Extension(AuthedUser(user)): axum::Extension<AuthedUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .auth_service()
        .change_password(
            user.id,
            &payload.current_password,
            &payload.new_password,
            &payload.repeat_password,
        )
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password updated successfully",
    ))))
}

/// POST /auth/recover
/// Reset a forgotten password with the recovery secret; returns the
/// replacement recovery password.
pub async fn recover(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RecoverRequest>,
) -> Result<Json<ApiResponse<RecoverResponse>>, ApiError> {
    let recovery_password = state
        .auth_service()
        .recover_password(
            &payload.username,
            &payload.recovery_password,
            &payload.new_password,
            &payload.repeat_password,
        )
        .await?;

    Ok(Json(ApiResponse::success(RecoverResponse {
        recovery_password,
    })))
}

/// POST /password/strength
/// Client-side feedback for a candidate password. Never stores anything.
pub async fn password_strength(
    Json(payload): Json<PasswordStrengthRequest>,
) -> Json<ApiResponse<PasswordStrengthResponse>> {
    let failures = validation::password_failures(&payload.password);
    Json(ApiResponse::success(PasswordStrengthResponse {
        entropy_bits: validation::entropy_bits(&payload.password),
        acceptable: failures.is_empty(),
        failures,
    }))
}
