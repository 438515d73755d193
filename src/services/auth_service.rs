//! Domain service for accounts and session security.
//!
//! Handles registration, login with failed-attempt monitoring and device
//! tracking, password changes, and recovery-based resets.

use serde::Serialize;
use thiserror::Error;

use crate::db::User;
use crate::security::fingerprint::Fingerprint;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("Session expired")]
    SessionExpired,

    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// User info DTO for responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: user.created_at,
        }
    }
}

/// Registration outcome. The recovery password is generated server-side and
/// surfaced exactly once, here.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterResult {
    pub user: UserInfo,
    pub recovery_password: String,
}

/// Login outcome: the user and the action token bound to this login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub user: UserInfo,
    pub session_token: String,
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub repeat_password: String,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] with every failed rule, or
    /// [`AuthError::UsernameTaken`].
    async fn register(&self, input: RegisterInput) -> Result<RegisterResult, AuthError>;

    /// Verifies credentials and issues a fresh action token.
    ///
    /// A failed attempt against an existing account advances its monitor; a
    /// successful one resets it and records the login fingerprint.
    async fn login(
        &self,
        username: &str,
        password: &str,
        fingerprint: &Fingerprint,
    ) -> Result<LoginResult, AuthError>;

    /// Resolves an action token to its user. Only the token from the user's
    /// most recent login is accepted; older tokens are expired.
    async fn validate_session_token(&self, token: &str) -> Result<User, AuthError>;

    /// Changes a password after re-verifying the current one.
    async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
        repeat_password: &str,
    ) -> Result<(), AuthError>;

    /// Resets a forgotten password using the recovery secret. Returns the
    /// replacement recovery password.
    async fn recover_password(
        &self,
        username: &str,
        recovery_password: &str,
        new_password: &str,
        repeat_password: &str,
    ) -> Result<String, AuthError>;

    async fn get_user(&self, user_id: i32) -> Result<UserInfo, AuthError>;
}
