//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::{NewUser, PasswordVerdict, Store, User};
use crate::models::messages;
use crate::security::fingerprint::{self, Fingerprint, FingerprintDrift};
use crate::security::password::generate_session_token;
use crate::security::validation;
use crate::services::auth_service::{
    AuthError, AuthService, LoginResult, RegisterInput, RegisterResult, UserInfo,
};

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
    pepper: String,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(store: Store, security: SecurityConfig) -> Self {
        let pepper = security.effective_pepper();
        Self {
            store,
            security,
            pepper,
        }
    }

    /// Advances the failure monitor and fires the alert exactly when the
    /// post-increment count hits the threshold. Further failures stay quiet
    /// until a successful login re-arms the monitor.
    async fn handle_failed_attempt(&self, user_id: i32) -> Result<(), AuthError> {
        let now = chrono::Utc::now().to_rfc3339();
        let count = self.store.record_login_failure(user_id, &now).await?;

        warn!(user_id, count, "Failed login attempt");

        if count == self.security.failed_login_threshold {
            self.store
                .add_notification(user_id, messages::failed_logins_text(count))
                .await?;
        }

        Ok(())
    }

    /// Renders the drift alert for this login, if its fingerprint differs
    /// from the previous one.
    async fn drift_alert_text(
        &self,
        user_id: i32,
        current: &Fingerprint,
    ) -> Result<Option<String>, AuthError> {
        let Some(previous_login) = self.store.latest_login(user_id).await? else {
            return Ok(None);
        };

        let previous = Fingerprint::from(&previous_login);
        let text = match fingerprint::compare(&previous, current) {
            Some(FingerprintDrift::NewDevice) => messages::new_device_text(&previous),
            Some(FingerprintDrift::NewBrowser) => messages::new_browser_text(&previous),
            None => return Ok(None),
        };

        Ok(Some(text))
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, input: RegisterInput) -> Result<RegisterResult, AuthError> {
        let reasons = validation::validate_registration(
            &input.username,
            &input.first_name,
            &input.last_name,
            &input.password,
            &input.repeat_password,
        );
        if !reasons.is_empty() {
            return Err(AuthError::Validation(reasons));
        }

        if self
            .store
            .get_user_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AuthError::UsernameTaken);
        }

        let (user, recovery_password) = self
            .store
            .create_user(
                NewUser {
                    username: input.username,
                    first_name: input.first_name,
                    last_name: input.last_name,
                    password: input.password,
                },
                &self.security,
                &self.pepper,
            )
            .await?;

        info!(user_id = user.id, username = %user.username, "User registered");

        Ok(RegisterResult {
            user: UserInfo::from(user),
            recovery_password,
        })
    }

    async fn login(
        &self,
        username: &str,
        password: &str,
        fingerprint: &Fingerprint,
    ) -> Result<LoginResult, AuthError> {
        let verdict = self
            .store
            .verify_user_password(username, password, &self.security, &self.pepper)
            .await?;

        let user = match verdict {
            PasswordVerdict::NoSuchUser => return Err(AuthError::InvalidCredentials),
            PasswordVerdict::Invalid { user_id } => {
                self.handle_failed_attempt(user_id).await?;
                return Err(AuthError::InvalidCredentials);
            }
            PasswordVerdict::Valid { user } => user,
        };

        // Drift is judged against the previous login, so render the alert
        // before recording the new one. The login row, the monitor reset,
        // and the alert then land in one transaction.
        let drift_alert = self.drift_alert_text(user.id, fingerprint).await?;

        let session_token = generate_session_token();
        self.store
            .record_login(user.id, fingerprint, session_token.clone(), drift_alert)
            .await?;

        info!(user_id = user.id, username = %user.username, "User logged in");

        Ok(LoginResult {
            user: UserInfo::from(user),
            session_token,
        })
    }

    async fn validate_session_token(&self, token: &str) -> Result<User, AuthError> {
        let login = self
            .store
            .find_login_by_token(token)
            .await?
            .ok_or(AuthError::SessionExpired)?;

        // Each new login supersedes the previous token.
        let latest = self
            .store
            .latest_login(login.user_id)
            .await?
            .ok_or(AuthError::SessionExpired)?;
        if latest.id != login.id {
            return Err(AuthError::SessionExpired);
        }

        self.store
            .get_user_by_id(login.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
        repeat_password: &str,
    ) -> Result<(), AuthError> {
        let reasons = validation::validate_password_change(new_password, repeat_password);
        if !reasons.is_empty() {
            return Err(AuthError::Validation(reasons));
        }

        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let verdict = self
            .store
            .verify_user_password(&user.username, current_password, &self.security, &self.pepper)
            .await?;
        if !matches!(verdict, PasswordVerdict::Valid { .. }) {
            return Err(AuthError::InvalidCredentials);
        }

        self.store
            .update_user_password(user_id, new_password, &self.security, &self.pepper)
            .await?;

        info!(user_id, "Password changed");
        Ok(())
    }

    async fn recover_password(
        &self,
        username: &str,
        recovery_password: &str,
        new_password: &str,
        repeat_password: &str,
    ) -> Result<String, AuthError> {
        let reasons = validation::validate_recovery(
            username,
            recovery_password,
            new_password,
            repeat_password,
        );
        if !reasons.is_empty() {
            return Err(AuthError::Validation(reasons));
        }

        // A wrong username and a wrong recovery password are deliberately
        // indistinguishable to the caller.
        let next_recovery = self
            .store
            .reset_user_with_recovery(
                username,
                recovery_password,
                new_password,
                &self.security,
                &self.pepper,
            )
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        info!(username, "Password recovered");
        Ok(next_recovery)
    }

    async fn get_user(&self, user_id: i32) -> Result<UserInfo, AuthError> {
        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(UserInfo::from(user))
    }
}
