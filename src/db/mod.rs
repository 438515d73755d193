use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use tracing::info;

use crate::config::SecurityConfig;
use crate::entities::{loan_logs, loan_messages, loans, login_logs, notifications};
use crate::security::fingerprint::Fingerprint;

pub mod migrator;
pub mod repositories;

pub use repositories::loan::{NewPrompt, TransitionRecord};
pub use repositories::user::{NewUser, PasswordVerdict, User};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn loan_repo(&self) -> repositories::loan::LoanRepository {
        repositories::loan::LoanRepository::new(self.conn.clone())
    }

    fn loan_log_repo(&self) -> repositories::loan_log::LoanLogRepository {
        repositories::loan_log::LoanLogRepository::new(self.conn.clone())
    }

    fn message_repo(&self) -> repositories::message::MessageRepository {
        repositories::message::MessageRepository::new(self.conn.clone())
    }

    fn notification_repo(&self) -> repositories::notification::NotificationRepository {
        repositories::notification::NotificationRepository::new(self.conn.clone())
    }

    fn login_repo(&self) -> repositories::login::LoginRepository {
        repositories::login::LoginRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn create_user(
        &self,
        input: NewUser,
        security: &SecurityConfig,
        pepper: &str,
    ) -> Result<(User, String)> {
        self.user_repo().create(input, security, pepper).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_users_by_ids(&self, ids: &[i32]) -> Result<HashMap<i32, User>> {
        self.user_repo().get_by_ids(ids).await
    }

    pub async fn verify_user_password(
        &self,
        username: &str,
        password: &str,
        security: &SecurityConfig,
        pepper: &str,
    ) -> Result<PasswordVerdict> {
        self.user_repo()
            .verify_password(username, password, security, pepper)
            .await
    }

    pub async fn update_user_password(
        &self,
        user_id: i32,
        new_password: &str,
        security: &SecurityConfig,
        pepper: &str,
    ) -> Result<()> {
        self.user_repo()
            .update_password(user_id, new_password, security, pepper)
            .await
    }

    pub async fn reset_user_with_recovery(
        &self,
        username: &str,
        recovery_password: &str,
        new_password: &str,
        security: &SecurityConfig,
        pepper: &str,
    ) -> Result<Option<String>> {
        self.user_repo()
            .reset_with_recovery(username, recovery_password, new_password, security, pepper)
            .await
    }

    // ========== Loans ==========

    pub async fn get_loan(&self, id: i32) -> Result<Option<loans::Model>> {
        self.loan_repo().get(id).await
    }

    pub async fn create_loan_request(
        &self,
        lender_id: i32,
        borrower_id: i32,
        amount: f64,
        deadline: &str,
        log_message: String,
        prompt_message: String,
    ) -> Result<loans::Model> {
        self.loan_repo()
            .create_request(
                lender_id,
                borrower_id,
                amount,
                deadline,
                log_message,
                prompt_message,
            )
            .await
    }

    pub async fn apply_loan_transition(&self, record: TransitionRecord) -> Result<bool> {
        self.loan_repo().apply_transition(record).await
    }

    pub async fn outstanding_loans_for_lender(&self, user_id: i32) -> Result<Vec<loans::Model>> {
        self.loan_repo().outstanding_for_lender(user_id).await
    }

    pub async fn outstanding_loans_for_borrower(&self, user_id: i32) -> Result<Vec<loans::Model>> {
        self.loan_repo().outstanding_for_borrower(user_id).await
    }

    pub async fn loan_history_for_lender(&self, user_id: i32) -> Result<Vec<loans::Model>> {
        self.loan_repo().history_for_lender(user_id).await
    }

    pub async fn loan_history_for_borrower(&self, user_id: i32) -> Result<Vec<loans::Model>> {
        self.loan_repo().history_for_borrower(user_id).await
    }

    pub async fn loan_ids_for_participant(&self, user_id: i32) -> Result<Vec<i32>> {
        self.loan_repo().ids_for_participant(user_id).await
    }

    pub async fn loan_logs_for_loans(&self, loan_ids: &[i32]) -> Result<Vec<loan_logs::Model>> {
        self.loan_log_repo().for_loans(loan_ids).await
    }

    // ========== Messages & notifications ==========

    pub async fn unresolved_messages_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<loan_messages::Model>> {
        self.message_repo().unresolved_for_user(user_id).await
    }

    pub async fn add_notification(
        &self,
        receiver_id: i32,
        message: String,
    ) -> Result<notifications::Model> {
        self.notification_repo().add(receiver_id, message).await
    }

    pub async fn unseen_notifications_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<notifications::Model>> {
        self.notification_repo().unseen_for_user(user_id).await
    }

    pub async fn mark_notification_seen(&self, id: i64, receiver_id: i32) -> Result<bool> {
        self.notification_repo().mark_seen(id, receiver_id).await
    }

    // ========== Login tracking ==========

    pub async fn latest_login(&self, user_id: i32) -> Result<Option<login_logs::Model>> {
        self.login_repo().latest_login(user_id).await
    }

    pub async fn find_login_by_token(&self, token: &str) -> Result<Option<login_logs::Model>> {
        self.login_repo().find_by_token(token).await
    }

    pub async fn record_login(
        &self,
        user_id: i32,
        fingerprint: &Fingerprint,
        session_token: String,
        drift_alert: Option<String>,
    ) -> Result<login_logs::Model> {
        self.login_repo()
            .record_login(user_id, fingerprint, session_token, drift_alert)
            .await
    }

    pub async fn record_login_failure(&self, user_id: i32, attempted_at: &str) -> Result<i32> {
        self.login_repo().record_failure(user_id, attempted_at).await
    }
}
