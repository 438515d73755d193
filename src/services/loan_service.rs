//! Domain service for the loan lifecycle.
//!
//! Every status change is authorized against the acting side, computed by
//! the state machine, and persisted together with its audit log and the
//! message/notification side effects.

use serde::Serialize;
use thiserror::Error;

use crate::models::loan::LoanStatus;

/// Errors specific to loan operations.
#[derive(Debug, Error)]
pub enum LoanError {
    #[error("Loan not found")]
    NotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Not a permitted party for this action")]
    Forbidden,

    #[error("Loan is not in a state that permits this action")]
    StateConflict,

    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for LoanError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for LoanError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Loan DTO for responses.
#[derive(Debug, Clone, Serialize)]
pub struct LoanInfo {
    pub id: i32,
    pub lender_id: i32,
    pub borrower_id: i32,
    pub amount: f64,
    pub deadline: String,
    pub status: LoanStatus,
    pub status_label: &'static str,
}

#[derive(Debug, Clone)]
pub struct NewLoanInput {
    pub lender_username: String,
    pub amount: String,
    pub deadline: String,
}

/// Domain service trait for the loan lifecycle.
#[async_trait::async_trait]
pub trait LoanService: Send + Sync {
    /// A borrower asks a lender for a loan. Creates the loan in its request
    /// state along with the audit log and the lender's decision prompt.
    async fn request_loan(
        &self,
        borrower_id: i32,
        input: NewLoanInput,
    ) -> Result<LoanInfo, LoanError>;

    /// Lender accepts a pending request; the debt becomes live.
    async fn accept_request(&self, loan_id: i32, actor_id: i32) -> Result<LoanInfo, LoanError>;

    /// Lender rejects a pending request; the loan is canceled.
    async fn reject_request(&self, loan_id: i32, actor_id: i32) -> Result<LoanInfo, LoanError>;

    /// Borrower claims to have repaid; the loan awaits confirmation.
    async fn pay_back(&self, loan_id: i32, actor_id: i32) -> Result<LoanInfo, LoanError>;

    /// Lender confirms the repayment; the loan is settled.
    async fn confirm_repayment(&self, loan_id: i32, actor_id: i32) -> Result<LoanInfo, LoanError>;

    /// Lender disputes the repayment claim; the debt stands again.
    async fn reject_repayment(&self, loan_id: i32, actor_id: i32) -> Result<LoanInfo, LoanError>;
}
