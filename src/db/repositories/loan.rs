use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, sea_query::Expr,
};
use tracing::info;

use crate::entities::{loan_logs, loan_messages, loans, notifications, prelude::*};
use crate::models::loan::LoanStatus;

/// A prompt to create as part of a transition, addressed to the party whose
/// decision is awaited next.
#[derive(Debug, Clone)]
pub struct NewPrompt {
    pub receiver_id: i32,
    pub message: String,
    pub new_loan: bool,
}

/// Everything a status transition persists atomically: the guarded status
/// change, its audit-log line, and the message/notification side effects.
#[derive(Debug, Clone)]
pub struct TransitionRecord {
    pub loan_id: i32,
    pub expected_status: LoanStatus,
    pub new_status: LoanStatus,
    pub log_message: String,
    pub prompt: Option<NewPrompt>,
    /// `(receiver_id, text)` pairs
    pub notifications: Vec<(i32, String)>,
}

pub struct LoanRepository {
    conn: DatabaseConnection,
}

impl LoanRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<loans::Model>> {
        Loans::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query loan")
    }

    /// Create a loan request: the loan row, its REQUEST audit log, and the
    /// accept/reject prompt to the lender, in one transaction.
    pub async fn create_request(
        &self,
        lender_id: i32,
        borrower_id: i32,
        amount: f64,
        deadline: &str,
        log_message: String,
        prompt_message: String,
    ) -> Result<loans::Model> {
        let now = chrono::Utc::now().to_rfc3339();
        let txn = self.conn.begin().await?;

        let loan = loans::ActiveModel {
            lender_id: Set(lender_id),
            borrower_id: Set(borrower_id),
            amount: Set(amount),
            deadline: Set(deadline.to_string()),
            status: Set(LoanStatus::RequestInProgress.code()),
            created_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert loan")?;

        loan_logs::ActiveModel {
            loan_id: Set(loan.id),
            status: Set(loan.status),
            message: Set(log_message),
            created_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert loan log")?;

        loan_messages::ActiveModel {
            loan_id: Set(loan.id),
            receiver_id: Set(lender_id),
            message: Set(prompt_message),
            resolved: Set(false),
            new_loan: Set(true),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert loan message")?;

        txn.commit().await?;

        info!(loan_id = loan.id, lender_id, borrower_id, "Loan requested");
        Ok(loan)
    }

    /// Apply a guarded status transition. The UPDATE is filtered on the
    /// expected pre-transition status; when a concurrent request already
    /// moved the loan, zero rows match, everything rolls back, and the call
    /// returns `Ok(false)`. This is the per-loan serialization point.
    pub async fn apply_transition(&self, record: TransitionRecord) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let txn = self.conn.begin().await?;

        let updated = Loans::update_many()
            .col_expr(loans::Column::Status, Expr::value(record.new_status.code()))
            .filter(loans::Column::Id.eq(record.loan_id))
            .filter(loans::Column::Status.eq(record.expected_status.code()))
            .exec(&txn)
            .await
            .context("Failed to update loan status")?;

        if updated.rows_affected != 1 {
            txn.rollback().await?;
            return Ok(false);
        }

        // Any open prompt on this loan is settled by this transition.
        LoanMessages::update_many()
            .col_expr(loan_messages::Column::Resolved, Expr::value(true))
            .filter(loan_messages::Column::LoanId.eq(record.loan_id))
            .filter(loan_messages::Column::Resolved.eq(false))
            .exec(&txn)
            .await
            .context("Failed to resolve loan messages")?;

        loan_logs::ActiveModel {
            loan_id: Set(record.loan_id),
            status: Set(record.new_status.code()),
            message: Set(record.log_message),
            created_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert loan log")?;

        if let Some(prompt) = record.prompt {
            loan_messages::ActiveModel {
                loan_id: Set(record.loan_id),
                receiver_id: Set(prompt.receiver_id),
                message: Set(prompt.message),
                resolved: Set(false),
                new_loan: Set(prompt.new_loan),
                created_at: Set(now.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .context("Failed to insert loan message")?;
        }

        for (receiver_id, text) in record.notifications {
            notifications::ActiveModel {
                receiver_id: Set(receiver_id),
                message: Set(text),
                seen: Set(false),
                created_at: Set(now.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .context("Failed to insert notification")?;
        }

        txn.commit().await?;

        info!(
            loan_id = record.loan_id,
            from = record.expected_status.code(),
            to = record.new_status.code(),
            "Loan transitioned"
        );
        Ok(true)
    }

    /// Outstanding loans where the user is the lender.
    pub async fn outstanding_for_lender(&self, user_id: i32) -> Result<Vec<loans::Model>> {
        self.by_side_and_statuses(loans::Column::LenderId, user_id, &OUTSTANDING)
            .await
    }

    /// Outstanding loans where the user is the borrower.
    pub async fn outstanding_for_borrower(&self, user_id: i32) -> Result<Vec<loans::Model>> {
        self.by_side_and_statuses(loans::Column::BorrowerId, user_id, &OUTSTANDING)
            .await
    }

    /// Lender-side history: everything past the request stage except
    /// canceled requests.
    pub async fn history_for_lender(&self, user_id: i32) -> Result<Vec<loans::Model>> {
        self.by_side_and_statuses(loans::Column::LenderId, user_id, &HISTORY)
            .await
    }

    pub async fn history_for_borrower(&self, user_id: i32) -> Result<Vec<loans::Model>> {
        self.by_side_and_statuses(loans::Column::BorrowerId, user_id, &HISTORY)
            .await
    }

    /// Ids of every loan the user participates in, on either side.
    pub async fn ids_for_participant(&self, user_id: i32) -> Result<Vec<i32>> {
        let rows = Loans::find()
            .filter(
                loans::Column::LenderId
                    .eq(user_id)
                    .or(loans::Column::BorrowerId.eq(user_id)),
            )
            .all(&self.conn)
            .await
            .context("Failed to query participant loans")?;

        Ok(rows.into_iter().map(|l| l.id).collect())
    }

    async fn by_side_and_statuses(
        &self,
        side: loans::Column,
        user_id: i32,
        statuses: &[LoanStatus],
    ) -> Result<Vec<loans::Model>> {
        let codes: Vec<i32> = statuses.iter().map(|s| s.code()).collect();
        Loans::find()
            .filter(side.eq(user_id))
            .filter(loans::Column::Status.is_in(codes))
            .order_by_asc(loans::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query loans")
    }
}

const OUTSTANDING: [LoanStatus; 2] = [LoanStatus::NotPayed, LoanStatus::Pending];
const HISTORY: [LoanStatus; 3] = [LoanStatus::NotPayed, LoanStatus::Pending, LoanStatus::Payed];
