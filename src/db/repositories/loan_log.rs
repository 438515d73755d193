use anyhow::{Context, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::{loan_logs, prelude::*};

pub struct LoanLogRepository {
    conn: DatabaseConnection,
}

impl LoanLogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Audit lines for a set of loans, in insertion order.
    pub async fn for_loans(&self, loan_ids: &[i32]) -> Result<Vec<loan_logs::Model>> {
        if loan_ids.is_empty() {
            return Ok(Vec::new());
        }

        LoanLogs::find()
            .filter(loan_logs::Column::LoanId.is_in(loan_ids.iter().copied()))
            .order_by_asc(loan_logs::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query loan logs")
    }
}
