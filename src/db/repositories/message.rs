use anyhow::{Context, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::{loan_messages, prelude::*};

pub struct MessageRepository {
    conn: DatabaseConnection,
}

impl MessageRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Open prompts awaiting this user's decision, oldest first.
    pub async fn unresolved_for_user(&self, user_id: i32) -> Result<Vec<loan_messages::Model>> {
        LoanMessages::find()
            .filter(loan_messages::Column::ReceiverId.eq(user_id))
            .filter(loan_messages::Column::Resolved.eq(false))
            .order_by_asc(loan_messages::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query unresolved messages")
    }
}
