use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::Expr,
};

use crate::entities::{notifications, prelude::*};

pub struct NotificationRepository {
    conn: DatabaseConnection,
}

impl NotificationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, receiver_id: i32, message: String) -> Result<notifications::Model> {
        notifications::ActiveModel {
            receiver_id: Set(receiver_id),
            message: Set(message),
            seen: Set(false),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert notification")
    }

    /// Unseen notifications for a user, oldest first.
    pub async fn unseen_for_user(&self, user_id: i32) -> Result<Vec<notifications::Model>> {
        Notifications::find()
            .filter(notifications::Column::ReceiverId.eq(user_id))
            .filter(notifications::Column::Seen.eq(false))
            .order_by_asc(notifications::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query notifications")
    }

    /// Mark a notification seen. Guarded by receiver so a user can only
    /// acknowledge their own notifications; returns whether a row changed.
    pub async fn mark_seen(&self, id: i64, receiver_id: i32) -> Result<bool> {
        let updated = Notifications::update_many()
            .col_expr(notifications::Column::Seen, Expr::value(true))
            .filter(notifications::Column::Id.eq(id))
            .filter(notifications::Column::ReceiverId.eq(receiver_id))
            .filter(notifications::Column::Seen.eq(false))
            .exec(&self.conn)
            .await
            .context("Failed to mark notification seen")?;

        Ok(updated.rows_affected == 1)
    }
}
