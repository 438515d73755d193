use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
    sea_query::Expr,
};

use crate::entities::{login_logs, login_monitors, notifications, prelude::*};
use crate::security::fingerprint::Fingerprint;

pub struct LoginRepository {
    conn: DatabaseConnection,
}

impl LoginRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// The most recent successful login for a user, if any.
    pub async fn latest_login(&self, user_id: i32) -> Result<Option<login_logs::Model>> {
        LoginLogs::find()
            .filter(login_logs::Column::UserId.eq(user_id))
            .order_by_desc(login_logs::Column::Id)
            .one(&self.conn)
            .await
            .context("Failed to query latest login")
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<login_logs::Model>> {
        LoginLogs::find()
            .filter(login_logs::Column::SessionToken.eq(token))
            .one(&self.conn)
            .await
            .context("Failed to query login by token")
    }

    /// Persist a successful login: the fingerprint and issued token, the
    /// monitor reset, and the optional drift alert, in one transaction so a
    /// failure leaves no alert without its login row and no login whose
    /// counter never reset.
    pub async fn record_login(
        &self,
        user_id: i32,
        fingerprint: &Fingerprint,
        session_token: String,
        drift_alert: Option<String>,
    ) -> Result<login_logs::Model> {
        let now = chrono::Utc::now().to_rfc3339();
        let txn = self.conn.begin().await?;

        let login = login_logs::ActiveModel {
            user_id: Set(user_id),
            session_token: Set(session_token),
            browser_family: Set(fingerprint.browser_family.clone()),
            browser_version: Set(fingerprint.browser_version.clone()),
            os_family: Set(fingerprint.os_family.clone()),
            os_version: Set(fingerprint.os_version.clone()),
            device_family: Set(fingerprint.device_family.clone()),
            device_brand: Set(fingerprint.device_brand.clone()),
            device_model: Set(fingerprint.device_model.clone()),
            is_mobile: Set(fingerprint.is_mobile),
            is_tablet: Set(fingerprint.is_tablet),
            is_pc: Set(fingerprint.is_pc),
            is_bot: Set(fingerprint.is_bot),
            created_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert login log")?;

        LoginMonitors::update_many()
            .col_expr(login_monitors::Column::LoginCount, Expr::value(0))
            .col_expr(login_monitors::Column::LastAttempt, Expr::value(&now))
            .filter(login_monitors::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .context("Failed to reset login monitor")?;

        if let Some(text) = drift_alert {
            notifications::ActiveModel {
                receiver_id: Set(user_id),
                message: Set(text),
                seen: Set(false),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .context("Failed to insert drift alert")?;
        }

        txn.commit().await?;
        Ok(login)
    }

    /// Bump the consecutive-failure counter and return the post-increment
    /// count. The increment is a column expression so that concurrent
    /// failures never read-modify-write a stale value.
    pub async fn record_failure(&self, user_id: i32, attempted_at: &str) -> Result<i32> {
        let txn = self.conn.begin().await?;

        let updated = LoginMonitors::update_many()
            .col_expr(
                login_monitors::Column::LoginCount,
                Expr::col(login_monitors::Column::LoginCount).add(1),
            )
            .col_expr(
                login_monitors::Column::LastAttempt,
                Expr::value(attempted_at),
            )
            .filter(login_monitors::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .context("Failed to increment login monitor")?;

        if updated.rows_affected == 0 {
            login_monitors::ActiveModel {
                user_id: Set(user_id),
                login_count: Set(1),
                last_attempt: Set(attempted_at.to_string()),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .context("Failed to insert login monitor")?;

            txn.commit().await?;
            return Ok(1);
        }

        let count = LoginMonitors::find()
            .filter(login_monitors::Column::UserId.eq(user_id))
            .one(&txn)
            .await
            .context("Failed to read login monitor")?
            .map_or(0, |m| m.login_count);

        txn.commit().await?;
        Ok(count)
    }
}
