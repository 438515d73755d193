use std::collections::HashMap;

use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::users;
use crate::security::password::{
    derive_key, generate_recovery_password, generate_salt, secrets_match,
};

/// User data returned from the repository (without credential material)
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: String,
}

impl User {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
            created_at: model.created_at,
        }
    }
}

/// Plain registration input; hashing happens inside the repository.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Outcome of a credential check, kept distinct so the caller can drive the
/// failed-login monitor only for accounts that actually exist.
#[derive(Debug, Clone)]
pub enum PasswordVerdict {
    NoSuchUser,
    Invalid { user_id: i32 },
    Valid { user: User },
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Create a user with a fresh salt and recovery password. Returns the
    /// user and the generated recovery password (shown to the user once).
    pub async fn create(
        &self,
        input: NewUser,
        security: &SecurityConfig,
        pepper: &str,
    ) -> Result<(User, String)> {
        let salt = generate_salt();
        let recovery_password = generate_recovery_password();

        let password_hash = Self::derive_blocking(
            input.password.clone(),
            salt.clone(),
            pepper.to_string(),
            security.clone(),
        )
        .await?;

        let now = chrono::Utc::now().to_rfc3339();
        let active = users::ActiveModel {
            username: Set(input.username),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            password_hash: Set(password_hash),
            salt: Set(salt),
            recovery_password: Set(recovery_password.clone()),
            created_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        Ok((User::from(model), recovery_password))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    /// Batch lookup, keyed by id. Used by the aggregation queries to resolve
    /// counterparty display data without per-row queries.
    pub async fn get_by_ids(&self, ids: &[i32]) -> Result<HashMap<i32, User>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = users::Entity::find()
            .filter(users::Column::Id.is_in(ids.iter().copied()))
            .all(&self.conn)
            .await
            .context("Failed to batch-query users")?;

        Ok(rows.into_iter().map(|m| (m.id, User::from(m))).collect())
    }

    /// Verify a password by full recomputation against the stored key.
    /// Runs the KDF under `spawn_blocking`; Argon2 is CPU-intensive and
    /// would stall the async runtime if run inline.
    pub async fn verify_password(
        &self,
        username: &str,
        password: &str,
        security: &SecurityConfig,
        pepper: &str,
    ) -> Result<PasswordVerdict> {
        let Some(model) = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?
        else {
            return Ok(PasswordVerdict::NoSuchUser);
        };

        let candidate = Self::derive_blocking(
            password.to_string(),
            model.salt.clone(),
            pepper.to_string(),
            security.clone(),
        )
        .await?;

        if secrets_match(&candidate, &model.password_hash) {
            Ok(PasswordVerdict::Valid {
                user: User::from(model),
            })
        } else {
            Ok(PasswordVerdict::Invalid { user_id: model.id })
        }
    }

    /// Re-key a user's password with a fresh salt.
    pub async fn update_password(
        &self,
        user_id: i32,
        new_password: &str,
        security: &SecurityConfig,
        pepper: &str,
    ) -> Result<()> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query user for password update")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {user_id}"))?;

        let salt = generate_salt();
        let new_hash = Self::derive_blocking(
            new_password.to_string(),
            salt.clone(),
            pepper.to_string(),
            security.clone(),
        )
        .await?;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        active.salt = Set(salt);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Reset a forgotten password using the recovery secret. Regenerates the
    /// hash, the salt, and the recovery password itself. Returns the new
    /// recovery password, or `None` if the account/recovery pair is wrong.
    pub async fn reset_with_recovery(
        &self,
        username: &str,
        recovery_password: &str,
        new_password: &str,
        security: &SecurityConfig,
        pepper: &str,
    ) -> Result<Option<String>> {
        let Some(user) = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for password recovery")?
        else {
            return Ok(None);
        };

        if !secrets_match(recovery_password, &user.recovery_password) {
            return Ok(None);
        }

        let salt = generate_salt();
        let next_recovery = generate_recovery_password();
        let new_hash = Self::derive_blocking(
            new_password.to_string(),
            salt.clone(),
            pepper.to_string(),
            security.clone(),
        )
        .await?;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        active.salt = Set(salt);
        active.recovery_password = Set(next_recovery.clone());
        active.update(&self.conn).await?;

        Ok(Some(next_recovery))
    }

    async fn derive_blocking(
        password: String,
        salt: String,
        pepper: String,
        security: SecurityConfig,
    ) -> Result<String> {
        task::spawn_blocking(move || derive_key(&password, &salt, &pepper, &security))
            .await
            .context("Key derivation task panicked")?
    }
}
