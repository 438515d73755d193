use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    pub first_name: String,

    pub last_name: String,

    /// Hex-encoded Argon2id derived key (never the plaintext)
    pub password_hash: String,

    /// Hex-encoded per-user random salt
    pub salt: String,

    /// Secondary shared secret required for password reset
    pub recovery_password: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::login_logs::Entity")]
    LoginLogs,
    #[sea_orm(has_one = "super::login_monitors::Entity")]
    LoginMonitors,
    #[sea_orm(has_many = "super::notifications::Entity")]
    Notifications,
    #[sea_orm(has_many = "super::loan_messages::Entity")]
    LoanMessages,
}

impl Related<super::login_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoginLogs.def()
    }
}

impl Related<super::login_monitors::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoginMonitors.def()
    }
}

impl Related<super::notifications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl Related<super::loan_messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoanMessages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
