use sea_orm::entity::prelude::*;

/// One record per successful login: the parsed user-agent fingerprint and
/// the opaque action token issued for that session.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "login_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub user_id: i32,

    #[sea_orm(unique)]
    pub session_token: String,

    pub browser_family: String,

    pub browser_version: String,

    pub os_family: String,

    pub os_version: String,

    pub device_family: String,

    pub device_brand: String,

    pub device_model: String,

    pub is_mobile: bool,

    pub is_tablet: bool,

    pub is_pc: bool,

    pub is_bot: bool,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
