use sea_orm::entity::prelude::*;
use serde::Serialize;

/// An actionable prompt tied to one loan, addressed to the party whose
/// decision is awaited. Resolved exactly once.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "loan_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub loan_id: i32,

    pub receiver_id: i32,

    pub message: String,

    pub resolved: bool,

    /// True for a new-loan prompt, false for a repayment prompt
    pub new_loan: bool,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::loans::Entity",
        from = "Column::LoanId",
        to = "super::loans::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Loans,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ReceiverId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
}

impl Related<super::loans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
