use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Append-only audit record of a loan's status at a point in time.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "loan_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub loan_id: i32,

    /// Status code the loan held after the logged transition
    pub status: i32,

    pub message: String,

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
}

impl Related<super::loans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
