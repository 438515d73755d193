use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub lender_id: i32,

    pub borrower_id: i32,

    pub amount: f64,

    /// Repayment deadline, `YYYY-MM-DD`
    pub deadline: String,

    /// Integer status code, see `models::loan::LoanStatus`
    pub status: i32,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::LenderId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Lender,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::BorrowerId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Borrower,
    #[sea_orm(has_many = "super::loan_logs::Entity")]
    LoanLogs,
    #[sea_orm(has_many = "super::loan_messages::Entity")]
    LoanMessages,
}

impl Related<super::loan_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoanLogs.def()
    }
}

impl Related<super::loan_messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoanMessages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
