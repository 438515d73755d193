pub use super::loan_logs::Entity as LoanLogs;
pub use super::loan_messages::Entity as LoanMessages;
pub use super::loans::Entity as Loans;
pub use super::login_logs::Entity as LoginLogs;
pub use super::login_monitors::Entity as LoginMonitors;
pub use super::notifications::Entity as Notifications;
pub use super::users::Entity as Users;
