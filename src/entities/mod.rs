pub mod prelude;

pub mod loan_logs;
pub mod loan_messages;
pub mod loans;
pub mod login_logs;
pub mod login_monitors;
pub mod notifications;
pub mod users;
