pub mod loan;
pub mod loan_log;
pub mod login;
pub mod message;
pub mod notification;
pub mod user;
