pub mod loan;
pub mod messages;
