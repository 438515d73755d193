//! Rendered message, notification, and audit-log texts.
//!
//! Every template is a plain function taking everything it interpolates as
//! parameters. Entity construction never reaches back into the database for
//! display names.

use crate::security::fingerprint::Fingerprint;

/// Display data for the two sides of a loan, resolved by the caller.
#[derive(Debug, Clone)]
pub struct LoanParties {
    pub borrower_name: String,
    pub borrower_username: String,
    pub lender_name: String,
    pub lender_username: String,
}

/// The six audit-log event kinds of the lifecycle table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanLogKind {
    Request,
    RequestAccepted,
    RequestRejected,
    Repay,
    RepayAccepted,
    RepayRejected,
}

fn fmt_amount(amount: f64) -> String {
    format!("{amount}")
}

/// Prompt shown to the lender when a borrower requests a new loan.
#[must_use]
pub fn new_loan_prompt(parties: &LoanParties, amount: f64, deadline: &str) -> String {
    format!(
        "{} ({}) wants to borrow {} from you, until {}. Do you accept?",
        parties.borrower_name,
        parties.borrower_username,
        fmt_amount(amount),
        deadline
    )
}

/// Prompt shown to the lender when the borrower claims to have repaid.
#[must_use]
pub fn repayment_prompt(parties: &LoanParties, amount: f64) -> String {
    format!(
        "{} ({}) claims to repay {} to you. Do you accept?",
        parties.borrower_name,
        parties.borrower_username,
        fmt_amount(amount)
    )
}

/// Audit-log line for a lifecycle event.
#[must_use]
pub fn log_line(
    kind: LoanLogKind,
    parties: &LoanParties,
    amount: f64,
    deadline: &str,
) -> String {
    let amount = fmt_amount(amount);
    let borrower = format!("{} ({})", parties.borrower_name, parties.borrower_username);
    let lender = format!("{} ({})", parties.lender_name, parties.lender_username);

    match kind {
        LoanLogKind::Request => {
            format!("{borrower} asked {lender} for a loan for {amount} until {deadline}.")
        }
        LoanLogKind::RequestAccepted => {
            format!("{lender} accepted {borrower} loan request for {amount} until {deadline}.")
        }
        LoanLogKind::RequestRejected => {
            format!("{lender} rejected {borrower} loan request for {amount} until {deadline}.")
        }
        LoanLogKind::Repay => {
            format!("{borrower} claims to repay {amount} to {lender}.")
        }
        LoanLogKind::RepayAccepted => {
            format!("{lender} accepted {borrower} repayment request for {amount}.")
        }
        LoanLogKind::RepayRejected => {
            format!("{lender} rejected {borrower} repayment request for {amount}.")
        }
    }
}

/// Notification pair for a decided loan request: one text addressed to the
/// borrower, one to the lender.
#[must_use]
pub fn request_decided_texts(
    accepted: bool,
    parties: &LoanParties,
    amount: f64,
) -> (String, String) {
    let amount = fmt_amount(amount);
    let verb = if accepted { "accepted" } else { "rejected" };
    let for_borrower = format!(
        "{} ({}) {verb} your loan request for {amount}.",
        parties.lender_name, parties.lender_username
    );
    let for_lender = format!(
        "You {verb} the loan request from {} ({}) for {amount}.",
        parties.borrower_name, parties.borrower_username
    );
    (for_borrower, for_lender)
}

/// Notification pair for a decided repayment claim.
#[must_use]
pub fn repayment_decided_texts(
    accepted: bool,
    parties: &LoanParties,
    amount: f64,
) -> (String, String) {
    let amount = fmt_amount(amount);
    let (for_borrower, for_lender) = if accepted {
        (
            format!(
                "{} ({}) confirmed your repayment of {amount}. The loan is settled.",
                parties.lender_name, parties.lender_username
            ),
            format!(
                "You confirmed the repayment of {amount} from {} ({}).",
                parties.borrower_name, parties.borrower_username
            ),
        )
    } else {
        (
            format!(
                "{} ({}) rejected your repayment claim for {amount}. The debt still stands.",
                parties.lender_name, parties.lender_username
            ),
            format!(
                "You rejected the repayment claim of {amount} from {} ({}).",
                parties.borrower_name, parties.borrower_username
            ),
        )
    };
    (for_borrower, for_lender)
}

/// Security alert after the failed-login threshold is reached.
#[must_use]
pub fn failed_logins_text(tries: i32) -> String {
    format!("Someone tried to log in to your account {tries} times unsuccessfully.")
}

/// Security alert for a login from different device hardware. Interpolates
/// the previous login's fingerprint so the owner can recognize it.
#[must_use]
pub fn new_device_text(previous: &Fingerprint) -> String {
    format!(
        "Is that you? Someone logged in to your account from a new device. \
         Previous login was from {} {} ({} {}).",
        previous.device_brand, previous.device_model, previous.os_family, previous.os_version
    )
}

/// Security alert for a login from the same device but a different browser
/// or operating system.
#[must_use]
pub fn new_browser_text(previous: &Fingerprint) -> String {
    format!(
        "Is that you? Someone logged in to your account from a new browser. \
         Previous login was from {} {} on {} {}.",
        previous.browser_family, previous.browser_version, previous.os_family, previous.os_version
    )
}
