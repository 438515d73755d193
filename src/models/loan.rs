//! Loan lifecycle state machine.
//!
//! A loan moves through `RequestInProgress -> NotPayed <-> Pending -> Payed`,
//! with `Canceled` reachable only from `RequestInProgress`. The engine never
//! assigns a status directly; every change goes through [`LoanStatus::next`].

use serde::Serialize;

/// Closed set of loan states, persisted as integer codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    RequestInProgress,
    NotPayed,
    Pending,
    Payed,
    Canceled,
}

impl LoanStatus {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::RequestInProgress => 1,
            Self::NotPayed => 2,
            Self::Pending => 3,
            Self::Payed => 4,
            Self::Canceled => 5,
        }
    }

    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::RequestInProgress),
            2 => Some(Self::NotPayed),
            3 => Some(Self::Pending),
            4 => Some(Self::Payed),
            5 => Some(Self::Canceled),
            _ => None,
        }
    }

    /// Human label for history views.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RequestInProgress => "REQUEST IN PROGRESS",
            Self::NotPayed => "NOT PAYED",
            Self::Pending => "PENDING",
            Self::Payed => "PAYED",
            Self::Canceled => "CANCELED",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Payed | Self::Canceled)
    }

    /// Whether the debt still stands (counts toward owed totals).
    #[must_use]
    pub const fn is_outstanding(self) -> bool {
        matches!(self, Self::NotPayed | Self::Pending)
    }

    /// Computes the state an action would move this loan to, or `None` if
    /// the action is not legal from the current state.
    #[must_use]
    pub const fn next(self, action: LoanAction) -> Option<Self> {
        match (self, action) {
            (Self::RequestInProgress, LoanAction::AcceptRequest) => Some(Self::NotPayed),
            (Self::RequestInProgress, LoanAction::RejectRequest) => Some(Self::Canceled),
            (Self::NotPayed, LoanAction::PayBack) => Some(Self::Pending),
            (Self::Pending, LoanAction::ConfirmRepayment) => Some(Self::Payed),
            (Self::Pending, LoanAction::RejectRepayment) => Some(Self::NotPayed),
            _ => None,
        }
    }
}

/// The five post-creation transitions of the lifecycle table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanAction {
    AcceptRequest,
    RejectRequest,
    PayBack,
    ConfirmRepayment,
    RejectRepayment,
}

impl LoanAction {
    /// Which side of the loan is allowed to perform this action.
    #[must_use]
    pub const fn actor(self) -> LoanParty {
        match self {
            Self::AcceptRequest | Self::RejectRequest | Self::ConfirmRepayment
            | Self::RejectRepayment => LoanParty::Lender,
            Self::PayBack => LoanParty::Borrower,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanParty {
    Lender,
    Borrower,
}
