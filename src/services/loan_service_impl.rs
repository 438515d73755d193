//! `SeaORM` implementation of the `LoanService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::{NewPrompt, Store, TransitionRecord, User};
use crate::entities::loans;
use crate::models::loan::{LoanAction, LoanParty, LoanStatus};
use crate::models::messages::{self, LoanLogKind, LoanParties};
use crate::security::validation;
use crate::services::loan_service::{LoanError, LoanInfo, LoanService, NewLoanInput};

pub struct SeaOrmLoanService {
    store: Store,
}

impl SeaOrmLoanService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn load_parties(&self, loan: &loans::Model) -> Result<(User, User, LoanParties), LoanError> {
        let users = self
            .store
            .get_users_by_ids(&[loan.lender_id, loan.borrower_id])
            .await?;
        let lender = users.get(&loan.lender_id).ok_or(LoanError::UserNotFound)?;
        let borrower = users
            .get(&loan.borrower_id)
            .ok_or(LoanError::UserNotFound)?;

        let parties = LoanParties {
            borrower_name: borrower.full_name(),
            borrower_username: borrower.username.clone(),
            lender_name: lender.full_name(),
            lender_username: lender.username.clone(),
        };

        Ok((lender.clone(), borrower.clone(), parties))
    }

    /// The shared transition path: authorize the actor's side, compute the
    /// next state, render the texts, and apply the guarded update. A
    /// concurrent transition that wins the race surfaces as `StateConflict`,
    /// same as a stale replay.
    async fn act(&self, loan_id: i32, actor_id: i32, action: LoanAction) -> Result<LoanInfo, LoanError> {
        let loan = self
            .store
            .get_loan(loan_id)
            .await?
            .ok_or(LoanError::NotFound)?;

        let expected = actor_for(&loan, action.actor());
        if actor_id != expected {
            return Err(LoanError::Forbidden);
        }

        let current = LoanStatus::from_code(loan.status)
            .ok_or_else(|| LoanError::Internal(format!("Unknown loan status: {}", loan.status)))?;
        let new_status = current.next(action).ok_or(LoanError::StateConflict)?;

        let (lender, borrower, parties) = self.load_parties(&loan).await?;

        let log_message = messages::log_line(log_kind(action), &parties, loan.amount, &loan.deadline);

        let prompt = match action {
            LoanAction::PayBack => Some(NewPrompt {
                receiver_id: lender.id,
                message: messages::repayment_prompt(&parties, loan.amount),
                new_loan: false,
            }),
            _ => None,
        };

        let notifications = match action {
            LoanAction::AcceptRequest | LoanAction::RejectRequest => {
                let accepted = action == LoanAction::AcceptRequest;
                let (for_borrower, for_lender) =
                    messages::request_decided_texts(accepted, &parties, loan.amount);
                vec![(borrower.id, for_borrower), (lender.id, for_lender)]
            }
            LoanAction::ConfirmRepayment | LoanAction::RejectRepayment => {
                let accepted = action == LoanAction::ConfirmRepayment;
                let (for_borrower, for_lender) =
                    messages::repayment_decided_texts(accepted, &parties, loan.amount);
                vec![(borrower.id, for_borrower), (lender.id, for_lender)]
            }
            LoanAction::PayBack => Vec::new(),
        };

        let applied = self
            .store
            .apply_loan_transition(TransitionRecord {
                loan_id,
                expected_status: current,
                new_status,
                log_message,
                prompt,
                notifications,
            })
            .await?;

        if !applied {
            return Err(LoanError::StateConflict);
        }

        Ok(loan_info(&loan, new_status))
    }
}

const fn actor_for(loan: &loans::Model, party: LoanParty) -> i32 {
    match party {
        LoanParty::Lender => loan.lender_id,
        LoanParty::Borrower => loan.borrower_id,
    }
}

const fn log_kind(action: LoanAction) -> LoanLogKind {
    match action {
        LoanAction::AcceptRequest => LoanLogKind::RequestAccepted,
        LoanAction::RejectRequest => LoanLogKind::RequestRejected,
        LoanAction::PayBack => LoanLogKind::Repay,
        LoanAction::ConfirmRepayment => LoanLogKind::RepayAccepted,
        LoanAction::RejectRepayment => LoanLogKind::RepayRejected,
    }
}

fn loan_info(loan: &loans::Model, status: LoanStatus) -> LoanInfo {
    LoanInfo {
        id: loan.id,
        lender_id: loan.lender_id,
        borrower_id: loan.borrower_id,
        amount: loan.amount,
        deadline: loan.deadline.clone(),
        status,
        status_label: status.label(),
    }
}

#[async_trait]
impl LoanService for SeaOrmLoanService {
    async fn request_loan(
        &self,
        borrower_id: i32,
        input: NewLoanInput,
    ) -> Result<LoanInfo, LoanError> {
        let today = chrono::Utc::now().date_naive();
        let (amount, deadline) =
            validation::validate_new_loan(&input.amount, &input.deadline, today)
                .map_err(LoanError::Validation)?;
        let deadline = deadline.format("%Y-%m-%d").to_string();

        let lender = self
            .store
            .get_user_by_username(&input.lender_username)
            .await?
            .ok_or(LoanError::UserNotFound)?;
        if lender.id == borrower_id {
            return Err(LoanError::Validation(vec![
                "You cannot borrow from yourself.".to_string(),
            ]));
        }

        let borrower = self
            .store
            .get_user_by_id(borrower_id)
            .await?
            .ok_or(LoanError::UserNotFound)?;

        let parties = LoanParties {
            borrower_name: borrower.full_name(),
            borrower_username: borrower.username.clone(),
            lender_name: lender.full_name(),
            lender_username: lender.username.clone(),
        };

        let log_message = messages::log_line(LoanLogKind::Request, &parties, amount, &deadline);
        let prompt_message = messages::new_loan_prompt(&parties, amount, &deadline);

        let loan = self
            .store
            .create_loan_request(
                lender.id,
                borrower_id,
                amount,
                &deadline,
                log_message,
                prompt_message,
            )
            .await?;

        info!(loan_id = loan.id, borrower_id, lender_id = lender.id, "Loan request created");

        Ok(loan_info(&loan, LoanStatus::RequestInProgress))
    }

    async fn accept_request(&self, loan_id: i32, actor_id: i32) -> Result<LoanInfo, LoanError> {
        self.act(loan_id, actor_id, LoanAction::AcceptRequest).await
    }

    async fn reject_request(&self, loan_id: i32, actor_id: i32) -> Result<LoanInfo, LoanError> {
        self.act(loan_id, actor_id, LoanAction::RejectRequest).await
    }

    async fn pay_back(&self, loan_id: i32, actor_id: i32) -> Result<LoanInfo, LoanError> {
        self.act(loan_id, actor_id, LoanAction::PayBack).await
    }

    async fn confirm_repayment(&self, loan_id: i32, actor_id: i32) -> Result<LoanInfo, LoanError> {
        self.act(loan_id, actor_id, LoanAction::ConfirmRepayment)
            .await
    }

    async fn reject_repayment(&self, loan_id: i32, actor_id: i32) -> Result<LoanInfo, LoanError> {
        self.act(loan_id, actor_id, LoanAction::RejectRepayment)
            .await
    }
}
