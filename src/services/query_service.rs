//! Read-side aggregation over loans, debts, and audit logs.
//!
//! Pure queries with no side effects. Counterparty display data is resolved
//! with one batch lookup per request instead of per-row queries.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use crate::db::{Store, User};
use crate::entities::loans;
use crate::models::loan::LoanStatus;

/// One loan with both parties resolved for display.
#[derive(Debug, Clone, Serialize)]
pub struct LoanView {
    pub id: i32,
    pub lender: String,
    pub lender_username: String,
    pub borrower: String,
    pub borrower_username: String,
    pub amount: f64,
    pub deadline: String,
    pub status: &'static str,
}

/// Summed principal against one counterparty.
#[derive(Debug, Clone, Serialize)]
pub struct CounterpartyTotal {
    pub name: String,
    pub username: String,
    pub total: f64,
}

/// A loan list with its summed principal, grouped by counterparty.
#[derive(Debug, Clone, Serialize)]
pub struct LoanTotals {
    pub total: f64,
    pub count: usize,
    pub by_counterparty: Vec<CounterpartyTotal>,
    pub loans: Vec<LoanView>,
}

/// One debtor's summed outstanding amount within a deadline bucket.
#[derive(Debug, Clone, Serialize)]
pub struct DebtorView {
    pub name: String,
    pub username: String,
    pub amount: f64,
}

/// Debtors split by whether their deadline has passed. A debtor with both
/// on-time and overdue loans appears in both buckets, each with the summed
/// amount for that bucket.
#[derive(Debug, Clone, Serialize)]
pub struct DebtorBuckets {
    pub on_time: Vec<DebtorView>,
    pub overdue: Vec<DebtorView>,
}

/// One audit-log line.
#[derive(Debug, Clone, Serialize)]
pub struct LogView {
    pub loan_id: i32,
    pub status: &'static str,
    pub message: String,
    pub created_at: String,
}

pub struct QueryService {
    store: Store,
}

impl QueryService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Outstanding loans the user has given, with the owed amounts summed
    /// overall and per borrower.
    pub async fn loans_given(&self, user_id: i32) -> Result<LoanTotals> {
        let loans = self.store.outstanding_loans_for_lender(user_id).await?;
        self.totals(loans, |l| l.borrower_id).await
    }

    /// Outstanding debts the user owes, summed overall and per lender.
    pub async fn loans_taken(&self, user_id: i32) -> Result<LoanTotals> {
        let loans = self.store.outstanding_loans_for_borrower(user_id).await?;
        self.totals(loans, |l| l.lender_id).await
    }

    /// Lender-side history, canceled requests excluded.
    pub async fn loan_history(&self, user_id: i32) -> Result<Vec<LoanView>> {
        let loans = self.store.loan_history_for_lender(user_id).await?;
        self.views(loans).await
    }

    /// Borrower-side history, canceled requests excluded.
    pub async fn debt_history(&self, user_id: i32) -> Result<Vec<LoanView>> {
        let loans = self.store.loan_history_for_borrower(user_id).await?;
        self.views(loans).await
    }

    /// Borrowers who currently owe the user, matched by a username substring
    /// and summed per debtor into on-time and overdue totals.
    pub async fn search_debtors(&self, user_id: i32, query: &str) -> Result<DebtorBuckets> {
        let loans = self.store.outstanding_loans_for_lender(user_id).await?;
        let users = self.counterparties(&loans).await?;
        let today = chrono::Utc::now().date_naive();
        let needle = query.to_lowercase();

        // borrower_id -> (green total, red total), insertion-ordered
        let mut order: Vec<i32> = Vec::new();
        let mut sums: HashMap<i32, (f64, f64)> = HashMap::new();

        for loan in &loans {
            let Some(borrower) = users.get(&loan.borrower_id) else {
                continue;
            };
            if !needle.is_empty() && !borrower.username.to_lowercase().contains(&needle) {
                continue;
            }

            let entry = sums.entry(loan.borrower_id).or_insert_with(|| {
                order.push(loan.borrower_id);
                (0.0, 0.0)
            });

            let past_due = NaiveDate::parse_from_str(&loan.deadline, "%Y-%m-%d")
                .map(|d| d < today)
                .unwrap_or(false);
            if past_due {
                entry.1 += loan.amount;
            } else {
                entry.0 += loan.amount;
            }
        }

        let mut on_time = Vec::new();
        let mut overdue = Vec::new();
        for borrower_id in order {
            let Some(borrower) = users.get(&borrower_id) else {
                continue;
            };
            let (green, red) = sums[&borrower_id];
            if green > 0.0 {
                on_time.push(DebtorView {
                    name: borrower.full_name(),
                    username: borrower.username.clone(),
                    amount: green,
                });
            }
            if red > 0.0 {
                overdue.push(DebtorView {
                    name: borrower.full_name(),
                    username: borrower.username.clone(),
                    amount: red,
                });
            }
        }

        Ok(DebtorBuckets { on_time, overdue })
    }

    /// The full audit trail of every loan the user participates in, in
    /// insertion order.
    pub async fn audit_logs(&self, user_id: i32) -> Result<Vec<LogView>> {
        let loan_ids = self.store.loan_ids_for_participant(user_id).await?;
        let logs = self.store.loan_logs_for_loans(&loan_ids).await?;

        Ok(logs
            .into_iter()
            .map(|log| LogView {
                loan_id: log.loan_id,
                status: LoanStatus::from_code(log.status).map_or("UNKNOWN", LoanStatus::label),
                message: log.message,
                created_at: log.created_at,
            })
            .collect())
    }

    async fn totals(
        &self,
        loans: Vec<loans::Model>,
        counterparty_of: fn(&loans::Model) -> i32,
    ) -> Result<LoanTotals> {
        let total = loans.iter().map(|l| l.amount).sum();
        let count = loans.len();

        let users = self.counterparties(&loans).await?;
        let mut order: Vec<i32> = Vec::new();
        let mut grouped: HashMap<i32, f64> = HashMap::new();
        for loan in &loans {
            let id = counterparty_of(loan);
            *grouped.entry(id).or_insert_with(|| {
                order.push(id);
                0.0
            }) += loan.amount;
        }

        let by_counterparty = order
            .into_iter()
            .filter_map(|id| {
                users.get(&id).map(|user| CounterpartyTotal {
                    name: user.full_name(),
                    username: user.username.clone(),
                    total: grouped[&id],
                })
            })
            .collect();

        let loans = self.views(loans).await?;
        Ok(LoanTotals {
            total,
            count,
            by_counterparty,
            loans,
        })
    }

    async fn views(&self, loans: Vec<loans::Model>) -> Result<Vec<LoanView>> {
        let users = self.counterparties(&loans).await?;

        Ok(loans
            .into_iter()
            .map(|loan| {
                let lender = users.get(&loan.lender_id);
                let borrower = users.get(&loan.borrower_id);
                LoanView {
                    id: loan.id,
                    lender: lender.map(User::full_name).unwrap_or_default(),
                    lender_username: lender.map(|u| u.username.clone()).unwrap_or_default(),
                    borrower: borrower.map(User::full_name).unwrap_or_default(),
                    borrower_username: borrower.map(|u| u.username.clone()).unwrap_or_default(),
                    amount: loan.amount,
                    deadline: loan.deadline,
                    status: LoanStatus::from_code(loan.status).map_or("UNKNOWN", LoanStatus::label),
                }
            })
            .collect())
    }

    async fn counterparties(&self, loans: &[loans::Model]) -> Result<HashMap<i32, User>> {
        let ids: HashSet<i32> = loans
            .iter()
            .flat_map(|l| [l.lender_id, l.borrower_id])
            .collect();
        let ids: Vec<i32> = ids.into_iter().collect();
        self.store.get_users_by_ids(&ids).await
    }
}
