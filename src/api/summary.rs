use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::AuthedUser;
use super::{ApiError, ApiResponse, AppState};
use crate::services::query_service::{DebtorBuckets, LoanTotals, LoanView, LogView};

#[derive(Deserialize)]
pub struct DebtorQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /loans/given
/// Outstanding loans the user has given, with the summed amount.
pub async fn loans_given(
    State(state): State<Arc<AppState>>,
    Extension(AuthedUser(user)): Extension<AuthedUser>,
) -> Result<Json<ApiResponse<LoanTotals>>, ApiError> {
    let totals = state.query_service().loans_given(user.id).await?;
    Ok(Json(ApiResponse::success(totals)))
}

/// GET /loans/taken
/// Outstanding debts the user owes.
pub async fn loans_taken(
    State(state): State<Arc<AppState>>,
    Extension(AuthedUser(user)): Extension<AuthedUser>,
) -> Result<Json<ApiResponse<LoanTotals>>, ApiError> {
    let totals = state.query_service().loans_taken(user.id).await?;
    Ok(Json(ApiResponse::success(totals)))
}

/// GET /loans
/// Lender-side history.
pub async fn loan_history(
    State(state): State<Arc<AppState>>,
    Extension(AuthedUser(user)): Extension<AuthedUser>,
) -> Result<Json<ApiResponse<Vec<LoanView>>>, ApiError> {
    let loans = state.query_service().loan_history(user.id).await?;
    Ok(Json(ApiResponse::success(loans)))
}

/// GET /debts
/// Borrower-side history.
pub async fn debt_history(
    State(state): State<Arc<AppState>>,
    Extension(AuthedUser(user)): Extension<AuthedUser>,
) -> Result<Json<ApiResponse<Vec<LoanView>>>, ApiError> {
    let debts = state.query_service().debt_history(user.id).await?;
    Ok(Json(ApiResponse::success(debts)))
}

/// GET /debtors?q=
/// Borrowers who owe the user, split by deadline into on-time and overdue.
pub async fn search_debtors(
    State(state): State<Arc<AppState>>,
    Extension(AuthedUser(user)): Extension<AuthedUser>,
    Query(query): Query<DebtorQuery>,
) -> Result<Json<ApiResponse<DebtorBuckets>>, ApiError> {
    let buckets = state
        .query_service()
        .search_debtors(user.id, &query.q)
        .await?;
    Ok(Json(ApiResponse::success(buckets)))
}

/// GET /loans/logs
/// The full audit trail of every loan the user participates in.
pub async fn audit_logs(
    State(state): State<Arc<AppState>>,
    Extension(AuthedUser(user)): Extension<AuthedUser>,
) -> Result<Json<ApiResponse<Vec<LogView>>>, ApiError> {
    let logs = state.query_service().audit_logs(user.id).await?;
    Ok(Json(ApiResponse::success(logs)))
}
