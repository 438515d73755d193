use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::AuthedUser;
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::entities::{loan_messages, notifications};
use crate::services::loan_service::{LoanInfo, NewLoanInput};

#[derive(Deserialize)]
pub struct CreateLoanRequest {
    pub lender_username: String,
    /// Raw string so trailing-decimal rules apply before parsing.
    pub amount: String,
    pub deadline: String,
}

/// POST /loans
/// Borrower asks a lender for a loan.
pub async fn create_loan(
    State(state): State<Arc<AppState>>,
    Extension(AuthedUser(user)): Extension<AuthedUser>,
    Json(payload): Json<CreateLoanRequest>,
) -> Result<Json<ApiResponse<LoanInfo>>, ApiError> {
    let loan = state
        .loan_service()
        .request_loan(
            user.id,
            NewLoanInput {
                lender_username: payload.lender_username,
                amount: payload.amount,
                deadline: payload.deadline,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(loan)))
}

/// POST /loans/{id}/accept
pub async fn accept_request(
    State(state): State<Arc<AppState>>,
    Extension(AuthedUser(user)): Extension<AuthedUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<LoanInfo>>, ApiError> {
    let loan = state.loan_service().accept_request(id, user.id).await?;
    Ok(Json(ApiResponse::success(loan)))
}

/// POST /loans/{id}/reject
pub async fn reject_request(
    State(state): State<Arc<AppState>>,
    Extension(AuthedUser(user)): Extension<AuthedUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<LoanInfo>>, ApiError> {
    let loan = state.loan_service().reject_request(id, user.id).await?;
    Ok(Json(ApiResponse::success(loan)))
}

/// POST /loans/{id}/payback
pub async fn pay_back(
    State(state): State<Arc<AppState>>,
    Extension(AuthedUser(user)): Extension<AuthedUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<LoanInfo>>, ApiError> {
    let loan = state.loan_service().pay_back(id, user.id).await?;
    Ok(Json(ApiResponse::success(loan)))
}

/// POST /loans/{id}/confirm
pub async fn confirm_repayment(
    State(state): State<Arc<AppState>>,
    Extension(AuthedUser(user)): Extension<AuthedUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<LoanInfo>>, ApiError> {
    let loan = state.loan_service().confirm_repayment(id, user.id).await?;
    Ok(Json(ApiResponse::success(loan)))
}

/// POST /loans/{id}/dispute
pub async fn reject_repayment(
    State(state): State<Arc<AppState>>,
    Extension(AuthedUser(user)): Extension<AuthedUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<LoanInfo>>, ApiError> {
    let loan = state.loan_service().reject_repayment(id, user.id).await?;
    Ok(Json(ApiResponse::success(loan)))
}

/// GET /messages
/// Open prompts awaiting the user's decision.
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(AuthedUser(user)): Extension<AuthedUser>,
) -> Result<Json<ApiResponse<Vec<loan_messages::Model>>>, ApiError> {
    let messages = state
        .store()
        .unresolved_messages_for_user(user.id)
        .await?;
    Ok(Json(ApiResponse::success(messages)))
}

/// GET /notifications
/// Unseen notifications for the user.
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(AuthedUser(user)): Extension<AuthedUser>,
) -> Result<Json<ApiResponse<Vec<notifications::Model>>>, ApiError> {
    let notifications = state.store().unseen_notifications_for_user(user.id).await?;
    Ok(Json(ApiResponse::success(notifications)))
}

/// POST /notifications/{id}/seen
pub async fn mark_notification_seen(
    State(state): State<Arc<AppState>>,
    Extension(AuthedUser(user)): Extension<AuthedUser>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let marked = state.store().mark_notification_seen(id, user.id).await?;
    if !marked {
        return Err(ApiError::NotFound(format!("Notification {id} not found")));
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Notification marked as seen",
    ))))
}
