use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::state::SharedState;

pub mod auth;
mod error;
mod loans;
mod summary;
mod types;

pub use error::ApiError;
pub use types::*;

use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn crate::services::auth_service::AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn loan_service(&self) -> &Arc<dyn crate::services::loan_service::LoanService> {
        &self.shared.loan_service
    }

    #[must_use]
    pub fn query_service(&self) -> &Arc<crate::services::query_service::QueryService> {
        &self.shared.query_service
    }
}

pub fn create_app_state(shared: Arc<SharedState>) -> Arc<AppState> {
    Arc::new(AppState { shared })
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (cors_origins, secure_cookies, session_minutes) = {
        let config = state.config().read().await;
        (
            config.server.cors_allowed_origins.clone(),
            config.server.secure_cookies,
            config.server.session_minutes,
        )
    };

    let protected_routes = create_protected_router(state.clone());

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            session_minutes,
        )));

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/recover", post(auth::recover))
        .route("/password/strength", post(auth::password_strength))
        .layer(session_layer)
        .with_state(state.clone());

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(auth::get_current_user))
        .route("/auth/password", put(auth::change_password))
        .route("/loans", post(loans::create_loan))
        .route("/loans", get(summary::loan_history))
        .route("/loans/given", get(summary::loans_given))
        .route("/loans/taken", get(summary::loans_taken))
        .route("/loans/logs", get(summary::audit_logs))
        .route("/loans/{id}/accept", post(loans::accept_request))
        .route("/loans/{id}/reject", post(loans::reject_request))
        .route("/loans/{id}/payback", post(loans::pay_back))
        .route("/loans/{id}/confirm", post(loans::confirm_repayment))
        .route("/loans/{id}/dispute", post(loans::reject_repayment))
        .route("/debts", get(summary::debt_history))
        .route("/debtors", get(summary::search_debtors))
        .route("/messages", get(loans::list_messages))
        .route("/notifications", get(loans::list_notifications))
        .route(
            "/notifications/{id}/seen",
            post(loans::mark_notification_seen),
        )
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
