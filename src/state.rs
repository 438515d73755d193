use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::auth_service::AuthService;
use crate::services::auth_service_impl::SeaOrmAuthService;
use crate::services::loan_service::LoanService;
use crate::services::loan_service_impl::SeaOrmLoanService;
use crate::services::query_service::QueryService;

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub loan_service: Arc<dyn LoanService>,

    pub query_service: Arc<QueryService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;

        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService>;

        let loan_service = Arc::new(SeaOrmLoanService::new(store.clone())) as Arc<dyn LoanService>;

        let query_service = Arc::new(QueryService::new(store.clone()));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            auth_service,
            loan_service,
            query_service,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
