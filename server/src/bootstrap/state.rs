use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use orchestrator_adapters::outgoing::postgres_sqlx::store::PostgresProjectSessionStore;
use orchestrator_adapters::shared::app_state::AppState as AdaptersAppState;
use orchestrator_application::error::AppError;
use orchestrator_application::infrastructure_config::Config;
use orchestrator_application::ports::outgoing::store::{DynProjectSessionStorePort, ProjectSessionStorePort};

/// Owns the Postgres pool and assembles the adapters-level [`AdaptersAppState`]
/// that the router is built against. Kept as a thin wrapper rather than
/// folding directly into `AdaptersAppState::new` so the pool's lifetime is
/// explicit at the composition root.
#[derive(Clone)]
pub struct AppState {
    pool: sqlx::PgPool,
    pub adapters: AdaptersAppState,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);

        let pool = PgPoolOptions::new()
            .max_connections(config.db.pool_size)
            .connect(config.db.database_url())
            .await
            .map_err(|e| AppError::DatabaseError {
                message: format!("failed to connect to database: {e}"),
            })?;

        let store: DynProjectSessionStorePort =
            Arc::new(PostgresProjectSessionStore::new(pool.clone(), config.db.query_timeout_secs))
                as Arc<dyn ProjectSessionStorePort>;

        let adapters = AdaptersAppState::new(config, store);

        Ok(Self { pool, adapters })
    }

    pub fn db_pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}
