use serde_json::Value;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use domain::guard_config::ChargeStrategy;
use domain::project::{Project, ProjectId, ProjectMode};
use domain::session::{Session, SessionId, SessionStatus};
use domain::worker::WorkerId;
use orchestrator_application::error::{AppError, AppResult};
use orchestrator_application::ports::outgoing::store::ProjectSessionStorePort;

use super::utils::PostgresExecutor;

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    name: String,
    mode: String,
    config: Value,
    created_at: OffsetDateTime,
}

impl TryFrom<ProjectRow> for Project {
    type Error = AppError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        let mode = match row.mode.as_str() {
            "image" => ProjectMode::Image,
            "guard" => ProjectMode::Guard,
            other => {
                return Err(AppError::ValidationError {
                    message: format!("unknown project mode in storage: {other}"),
                });
            }
        };
        Ok(Self {
            id: ProjectId(row.id),
            name: row.name,
            mode,
            config: row.config,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    project_id: Uuid,
    slave_ids: Value,
    strategy: String,
    status: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<SessionRow> for Session {
    type Error = AppError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let strategy = match row.strategy.as_str() {
            "greedy" => ChargeStrategy::Greedy,
            "round_robin" => ChargeStrategy::RoundRobin,
            "balanced" => ChargeStrategy::Balanced,
            other => {
                return Err(AppError::ValidationError {
                    message: format!("unknown charge strategy in storage: {other}"),
                });
            }
        };
        let status = match row.status.as_str() {
            "created" => SessionStatus::Created,
            "running" => SessionStatus::Running,
            "paused" => SessionStatus::Paused,
            "stopped" => SessionStatus::Stopped,
            other => {
                return Err(AppError::ValidationError {
                    message: format!("unknown session status in storage: {other}"),
                });
            }
        };
        let slave_ids: Vec<String> = serde_json::from_value(row.slave_ids).map_err(AppError::JsonError)?;
        Ok(Self {
            id: SessionId(row.id),
            project_id: ProjectId(row.project_id),
            slave_ids: slave_ids.into_iter().map(WorkerId::new).collect(),
            strategy,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn status_str(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Created => "created",
        SessionStatus::Running => "running",
        SessionStatus::Paused => "paused",
        SessionStatus::Stopped => "stopped",
    }
}

/// Postgres-backed project/session store. Reads and the single lifecycle
/// write path (`set_session_status`) the orchestrator is allowed to perform;
/// project/session creation and deletion are owned by the HTTP layer, which
/// talks to the pool directly rather than through this port.
pub struct PostgresProjectSessionStore {
    pool: PgPool,
    executor: PostgresExecutor,
}

impl PostgresProjectSessionStore {
    #[must_use]
    pub fn new(pool: PgPool, query_timeout_secs: u64) -> Self {
        Self {
            pool,
            executor: PostgresExecutor::new(query_timeout_secs),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl ProjectSessionStorePort for PostgresProjectSessionStore {
    async fn get_project(&self, id: ProjectId) -> AppResult<Option<Project>> {
        let pool = self.pool.clone();
        let row: Option<ProjectRow> = self
            .executor
            .execute_with_timeout(
                || async move {
                    sqlx::query_as::<_, ProjectRow>(
                        "SELECT id, name, mode, config, created_at FROM projects WHERE id = $1",
                    )
                    .bind(id.0)
                    .fetch_optional(&pool)
                    .await
                },
                "get_project",
            )
            .await?;
        row.map(Project::try_from).transpose()
    }

    async fn get_session(&self, id: SessionId) -> AppResult<Option<Session>> {
        let pool = self.pool.clone();
        let row: Option<SessionRow> = self
            .executor
            .execute_with_timeout(
                || async move {
                    sqlx::query_as::<_, SessionRow>(
                        "SELECT id, project_id, slave_ids, strategy, status, created_at, updated_at \
                         FROM sessions WHERE id = $1",
                    )
                    .bind(id.0)
                    .fetch_optional(&pool)
                    .await
                },
                "get_session",
            )
            .await?;
        row.map(Session::try_from).transpose()
    }

    async fn set_session_status(
        &self,
        id: SessionId,
        status: SessionStatus,
        updated_at: OffsetDateTime,
    ) -> AppResult<()> {
        let pool = self.pool.clone();
        let status_value = status_str(status);
        self.executor
            .execute_with_timeout(
                || async move {
                    sqlx::query("UPDATE sessions SET status = $1, updated_at = $2 WHERE id = $3")
                        .bind(status_value)
                        .bind(updated_at)
                        .bind(id.0)
                        .execute(&pool)
                        .await
                },
                "set_session_status",
            )
            .await?;
        Ok(())
    }
}
