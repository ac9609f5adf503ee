use std::sync::Arc;
use time::OffsetDateTime;

use domain::project::{Project, ProjectId};
use domain::session::{Session, SessionId, SessionStatus};

use crate::error::AppResult;

/// Read access to project/session records plus the orchestrator's sole
/// write path: session status transitions. Creation and deletion of both
/// resources is owned by the HTTP collaborator, not the core.
#[async_trait::async_trait]
pub trait ProjectSessionStorePort: Send + Sync {
    async fn get_project(&self, id: ProjectId) -> AppResult<Option<Project>>;
    async fn get_session(&self, id: SessionId) -> AppResult<Option<Session>>;
    async fn set_session_status(
        &self,
        id: SessionId,
        status: SessionStatus,
        updated_at: OffsetDateTime,
    ) -> AppResult<()>;
}

pub type DynProjectSessionStorePort = Arc<dyn ProjectSessionStorePort>;
