use domain::batch::RequestId;
use domain::session::SessionId;
use domain::worker::WorkerId;

use crate::error::AppResult;

/// One planner round, reported back to whoever triggered it (looping
/// orchestrator iteration or an interactive `one_batch` call).
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub request_id: RequestId,
    pub plan: Vec<(WorkerId, u32)>,
    pub dispatched: u32,
}

#[async_trait::async_trait]
pub trait SessionUseCase: Send + Sync {
    async fn start(&self, session_id: SessionId) -> AppResult<()>;
    async fn pause(&self, session_id: SessionId) -> AppResult<()>;
    async fn stop(&self, session_id: SessionId) -> AppResult<()>;
    async fn one_batch(&self, session_id: SessionId) -> AppResult<RoundOutcome>;
}
