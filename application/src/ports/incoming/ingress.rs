use serde_json::Value;

use domain::worker::WorkerId;

use crate::error::AppResult;

/// Demultiplexes one inbound worker message by its `type` field (C10).
#[async_trait::async_trait]
pub trait IngressUseCase: Send + Sync {
    async fn handle(&self, worker_id: &WorkerId, message: Value) -> AppResult<()>;
}
