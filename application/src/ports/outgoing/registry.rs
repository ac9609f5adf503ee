use std::collections::HashSet;
use std::sync::Arc;

use domain::worker::{Preview, Worker, WorkerId, WorkerStatus};
use serde_json::Value;

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    New,
    Reconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetFavoriteOutcome {
    pub unchanged: bool,
    /// The worker that was favorite before this call, if any and if it
    /// differs from the new favorite. `None` on the idempotent (`unchanged`)
    /// path since there is nothing to demote.
    pub previous_favorite: Option<WorkerId>,
}

/// Worker/UI connection fan-out plus the worker metadata map it owns (C8).
#[async_trait::async_trait]
pub trait RegistryPort: Send + Sync {
    async fn connect_worker(&self, id: WorkerId) -> AppResult<ConnectOutcome>;

    /// Removes the worker. If it was the favorite and another worker remains
    /// connected, that worker is auto-elected and its id returned so the
    /// caller can push guard config/data to it (the registry itself does not
    /// know about guard config).
    async fn disconnect_worker(&self, id: &WorkerId) -> Option<WorkerId>;

    async fn set_favorite(&self, id: &WorkerId) -> AppResult<SetFavoriteOutcome>;
    async fn favorite_id(&self) -> Option<WorkerId>;

    async fn connected_ids(&self) -> Vec<WorkerId>;
    async fn get_worker(&self, id: &WorkerId) -> Option<Worker>;
    async fn list_workers(&self) -> Vec<Worker>;

    async fn merge_telemetry(&self, id: &WorkerId, data: Value) -> AppResult<()>;
    async fn set_status(&self, id: &WorkerId, status: WorkerStatus) -> AppResult<()>;
    async fn set_preview(&self, id: &WorkerId, preview: Preview) -> AppResult<()>;
    async fn bump_last_preview_timestamp(&self, id: &WorkerId, ts: i64) -> AppResult<()>;
    async fn clear_preview_state(&self);

    async fn send_to_slave(&self, id: &WorkerId, msg: Value) -> AppResult<()>;
    async fn broadcast_to_ui(&self, msg: Value) -> AppResult<()>;
    async fn broadcast_to_slaves(&self, msg: Value, ids: Option<HashSet<WorkerId>>)
    -> AppResult<()>;

    /// Caches the most recently uploaded guard data file so it can be
    /// replayed to a worker that becomes (or reconnects as) the favorite.
    async fn set_guard_data(&self, filename: String, data: Value);
    async fn guard_data(&self) -> Option<(String, Value)>;
}

pub type DynRegistryPort = Arc<dyn RegistryPort>;
