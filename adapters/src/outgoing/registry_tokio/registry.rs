use std::collections::HashSet;
use std::sync::RwLock;

use dashmap::DashMap;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use uuid::Uuid;

use domain::worker::{Preview, Worker, WorkerId, WorkerStatus};
use orchestrator_application::error::{AppError, AppResult};
use orchestrator_application::infrastructure_config::{UiWsConfig, WorkerWsConfig};
use orchestrator_application::ports::outgoing::registry::{
    ConnectOutcome, RegistryPort, SetFavoriteOutcome,
};

use crate::outgoing::compression::maybe_compress;

/// An outbound channel to one connected socket, paired with the compression
/// threshold that applies to messages sent through it.
struct Outbox {
    sender: mpsc::Sender<Value>,
    compression_threshold_bytes: usize,
}

impl Outbox {
    async fn send(&self, message: Value) -> bool {
        let framed = maybe_compress(message, self.compression_threshold_bytes);
        self.sender.send(framed).await.is_ok()
    }
}

struct WorkerEntry {
    worker: Worker,
    outbox: Outbox,
}

/// In-memory connection registry (C8), grounded on the reference
/// implementation's `ConnectionManager`: a worker map, a UI connection map,
/// and a single favorite id, all guarded independently so no lock is held
/// across a send.
pub struct TokioRegistry {
    workers: DashMap<WorkerId, WorkerEntry>,
    ui_connections: DashMap<Uuid, Outbox>,
    favorite: RwLock<Option<WorkerId>>,
    guard_data: RwLock<Option<(String, Value)>>,
    worker_ws: WorkerWsConfig,
    ui_ws: UiWsConfig,
    compression_threshold_bytes: usize,
}

impl TokioRegistry {
    #[must_use]
    pub fn new(worker_ws: WorkerWsConfig, ui_ws: UiWsConfig, compression_threshold_bytes: usize) -> Self {
        Self {
            workers: DashMap::new(),
            ui_connections: DashMap::new(),
            favorite: RwLock::new(None),
            guard_data: RwLock::new(None),
            worker_ws,
            ui_ws,
            compression_threshold_bytes,
        }
    }

    /// Registers a worker's outbound sender. Called once by the WS endpoint
    /// right after `connect_worker` succeeds.
    pub fn attach_worker_channel(&self, id: &WorkerId, sender: mpsc::Sender<Value>) {
        if let Some(mut entry) = self.workers.get_mut(id) {
            entry.outbox = Outbox {
                sender,
                compression_threshold_bytes: self.compression_threshold_bytes,
            };
        }
    }

    /// Registers a UI connection's outbound sender under a fresh id, owned
    /// by the WS endpoint for the lifetime of that socket. Returns `None`
    /// if the configured UI connection limit is already saturated.
    pub fn attach_ui_channel(&self, sender: mpsc::Sender<Value>) -> Option<Uuid> {
        if let Some(max) = self.ui_ws.max_connections {
            if self.ui_connections.len() >= max {
                return None;
            }
        }
        let id = Uuid::new_v4();
        self.ui_connections.insert(
            id,
            Outbox {
                sender,
                compression_threshold_bytes: self.compression_threshold_bytes,
            },
        );
        Some(id)
    }

    pub fn detach_ui_channel(&self, id: Uuid) {
        self.ui_connections.remove(&id);
    }

    fn favorite_snapshot(&self) -> Option<WorkerId> {
        self.favorite.read().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    fn elect_if_vacant(&self) -> Option<WorkerId> {
        let mut favorite = self.favorite.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        if favorite.is_some() {
            return None;
        }
        let candidate = self.workers.iter().next().map(|entry| entry.key().clone());
        *favorite = candidate.clone();
        if let Some(id) = &candidate {
            if let Some(mut entry) = self.workers.get_mut(id) {
                entry.worker.is_favorite = true;
            }
        }
        candidate
    }
}

#[async_trait::async_trait]
impl RegistryPort for TokioRegistry {
    async fn connect_worker(&self, id: WorkerId) -> AppResult<ConnectOutcome> {
        let now = OffsetDateTime::now_utc();
        let is_new = !self.workers.contains_key(&id);
        if is_new {
            if let Some(max) = self.worker_ws.max_connections {
                if self.workers.len() >= max {
                    return Err(AppError::ServiceUnavailable);
                }
            }
        }
        let outcome = if let Some(mut entry) = self.workers.get_mut(&id) {
            entry.worker.last_seen = now;
            ConnectOutcome::Reconnected
        } else {
            self.workers.insert(
                id.clone(),
                WorkerEntry {
                    worker: Worker::new(id.clone(), now),
                    outbox: Outbox {
                        sender: mpsc::channel(1).0,
                        compression_threshold_bytes: self.compression_threshold_bytes,
                    },
                },
            );
            ConnectOutcome::New
        };

        self.elect_if_vacant();
        Ok(outcome)
    }

    async fn disconnect_worker(&self, id: &WorkerId) -> Option<WorkerId> {
        self.workers.remove(id);
        let was_favorite = self.favorite_snapshot().as_ref() == Some(id);
        if !was_favorite {
            return None;
        }
        {
            let mut favorite = self.favorite.write().unwrap_or_else(std::sync::PoisonError::into_inner);
            *favorite = None;
        }
        self.elect_if_vacant()
    }

    async fn set_favorite(&self, id: &WorkerId) -> AppResult<SetFavoriteOutcome> {
        if !self.workers.contains_key(id) {
            return Err(AppError::WorkerNotFound { id: id.to_string() });
        }

        let previous = self.favorite_snapshot();
        let already_favorite = previous.as_ref() == Some(id);
        {
            let mut favorite = self.favorite.write().unwrap_or_else(std::sync::PoisonError::into_inner);
            for mut entry in self.workers.iter_mut() {
                entry.worker.is_favorite = entry.key() == id;
            }
            *favorite = Some(id.clone());
        }
        Ok(SetFavoriteOutcome {
            unchanged: already_favorite,
            previous_favorite: if already_favorite { None } else { previous },
        })
    }

    async fn favorite_id(&self) -> Option<WorkerId> {
        self.favorite_snapshot()
    }

    async fn connected_ids(&self) -> Vec<WorkerId> {
        self.workers.iter().map(|entry| entry.key().clone()).collect()
    }

    async fn get_worker(&self, id: &WorkerId) -> Option<Worker> {
        self.workers.get(id).map(|entry| entry.worker.clone())
    }

    async fn list_workers(&self) -> Vec<Worker> {
        self.workers.iter().map(|entry| entry.worker.clone()).collect()
    }

    async fn merge_telemetry(&self, id: &WorkerId, data: Value) -> AppResult<()> {
        let Some(mut entry) = self.workers.get_mut(id) else {
            return Err(AppError::WorkerNotFound { id: id.to_string() });
        };
        let Value::Object(map) = data else {
            return Ok(());
        };
        let bag = map.into_iter().collect();
        entry.worker.merge_telemetry(bag);
        Ok(())
    }

    async fn set_status(&self, id: &WorkerId, status: WorkerStatus) -> AppResult<()> {
        let Some(mut entry) = self.workers.get_mut(id) else {
            return Err(AppError::WorkerNotFound { id: id.to_string() });
        };
        entry.worker.status = status;
        Ok(())
    }

    async fn set_preview(&self, id: &WorkerId, preview: Preview) -> AppResult<()> {
        let Some(mut entry) = self.workers.get_mut(id) else {
            return Err(AppError::WorkerNotFound { id: id.to_string() });
        };
        entry.worker.preview = Some(preview);
        Ok(())
    }

    async fn bump_last_preview_timestamp(&self, id: &WorkerId, ts: i64) -> AppResult<()> {
        let Some(mut entry) = self.workers.get_mut(id) else {
            return Err(AppError::WorkerNotFound { id: id.to_string() });
        };
        entry.worker.last_preview_timestamp = ts;
        Ok(())
    }

    async fn clear_preview_state(&self) {
        for mut entry in self.workers.iter_mut() {
            entry.worker.preview = None;
            entry.worker.last_preview_timestamp = 0;
        }
    }

    async fn send_to_slave(&self, id: &WorkerId, msg: Value) -> AppResult<()> {
        let Some(entry) = self.workers.get(id) else {
            return Err(AppError::WorkerNotFound { id: id.to_string() });
        };
        let outbox_sender = entry.outbox.sender.clone();
        let threshold = entry.outbox.compression_threshold_bytes;
        drop(entry);
        let ok = Outbox { sender: outbox_sender, compression_threshold_bytes: threshold }.send(msg).await;
        if !ok {
            self.disconnect_worker(id).await;
        }
        Ok(())
    }

    async fn broadcast_to_ui(&self, msg: Value) -> AppResult<()> {
        let mut dead = Vec::new();
        for entry in self.ui_connections.iter() {
            if !entry.send(msg.clone()).await {
                dead.push(*entry.key());
            }
        }
        for id in dead {
            self.ui_connections.remove(&id);
        }
        Ok(())
    }

    async fn broadcast_to_slaves(
        &self,
        msg: Value,
        ids: Option<HashSet<WorkerId>>,
    ) -> AppResult<()> {
        let targets: Vec<WorkerId> = match ids {
            Some(ids) => ids.into_iter().collect(),
            None => self.connected_ids().await,
        };
        let mut dead = Vec::new();
        for id in targets {
            let Some(entry) = self.workers.get(&id) else {
                continue;
            };
            let sender = entry.outbox.sender.clone();
            let threshold = entry.outbox.compression_threshold_bytes;
            drop(entry);
            let ok = Outbox { sender, compression_threshold_bytes: threshold }.send(msg.clone()).await;
            if !ok {
                dead.push(id);
            }
        }
        for id in dead {
            self.disconnect_worker(&id).await;
        }
        Ok(())
    }

    async fn set_guard_data(&self, filename: String, data: Value) {
        let mut guard = self.guard_data.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Some((filename, data));
    }

    async fn guard_data(&self) -> Option<(String, Value)> {
        self.guard_data.read().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> (WorkerWsConfig, UiWsConfig, usize) {
        (
            WorkerWsConfig {
                broadcast_buffer_size: 100,
                max_connections: None,
                connection_buffer_size: 100,
                drop_newest_on_full_buffer: false,
            },
            UiWsConfig {
                broadcast_buffer_size: 100,
                max_connections: None,
                connection_buffer_size: 100,
                drop_newest_on_full_buffer: false,
            },
            5 * 1024 * 1024,
        )
    }

    #[tokio::test]
    async fn first_connect_auto_elects_favorite() {
        let (worker_ws, ui_ws, threshold) = config();
        let registry = TokioRegistry::new(worker_ws, ui_ws, threshold);
        let a = WorkerId::new("a");
        registry.connect_worker(a.clone()).await.expect("connect");
        assert_eq!(registry.favorite_id().await, Some(a));
    }

    #[tokio::test]
    async fn disconnecting_favorite_reelects_remaining_worker() {
        let (worker_ws, ui_ws, threshold) = config();
        let registry = TokioRegistry::new(worker_ws, ui_ws, threshold);
        let a = WorkerId::new("a");
        let b = WorkerId::new("b");
        registry.connect_worker(a.clone()).await.expect("connect a");
        registry.connect_worker(b.clone()).await.expect("connect b");
        assert_eq!(registry.favorite_id().await, Some(a.clone()));

        let reelected = registry.disconnect_worker(&a).await;
        assert_eq!(reelected, Some(b.clone()));
        assert_eq!(registry.favorite_id().await, Some(b));
    }

    #[tokio::test]
    async fn set_favorite_reports_unchanged_when_already_favorite() {
        let (worker_ws, ui_ws, threshold) = config();
        let registry = TokioRegistry::new(worker_ws, ui_ws, threshold);
        let a = WorkerId::new("a");
        registry.connect_worker(a.clone()).await.expect("connect");

        let outcome = registry.set_favorite(&a).await.expect("set favorite");
        assert!(outcome.unchanged);
    }

    #[tokio::test]
    async fn set_favorite_demotes_previous_favorite() {
        let (worker_ws, ui_ws, threshold) = config();
        let registry = TokioRegistry::new(worker_ws, ui_ws, threshold);
        let a = WorkerId::new("a");
        let b = WorkerId::new("b");
        registry.connect_worker(a.clone()).await.expect("connect a");
        registry.connect_worker(b.clone()).await.expect("connect b");

        registry.set_favorite(&b).await.expect("set favorite");
        assert_eq!(registry.favorite_id().await, Some(b.clone()));
        let worker_a = registry.get_worker(&a).await.expect("worker a");
        assert!(!worker_a.is_favorite);
    }

    #[tokio::test]
    async fn connect_worker_rejects_new_connection_past_limit() {
        let (mut worker_ws, ui_ws, threshold) = config();
        worker_ws.max_connections = Some(1);
        let registry = TokioRegistry::new(worker_ws, ui_ws, threshold);
        registry.connect_worker(WorkerId::new("a")).await.expect("connect a");
        let result = registry.connect_worker(WorkerId::new("b")).await;
        assert!(matches!(result, Err(AppError::ServiceUnavailable)));
    }

    #[test]
    fn attach_ui_channel_returns_none_past_limit() {
        let (worker_ws, mut ui_ws, threshold) = config();
        ui_ws.max_connections = Some(1);
        let registry = TokioRegistry::new(worker_ws, ui_ws, threshold);
        let (tx, _rx) = mpsc::channel(1);
        assert!(registry.attach_ui_channel(tx).is_some());
        let (tx2, _rx2) = mpsc::channel(1);
        assert!(registry.attach_ui_channel(tx2).is_none());
    }
}
