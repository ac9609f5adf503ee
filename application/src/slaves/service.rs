use std::sync::Arc;

use serde_json::json;

use domain::color::ColorId;
use domain::coords::Coord;
use domain::worker::{Worker, WorkerId};

use crate::error::{AppError, AppResult};
use crate::ports::incoming::slaves::SlavesUseCase;
use crate::ports::outgoing::registry::{DynRegistryPort, SetFavoriteOutcome};

/// Thin wrapper over the connection registry backing the worker-listing,
/// favorite-election, and ad-hoc paint HTTP endpoints (§6). Unlike the
/// orchestrator's dispatch pipeline, a single ad-hoc paint batch is sent
/// as one untiled message and is not registered with the batch tracker —
/// there is no session or retry loop to reconcile it against.
pub struct SlavesService {
    registry: DynRegistryPort,
}

impl SlavesService {
    #[must_use]
    pub fn new(registry: DynRegistryPort) -> Self {
        Self { registry }
    }
}

#[async_trait::async_trait]
impl SlavesUseCase for SlavesService {
    async fn list(&self) -> Vec<Worker> {
        self.registry.list_workers().await
    }

    async fn set_favorite(&self, id: &WorkerId) -> AppResult<SetFavoriteOutcome> {
        self.registry.set_favorite(id).await
    }

    async fn paint(&self, id: &WorkerId, coords: Vec<Coord>, colors: Vec<ColorId>) -> AppResult<()> {
        if coords.len() != colors.len() {
            return Err(AppError::ValidationError {
                message: "coords and colors must have the same length".to_string(),
            });
        }
        if coords.is_empty() {
            return Ok(());
        }
        if self.registry.get_worker(id).await.is_none() {
            return Err(AppError::WorkerNotFound { id: id.to_string() });
        }

        let payload = json!({
            "type": "paintBatch",
            "coords": coords,
            "colors": colors,
            "batchSize": coords.len(),
        });
        self.registry.send_to_slave(id, payload).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use domain::worker::{Preview, WorkerStatus};
    use serde_json::Value;

    use super::*;

    #[derive(Default)]
    struct FakeRegistry {
        workers: Mutex<Vec<Worker>>,
        sent: Mutex<Vec<(WorkerId, Value)>>,
    }

    #[async_trait::async_trait]
    impl crate::ports::outgoing::registry::RegistryPort for FakeRegistry {
        async fn connect_worker(
            &self,
            _id: WorkerId,
        ) -> AppResult<crate::ports::outgoing::registry::ConnectOutcome> {
            unimplemented!()
        }
        async fn disconnect_worker(&self, _id: &WorkerId) -> Option<WorkerId> {
            None
        }
        async fn set_favorite(&self, _id: &WorkerId) -> AppResult<SetFavoriteOutcome> {
            Ok(SetFavoriteOutcome { unchanged: false, previous_favorite: None })
        }
        async fn favorite_id(&self) -> Option<WorkerId> {
            None
        }
        async fn connected_ids(&self) -> Vec<WorkerId> {
            Vec::new()
        }
        async fn get_worker(&self, id: &WorkerId) -> Option<Worker> {
            self.workers
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .iter()
                .find(|w| &w.id == id)
                .cloned()
        }
        async fn list_workers(&self) -> Vec<Worker> {
            self.workers
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        }
        async fn merge_telemetry(&self, _id: &WorkerId, _data: Value) -> AppResult<()> {
            Ok(())
        }
        async fn set_status(&self, _id: &WorkerId, _status: WorkerStatus) -> AppResult<()> {
            Ok(())
        }
        async fn set_preview(&self, _id: &WorkerId, _preview: Preview) -> AppResult<()> {
            Ok(())
        }
        async fn bump_last_preview_timestamp(&self, _id: &WorkerId, _ts: i64) -> AppResult<()> {
            Ok(())
        }
        async fn clear_preview_state(&self) {}
        async fn send_to_slave(&self, id: &WorkerId, msg: Value) -> AppResult<()> {
            self.sent
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push((id.clone(), msg));
            Ok(())
        }
        async fn broadcast_to_ui(&self, _msg: Value) -> AppResult<()> {
            Ok(())
        }
        async fn broadcast_to_slaves(
            &self,
            _msg: Value,
            _ids: Option<HashSet<WorkerId>>,
        ) -> AppResult<()> {
            Ok(())
        }
        async fn set_guard_data(&self, _filename: String, _data: Value) {}
        async fn guard_data(&self) -> Option<(String, Value)> {
            None
        }
    }

    fn worker(id: &str) -> Worker {
        Worker::new(WorkerId::new(id), time::OffsetDateTime::now_utc())
    }

    #[tokio::test]
    async fn paint_rejects_mismatched_lengths() {
        let registry: DynRegistryPort = Arc::new(FakeRegistry::default());
        let service = SlavesService::new(registry);
        let err = service
            .paint(&WorkerId::new("w1"), vec![Coord { x: 0, y: 0 }], vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn paint_rejects_unknown_worker() {
        let registry: DynRegistryPort = Arc::new(FakeRegistry::default());
        let service = SlavesService::new(registry);
        let err = service
            .paint(&WorkerId::new("ghost"), vec![Coord { x: 1, y: 1 }], vec![ColorId(2)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WorkerNotFound { .. }));
    }

    #[tokio::test]
    async fn paint_sends_untiled_batch_to_known_worker() {
        let fake = Arc::new(FakeRegistry::default());
        fake.workers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(worker("w1"));
        let registry: DynRegistryPort = fake.clone();
        let service = SlavesService::new(registry);
        service
            .paint(&WorkerId::new("w1"), vec![Coord { x: 1, y: 1 }], vec![ColorId(2)])
            .await
            .unwrap();
        let sent = fake.sent.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1["type"], "paintBatch");
    }
}
