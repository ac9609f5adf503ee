use std::sync::RwLock;

use serde_json::json;
use time::OffsetDateTime;

use domain::guard_config::GuardConfig;
use domain::worker::Preview;

use crate::error::AppResult;
use crate::ports::incoming::guard::GuardConfigUseCase;
use crate::ports::outgoing::registry::DynRegistryPort;

/// Process-wide guard configuration record (C11). The lock is a leaf lock:
/// every read or write takes a snapshot and drops the guard before any
/// `await`, so it is never held across an I/O suspension.
pub struct GuardConfigService {
    config: RwLock<GuardConfig>,
    registry: DynRegistryPort,
}

impl GuardConfigService {
    #[must_use]
    pub fn new(registry: DynRegistryPort) -> Self {
        Self {
            config: RwLock::new(GuardConfig::default()),
            registry,
        }
    }

    /// Synchronous snapshot read, for callers (the orchestrator's main loop)
    /// that already hold no other lock and want to avoid the trait's async
    /// indirection.
    #[must_use]
    pub fn snapshot(&self) -> GuardConfig {
        self.config
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl GuardConfigUseCase for GuardConfigService {
    async fn get(&self) -> GuardConfig {
        self.snapshot()
    }

    /// Merges `partial`, then forwards the merged snapshot to the current
    /// favorite as `guardConfig{config, changed, timestamp}` and broadcasts
    /// `guard_config{config, changed}` to UI connections. HTTP `POST
    /// /guard/config` is the sole caller; every other consumer reads
    /// through [`Self::get`]/[`Self::snapshot`].
    async fn update(&self, partial: GuardConfig) -> AppResult<(GuardConfig, Vec<&'static str>)> {
        let (merged, changed) = {
            let mut guard = self
                .config
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let changed = guard.merge(partial);
            (guard.clone(), changed)
        };

        if let Some(favorite_id) = self.registry.favorite_id().await {
            let payload = json!({
                "type": "guardConfig",
                "config": merged,
                "changed": changed,
                "timestamp": OffsetDateTime::now_utc().unix_timestamp(),
            });
            self.registry.send_to_slave(&favorite_id, payload).await?;
        }

        self.registry
            .broadcast_to_ui(json!({
                "type": "guard_config",
                "config": merged,
                "changed": changed,
            }))
            .await?;

        Ok((merged, changed))
    }

    async fn clear(&self) -> AppResult<()> {
        self.registry.clear_preview_state().await;
        self.registry
            .broadcast_to_ui(json!({ "type": "guard_cleared" }))
            .await
    }

    async fn check(&self) -> AppResult<()> {
        self.send_control("check").await
    }

    async fn repair(&self) -> AppResult<()> {
        self.send_control("repair").await
    }

    async fn preview(&self) -> AppResult<Option<Preview>> {
        let Some(favorite_id) = self.registry.favorite_id().await else {
            return Ok(None);
        };
        Ok(self
            .registry
            .get_worker(&favorite_id)
            .await
            .and_then(|worker| worker.preview))
    }
}

impl GuardConfigService {
    async fn send_control(&self, action: &str) -> AppResult<()> {
        let Some(favorite_id) = self.registry.favorite_id().await else {
            return Ok(());
        };
        self.registry
            .send_to_slave(&favorite_id, json!({ "type": "guardControl", "action": action }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    use domain::color::ColorId;
    use domain::worker::{Worker, WorkerId, WorkerStatus};

    use crate::ports::outgoing::registry::{ConnectOutcome, SetFavoriteOutcome};

    struct NoopRegistry;

    #[async_trait::async_trait]
    impl crate::ports::outgoing::registry::RegistryPort for NoopRegistry {
        async fn connect_worker(&self, _id: WorkerId) -> AppResult<ConnectOutcome> {
            Ok(ConnectOutcome::New)
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
        async fn get_worker(&self, _id: &WorkerId) -> Option<Worker> {
            None
        }
        async fn list_workers(&self) -> Vec<Worker> {
            Vec::new()
        }
        async fn merge_telemetry(&self, _id: &WorkerId, _data: serde_json::Value) -> AppResult<()> {
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
        async fn send_to_slave(&self, _id: &WorkerId, _msg: serde_json::Value) -> AppResult<()> {
            Ok(())
        }
        async fn broadcast_to_ui(&self, _msg: serde_json::Value) -> AppResult<()> {
            Ok(())
        }
        async fn broadcast_to_slaves(
            &self,
            _msg: serde_json::Value,
            _ids: Option<HashSet<WorkerId>>,
        ) -> AppResult<()> {
            Ok(())
        }
        async fn set_guard_data(&self, _filename: String, _data: serde_json::Value) {}
        async fn guard_data(&self) -> Option<(String, serde_json::Value)> {
            None
        }
    }

    fn service() -> GuardConfigService {
        GuardConfigService::new(Arc::new(NoopRegistry))
    }

    #[tokio::test]
    async fn update_merges_and_reports_changed_fields() -> AppResult<()> {
        let service = service();
        let partial = GuardConfig {
            pixels_per_batch: Some(25),
            excluded_color_ids: Some(HashSet::from([ColorId::new(1)])),
            ..GuardConfig::default()
        };

        let (merged, changed) = service.update(partial).await?;
        assert_eq!(merged.pixels_per_batch(), 25);
        assert!(changed.contains(&"pixelsPerBatch"));
        assert!(changed.contains(&"excludedColorIds"));
        Ok(())
    }

    #[tokio::test]
    async fn get_reflects_prior_update() -> AppResult<()> {
        let service = service();
        let partial = GuardConfig {
            protection_pattern: Some("spiral".to_string()),
            ..GuardConfig::default()
        };
        service.update(partial).await?;

        let snapshot = service.get().await;
        assert_eq!(snapshot.protection_pattern(), "spiral");
        Ok(())
    }
}
