use std::time::Duration;

use serde_json::json;

use domain::worker::{Preview, WorkerId};

use crate::error::AppResult;
use crate::ports::outgoing::registry::DynRegistryPort;

/// Freshness handshake with the favorite worker (C5).
pub struct PreviewProtocol {
    registry: DynRegistryPort,
}

impl PreviewProtocol {
    #[must_use]
    pub fn new(registry: DynRegistryPort) -> Self {
        Self { registry }
    }

    /// Full handshake: 20 polls at 250ms, a 5s budget.
    pub async fn refresh(&self, favorite_id: &WorkerId) -> AppResult<()> {
        self.handshake(favorite_id, 20, Duration::from_millis(250)).await
    }

    /// Shortened handshake backing the favorite-analysis branch of the
    /// repair distribution service: 10 polls at 300ms, a 3s budget.
    pub async fn refresh_short(&self, favorite_id: &WorkerId) -> AppResult<()> {
        self.handshake(favorite_id, 10, Duration::from_millis(300)).await
    }

    async fn handshake(
        &self,
        favorite_id: &WorkerId,
        polls: u32,
        interval: Duration,
    ) -> AppResult<()> {
        let old_ts = self
            .registry
            .get_worker(favorite_id)
            .await
            .map_or(0, |worker| worker.last_preview_timestamp);

        self.registry
            .send_to_slave(
                favorite_id,
                json!({ "type": "guardControl", "action": "check" }),
            )
            .await?;

        for _ in 0..polls {
            tokio::time::sleep(interval).await;
            let newer = self
                .registry
                .get_worker(favorite_id)
                .await
                .is_some_and(|worker| worker.last_preview_timestamp > old_ts);
            if newer {
                return Ok(());
            }
        }
        // The caller tolerates a stale read if the favorite never responded.
        Ok(())
    }

    /// Reads `preview_data` from the favorite's telemetry bag. May still be
    /// the old value if the worker failed to respond to the handshake.
    pub async fn read(&self, favorite_id: &WorkerId) -> Option<Preview> {
        self.registry
            .get_worker(favorite_id)
            .await
            .and_then(|worker| worker.preview)
    }
}
