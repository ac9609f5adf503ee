use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use uuid::Uuid;

use domain::batch::RequestId;
use domain::change::{Change, ChangeType};
use domain::color::ColorId;
use domain::coords::Coord;
use domain::worker::{Preview, WorkerId, WorkerStatus};

use crate::batch_tracker::service::BatchTrackerService;
use crate::error::AppResult;
use crate::guard_config::service::GuardConfigService;
use crate::lockout::service::LockoutService;
use crate::ports::incoming::ingress::IngressUseCase;
use crate::ports::outgoing::registry::DynRegistryPort;

/// Demultiplexes inbound worker messages by `type` (C10). Unknown types are
/// logged and dropped; a malformed payload degrades to a no-op rather than
/// an error, per the data malformation policy.
pub struct IngressRouter {
    registry: DynRegistryPort,
    lockout: Arc<LockoutService>,
    batch_tracker: Arc<BatchTrackerService>,
    guard_config: Arc<GuardConfigService>,
}

impl IngressRouter {
    #[must_use]
    pub fn new(
        registry: DynRegistryPort,
        lockout: Arc<LockoutService>,
        batch_tracker: Arc<BatchTrackerService>,
        guard_config: Arc<GuardConfigService>,
    ) -> Self {
        Self {
            registry,
            lockout,
            batch_tracker,
            guard_config,
        }
    }

    async fn handle_telemetry(&self, worker_id: &WorkerId, message: &Value) -> AppResult<()> {
        let Some(data) = message.get("data").and_then(Value::as_object).cloned() else {
            return Ok(());
        };
        self.registry.merge_telemetry(worker_id, Value::Object(data)).await?;
        let telemetry = self
            .registry
            .get_worker(worker_id)
            .await
            .map(|worker| worker.telemetry)
            .unwrap_or_default();
        self.registry
            .broadcast_to_ui(json!({
                "type": "telemetry_update",
                "slave_id": worker_id,
                "telemetry": telemetry,
            }))
            .await
    }

    async fn handle_status(&self, worker_id: &WorkerId, message: &Value) -> AppResult<()> {
        let Some(raw) = message.get("status").and_then(Value::as_str) else {
            return Ok(());
        };
        let status = match raw {
            "idle" => WorkerStatus::Idle,
            "working" => WorkerStatus::Working,
            "error" => WorkerStatus::Error,
            _ => return Ok(()),
        };
        self.registry.set_status(worker_id, status).await?;
        self.registry
            .broadcast_to_ui(json!({
                "type": "status_update",
                "slave_id": worker_id,
                "status": raw,
            }))
            .await
    }

    async fn handle_preview_data(&self, worker_id: &WorkerId, message: &Value) -> AppResult<()> {
        let is_favorite = self
            .registry
            .get_worker(worker_id)
            .await
            .is_some_and(|worker| worker.is_favorite);
        if !is_favorite {
            return Ok(());
        }

        let data = message.get("data").cloned().unwrap_or(Value::Null);
        let incoming = parse_preview(&data);
        let current = self.registry.get_worker(worker_id).await.and_then(|worker| worker.preview);
        if Preview::should_replace(current.as_ref(), &incoming) {
            self.registry.set_preview(worker_id, incoming).await?;
        }

        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.registry.bump_last_preview_timestamp(worker_id, now).await?;
        self.lockout.prune_expired(now);

        self.registry
            .broadcast_to_ui(json!({
                "type": "preview_data",
                "slave_id": worker_id,
                "data": data,
            }))
            .await
    }

    async fn rebroadcast_with_slave_id(&self, worker_id: &WorkerId, message: Value) -> AppResult<()> {
        let mut payload = message;
        if let Some(object) = payload.as_object_mut() {
            object.insert("slave_id".to_string(), json!(worker_id));
        }
        self.registry.broadcast_to_ui(payload).await
    }

    async fn handle_paint_progress(&self, worker_id: &WorkerId, message: Value) -> AppResult<()> {
        let mut payload = message;
        if let Some(object) = payload.as_object_mut() {
            let total = object.get("total").cloned().or_else(|| object.get("batchSize").cloned());
            if let Some(total) = total {
                object.insert("total".to_string(), total);
            } else {
                object.insert("total".to_string(), json!(0));
            }
            object
                .entry("completed".to_string())
                .or_insert_with(|| json!(0));
            let is_favorite = self
                .registry
                .get_worker(worker_id)
                .await
                .is_some_and(|worker| worker.is_favorite);
            object.insert("is_favorite".to_string(), json!(is_favorite));
        }
        self.rebroadcast_with_slave_id(worker_id, payload).await
    }

    async fn handle_paint_result(&self, worker_id: &WorkerId, message: Value) -> AppResult<()> {
        let Some(request_id) = message
            .get("requestId")
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .map(RequestId)
        else {
            return Ok(());
        };
        let tile_x = as_i32(&message, "tileX");
        let tile_y = as_i32(&message, "tileY");
        let ok = message.get("ok").and_then(Value::as_bool).unwrap_or(false);
        let coords: Vec<Coord> = message
            .get("coords")
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default();

        self.batch_tracker.mark(request_id, worker_id, tile_x, tile_y, &coords, ok).await;

        if ok && !coords.is_empty() {
            let now = OffsetDateTime::now_utc().unix_timestamp();
            let ttl = self.guard_config.snapshot().recent_lock_seconds();
            self.lockout.mark(&coords, now, u64::try_from(ttl).unwrap_or(0));
        }

        self.rebroadcast_with_slave_id(worker_id, message).await
    }
}

fn as_i32(message: &Value, field: &str) -> i32 {
    message
        .get(field)
        .and_then(Value::as_i64)
        .and_then(|value| i32::try_from(value).ok())
        .unwrap_or(0)
}

#[derive(Deserialize)]
struct WireChange {
    x: Option<i32>,
    y: Option<i32>,
    #[serde(rename = "type", default)]
    change_type: Option<ChangeType>,
    #[serde(default)]
    color: Option<ColorId>,
    #[serde(rename = "expectedColor", default)]
    expected_color: Option<ColorId>,
}

/// Wire previews carry flat `x`/`y` fields per change, unlike the nested
/// `coord` object the domain type uses internally. A preview is *detailed*
/// iff the raw change list is non-empty and its first entry carries an `x`
/// key, independent of whether every entry parses cleanly.
fn parse_preview(data: &Value) -> Preview {
    let raw_changes = data.get("changes").and_then(Value::as_array).cloned().unwrap_or_default();

    let changes: Vec<Change> = raw_changes
        .iter()
        .filter_map(|entry| {
            let wire: WireChange = serde_json::from_value(entry.clone()).ok()?;
            let x = wire.x?;
            let y = wire.y?;
            let change_type = wire.change_type.unwrap_or(ChangeType::Missing);
            let expected_color = wire.expected_color.or(wire.color);
            Some(Change::new(Coord::new(x, y), change_type, expected_color))
        })
        .collect();

    let detailed = raw_changes.first().is_some_and(|entry| entry.get("x").is_some());

    let available_colors = data
        .get("availableColors")
        .cloned()
        .and_then(|value| serde_json::from_value::<Vec<ColorId>>(value).ok());

    Preview {
        changes,
        available_colors,
        detailed,
    }
}

#[async_trait::async_trait]
impl IngressUseCase for IngressRouter {
    async fn handle(&self, worker_id: &WorkerId, message: Value) -> AppResult<()> {
        let Some(message_type) = message.get("type").and_then(Value::as_str).map(str::to_owned) else {
            return Ok(());
        };
        match message_type.as_str() {
            "telemetry" => self.handle_telemetry(worker_id, &message).await,
            "status" => self.handle_status(worker_id, &message).await,
            "preview_data" => self.handle_preview_data(worker_id, &message).await,
            "repair_suggestion" | "repair_ack" | "repair_progress" | "repair_complete" | "repair_error" => {
                self.rebroadcast_with_slave_id(worker_id, message).await
            }
            "paint_progress" => self.handle_paint_progress(worker_id, message).await,
            "paint_result" => self.handle_paint_result(worker_id, message).await,
            other => {
                tracing::debug!(%worker_id, message_type = other, "dropping unknown worker message type");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detailed_preview_parses_flat_coordinates() {
        let data = json!({
            "changes": [
                { "x": 1, "y": 2, "type": "missing", "color": 5 },
                { "x": 3, "y": 4, "type": "incorrect", "expectedColor": 6 },
            ],
        });
        let preview = parse_preview(&data);
        assert!(preview.detailed);
        assert_eq!(preview.changes.len(), 2);
        assert_eq!(preview.changes.first().map(|c| c.expected_color), Some(Some(ColorId::new(5))));
    }

    #[test]
    fn non_detailed_preview_has_no_coordinates() {
        let data = json!({ "changes": [{ "count": 12 }] });
        let preview = parse_preview(&data);
        assert!(!preview.detailed);
        assert!(preview.changes.is_empty());
    }

    #[test]
    fn empty_changes_are_not_detailed() {
        let preview = parse_preview(&json!({ "changes": [] }));
        assert!(!preview.detailed);
    }

    #[test]
    fn malformed_entries_are_dropped_individually() {
        let data = json!({
            "changes": [
                { "x": 1, "y": 2, "type": "missing" },
                { "y": 9 },
            ],
        });
        let preview = parse_preview(&data);
        assert!(preview.detailed);
        assert_eq!(preview.changes.len(), 1);
    }
}
