use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::change::Change;
use crate::color::ColorId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub String);

impl WorkerId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Idle,
    Working,
    Error,
}

/// Free-form telemetry bag reported by a worker. The orchestrator only reads
/// `remaining_charges` and `preview_data` out of it; every other field is
/// opaque and forwarded to UI clients verbatim.
pub type TelemetryBag = HashMap<String, Value>;

/// The favorite's last reported differential against the guard data.
///
/// A preview is *detailed* iff its change list is non-empty and the first
/// element carries an `x` coordinate. Non-detailed previews never overwrite a
/// previously stored detailed preview (see [`Preview::should_replace`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preview {
    pub changes: Vec<Change>,
    pub available_colors: Option<Vec<ColorId>>,
    pub detailed: bool,
}

impl Preview {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Detailed beats stale; between two previews of equal quality the
    /// newest one wins. This prevents a transient empty preview from wiping
    /// out a previously useful one.
    #[must_use]
    pub fn should_replace(current: Option<&Preview>, incoming: &Preview) -> bool {
        match current {
            None => true,
            Some(existing) => incoming.detailed || !existing.detailed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub connected_at: time::OffsetDateTime,
    pub last_seen: time::OffsetDateTime,
    pub status: WorkerStatus,
    pub telemetry: TelemetryBag,
    pub preview: Option<Preview>,
    pub last_preview_timestamp: i64,
    pub is_favorite: bool,
}

impl Worker {
    #[must_use]
    pub fn new(id: WorkerId, now: time::OffsetDateTime) -> Self {
        Self {
            id,
            connected_at: now,
            last_seen: now,
            status: WorkerStatus::Idle,
            telemetry: TelemetryBag::new(),
            preview: None,
            last_preview_timestamp: 0,
            is_favorite: false,
        }
    }

    /// `max(0, int(remaining_charges))`, defaulting to 0 on a missing or
    /// malformed field.
    #[must_use]
    pub fn remaining_charges(&self) -> i64 {
        self.telemetry
            .get("remaining_charges")
            .and_then(Value::as_i64)
            .unwrap_or(0)
            .max(0)
    }

    /// Merge an incoming telemetry bag per the §3 merge rule: a `previewData`
    /// key with no sibling `preview_data` is renamed first, and every field
    /// except `preview_data` unconditionally overwrites the stored value.
    /// `preview_data` itself is handled separately by the preview service,
    /// since it must obey the detailed-vs-stale replacement rule.
    pub fn merge_telemetry(&mut self, mut incoming: TelemetryBag) {
        if !incoming.contains_key("preview_data") {
            if let Some(renamed) = incoming.remove("previewData") {
                incoming.insert("preview_data".to_string(), renamed);
            }
        }
        incoming.remove("preview_data");
        for (key, value) in incoming {
            self.telemetry.insert(key, value);
        }
    }
}
