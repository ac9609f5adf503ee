use serde::Serialize;

use domain::change::{Change, ChangeType};
use domain::color::ColorId;
use domain::coords::Coord;
use domain::worker::{Preview, TelemetryBag, Worker, WorkerId, WorkerStatus};

/// Uniform envelope for every JSON response on the HTTP surface.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub fn success() -> Self {
        Self {
            ok: true,
            error: None,
            data: None,
        }
    }

    #[must_use]
    pub fn success_with_data(data: T) -> Self {
        Self {
            ok: true,
            error: None,
            data: Some(data),
        }
    }
}

/// Wire shape for [`Change`]. Domain's `Change` has no struct-level
/// `rename_all`, so it would serialize `expected_color` verbatim; every other
/// outbound path on this surface is camelCase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeResponse {
    pub coord: Coord,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    pub expected_color: Option<ColorId>,
}

impl From<Change> for ChangeResponse {
    fn from(change: Change) -> Self {
        Self {
            coord: change.coord,
            change_type: change.change_type,
            expected_color: change.expected_color,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub changes: Vec<ChangeResponse>,
    pub available_colors: Option<Vec<ColorId>>,
    pub detailed: bool,
}

impl From<Preview> for PreviewResponse {
    fn from(preview: Preview) -> Self {
        Self {
            changes: preview.changes.into_iter().map(ChangeResponse::from).collect(),
            available_colors: preview.available_colors,
            detailed: preview.detailed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResponse {
    pub id: WorkerId,
    pub connected_at: time::OffsetDateTime,
    pub last_seen: time::OffsetDateTime,
    pub status: WorkerStatus,
    pub telemetry: TelemetryBag,
    pub preview: Option<PreviewResponse>,
    pub last_preview_timestamp: i64,
    pub is_favorite: bool,
}

impl From<Worker> for WorkerResponse {
    fn from(worker: Worker) -> Self {
        Self {
            id: worker.id,
            connected_at: worker.connected_at,
            last_seen: worker.last_seen,
            status: worker.status,
            telemetry: worker.telemetry,
            preview: worker.preview.map(PreviewResponse::from),
            last_preview_timestamp: worker.last_preview_timestamp,
            is_favorite: worker.is_favorite,
        }
    }
}
