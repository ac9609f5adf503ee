use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::color::ColorId;
use crate::coords::Coord;
use crate::worker::WorkerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `"tileX,tileY:firstX,firstY"` or `"tileX,tileY:empty"` when the payload
/// carries no coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchKey(pub String);

impl BatchKey {
    #[must_use]
    pub fn from_payload(tile_x: i32, tile_y: i32, coords: &[Coord]) -> Self {
        match coords.first() {
            Some(first) => Self(format!("{tile_x},{tile_y}:{},{}", first.x, first.y)),
            None => Self(format!("{tile_x},{tile_y}:empty")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Pending,
    Ok,
    Failed,
}

/// One `paintBatch` dispatched to one worker, tracked by the batch tracker
/// (C2) until it resolves or exhausts its retry budget.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub slave_id: WorkerId,
    pub batch_key: BatchKey,
    pub tile_x: i32,
    pub tile_y: i32,
    pub coords: Vec<Coord>,
    pub colors: Vec<ColorId>,
    pub attempts: u32,
    pub status: AssignmentStatus,
}

impl Assignment {
    #[must_use]
    pub fn new(
        slave_id: WorkerId,
        tile_x: i32,
        tile_y: i32,
        coords: Vec<Coord>,
        colors: Vec<ColorId>,
        attempt: u32,
    ) -> Self {
        let batch_key = BatchKey::from_payload(tile_x, tile_y, &coords);
        Self {
            slave_id,
            batch_key,
            tile_x,
            tile_y,
            coords,
            colors,
            attempts: attempt,
            status: AssignmentStatus::Pending,
        }
    }
}
