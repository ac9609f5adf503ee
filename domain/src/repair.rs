use serde::{Deserialize, Serialize};

use crate::color::ColorId;
use crate::coords::Coord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepairPriority {
    High,
    Medium,
    Low,
}

impl Default for RepairPriority {
    fn default() -> Self {
        Self::Low
    }
}

/// One pixel supplied by an external caller to the repair distribution
/// service. Distinct from [`crate::change::Change`]: it has no
/// `expectedColor`, only a plain `color` fallback, since it did not come
/// from a preview diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairPixel {
    pub coord: Coord,
    pub color: Option<ColorId>,
    #[serde(default)]
    pub priority: RepairPriority,
}

impl RepairPixel {
    #[must_use]
    pub fn color_or_default(&self) -> ColorId {
        self.color.unwrap_or(ColorId::new(0))
    }
}
