use serde::{Deserialize, Serialize};

use crate::color::ColorId;
use crate::coords::Coord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Missing,
    Absent,
    Incorrect,
    Correct,
}

impl ChangeType {
    /// Missing/absent/incorrect changes are eligible for repair; missing and
    /// incorrect are treated identically for prioritisation purposes.
    #[must_use]
    pub fn is_repairable(self) -> bool {
        matches!(self, Self::Missing | Self::Absent | Self::Incorrect)
    }

    #[must_use]
    pub fn is_missing_or_incorrect(self) -> bool {
        matches!(self, Self::Missing | Self::Incorrect)
    }
}

/// One pixel diff between the canvas and the reference ("guard") data.
/// Ephemeral — changes exist only within a single orchestrator round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub coord: Coord,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    #[serde(alias = "color")]
    pub expected_color: Option<ColorId>,
}

impl Change {
    #[must_use]
    pub fn new(coord: Coord, change_type: ChangeType, expected_color: Option<ColorId>) -> Self {
        Self {
            coord,
            change_type,
            expected_color,
        }
    }

    #[must_use]
    pub fn is_repairable(&self) -> bool {
        self.change_type.is_repairable()
    }

    /// Color used when dispatching a paint batch: `expectedColor ?? color ?? 0`.
    #[must_use]
    pub fn color_or_default(&self) -> ColorId {
        self.expected_color.unwrap_or(ColorId::new(0))
    }
}
