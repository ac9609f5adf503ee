use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Integer color identifier as reported by a worker's reference data.
/// Unlike a fixed palette index this is an open-ended id (the canvas'
/// color space is whatever the guard data declares it to be).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorId(pub i64);

impl ColorId {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ColorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ColorId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ColorId> for i64 {
    fn from(color_id: ColorId) -> Self {
        color_id.0
    }
}

/// A set of color ids used for the `preferColor`/`excludeColor` guard filters.
pub type ColorIdSet = HashSet<ColorId>;
