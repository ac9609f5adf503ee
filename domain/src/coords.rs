use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DomainError, DomainResult};

/// Side length, in pixels, of a single dispatch tile.
pub const TILE: i32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    #[must_use]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.x, self.y)
    }
}

/// A global pixel coordinate on the shared canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    #[must_use]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if !(-10_000_000..=10_000_000).contains(&self.x) || !(-10_000_000..=10_000_000).contains(&self.y) {
            return Err(DomainError::InvalidCoordinates(format!(
                "coordinate ({}, {}) out of representable range",
                self.x, self.y
            )));
        }
        Ok(())
    }

    /// The `TILE`x`TILE` dispatch tile this coordinate falls into, per the
    /// `(x div TILE, y div TILE)` grouping rule.
    #[must_use]
    pub fn tile(&self) -> TileCoord {
        TileCoord::new(self.x.div_euclid(TILE), self.y.div_euclid(TILE))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
