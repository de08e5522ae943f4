//! Grid cell types.

use serde::{Deserialize, Serialize};

use crate::grid::palette::Color;

/// A coordinate on the grid. Negative values are rejected before storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPosition {
    pub x: i64,
    pub y: i64,
}

impl PixelPosition {
    pub fn is_valid(&self) -> bool {
        self.x >= 0 && self.y >= 0
    }
}

/// A stored cell and its current owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pixel {
    pub x: i64,
    pub y: i64,
    pub color: Color,
    pub soul_id: i64,
}
