//! Grid domain types.
//!
//! Cells are keyed by `(x, y)` and carry an owner soul and a palette color.
//! Storage lives in `storage::pixels`; this module only defines the values
//! that cross the HTTP and storage boundaries.

pub mod palette;
pub mod types;

pub use palette::{Color, UnknownColor};
pub use types::{Pixel, PixelPosition};
