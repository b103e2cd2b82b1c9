//! Pure math/data for scroll-axis geometry in Keel
//!
//! This crate contains the geometry primitives and cross-axis alignment
//! helpers that the Keel layout engine works in terms of. It knows nothing
//! about items, sections, or snapshots.

mod alignment;
mod geometry;

pub use alignment::*;
pub use geometry::*;

pub mod prelude {
    pub use crate::alignment::ItemAlignment;
    pub use crate::geometry::{EdgeInsets, Point, Rect, Size};
}
