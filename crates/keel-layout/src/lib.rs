//! Incremental, self-sizing list layout engine.
//!
//! Keel computes the on-screen geometry of every row in a long, vertically
//! scrolling list of variable-height items. It keeps two parallel views of
//! the list across a mutation batch (the structure before and after the
//! pending transaction) so insert/delete/move animations can resolve both
//! endpoints of every affected element, absorbs late-arriving measured
//! sizes without visually jumping the content, and answers visible-rect
//! queries in time proportional to what is visible.
//!
//! The engine is headless: a hosting scroll surface implements
//! [`LayoutDelegate`], feeds viewport geometry and change batches into
//! [`ListLayout`], and applies the compensating scroll offsets it gets
//! back.

pub mod collections;

mod anchor;
mod changes;
mod delegate;
mod engine;
mod invalidation;
mod model;
mod path;
mod reestimate;
mod resolver;
mod settings;
mod snapshot;
mod transaction;

pub use anchor::{PositionAnchor, VerticalEdge};
pub use changes::ChangeOperation;
pub use delegate::{ElementAttributes, LayoutDelegate};
pub use engine::ListLayout;
pub use invalidation::CompensationDelta;
pub use model::{ItemId, ItemModel, MeasureMode, SectionId, SectionModel, SizeMode};
pub use path::{ElementKind, ElementRef, ItemPath};
pub use settings::{LayoutSettings, DEFAULT_ITEM_HEIGHT_ESTIMATE};
pub use snapshot::{LayoutSnapshot, SnapshotTag};
pub use transaction::TransactionPhase;

pub mod prelude {
    pub use crate::anchor::{PositionAnchor, VerticalEdge};
    pub use crate::changes::ChangeOperation;
    pub use crate::delegate::{ElementAttributes, LayoutDelegate};
    pub use crate::engine::ListLayout;
    pub use crate::invalidation::CompensationDelta;
    pub use crate::model::{ItemId, SizeMode};
    pub use crate::path::{ElementKind, ElementRef, ItemPath};
    pub use crate::settings::LayoutSettings;
    pub use crate::snapshot::SnapshotTag;
}
