//! The host-facing capability contract.
//!
//! The hosting scroll surface implements [`LayoutDelegate`] and passes it
//! by reference into the calls that build or rebuild model state. The
//! engine queries it synchronously and never retains it.

use keel_geometry::{ItemAlignment, Rect};

use crate::model::SizeMode;
use crate::path::{ElementKind, ItemPath};

/// Resolved presentation of one element, the unit animations work in.
///
/// `frame` is in content coordinates; `alpha` is the element's opacity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElementAttributes {
    pub frame: Rect,
    pub alpha: f32,
}

impl ElementAttributes {
    pub fn new(frame: Rect) -> Self {
        Self { frame, alpha: 1.0 }
    }
}

/// Host hooks consumed by the engine.
///
/// `number_of_sections`/`number_of_items` describe the data source;
/// the per-element queries describe presentation policy. The appear and
/// disappear hooks customize the synthetic endpoint attributes used to
/// animate inserted and deleted elements; the default appear transform is
/// zero opacity at the element's final position, and the default
/// disappear transform is zero opacity at its last known position.
pub trait LayoutDelegate {
    fn number_of_sections(&self) -> usize;

    fn number_of_items(&self, section: usize) -> usize;

    fn has_header(&self, _section: usize) -> bool {
        false
    }

    fn has_footer(&self, _section: usize) -> bool {
        false
    }

    /// Sizing discipline for the element at `path`.
    fn size_mode(&self, _kind: ElementKind, _path: ItemPath) -> SizeMode {
        SizeMode::Estimated(None)
    }

    /// Cross-axis placement for the element at `path`.
    fn alignment(&self, _kind: ElementKind, _path: ItemPath) -> ItemAlignment {
        ItemAlignment::Fill
    }

    /// Per-section override of the engine-wide inter-item spacing.
    fn inter_item_spacing(&self, _section: usize) -> Option<f32> {
        None
    }

    /// Per-section override of the engine-wide inter-section spacing.
    fn inter_section_spacing(&self, _section: usize) -> Option<f32> {
        None
    }

    /// Customize the initial attributes of an element being inserted.
    fn configure_appearing(
        &self,
        _kind: ElementKind,
        _path: ItemPath,
        _attributes: &mut ElementAttributes,
    ) {
    }

    /// Customize the final attributes of an element being deleted.
    fn configure_disappearing(
        &self,
        _kind: ElementKind,
        _path: ItemPath,
        _attributes: &mut ElementAttributes,
    ) {
    }
}
