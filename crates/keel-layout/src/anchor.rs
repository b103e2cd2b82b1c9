//! Scroll-position anchors.
//!
//! An anchor captures "this element's edge sits this many pixels from the
//! visible boundary" so the host can put the user's visual reference point
//! back after an invalidation that is not a simple height difference, a
//! full relayout for example. Anchors are created on demand and consumed
//! exactly once; the restore consumes the value.

use keel_geometry::Rect;

use crate::model::ItemId;
use crate::path::ElementKind;

/// Which content edge the anchor is measured against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerticalEdge {
    Top,
    Bottom,
}

/// A captured (element, edge, pixel-offset) triple.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionAnchor {
    id: ItemId,
    kind: ElementKind,
    edge: VerticalEdge,
    /// Signed distance from the visible window's edge to the element's
    /// matching edge at capture time.
    offset: f32,
}

impl PositionAnchor {
    pub(crate) fn capture(
        id: ItemId,
        kind: ElementKind,
        edge: VerticalEdge,
        frame: &Rect,
        visible: &Rect,
    ) -> Self {
        let offset = match edge {
            VerticalEdge::Top => frame.min_y() - visible.min_y(),
            VerticalEdge::Bottom => frame.max_y() - visible.max_y(),
        };
        Self {
            id,
            kind,
            edge,
            offset,
        }
    }

    pub fn item(&self) -> ItemId {
        self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn edge(&self) -> VerticalEdge {
        self.edge
    }

    /// New scroll top that puts the anchored edge back at its captured
    /// screen position, given the element's current frame.
    pub(crate) fn restore(self, frame: &Rect, visible_height: f32) -> f32 {
        match self.edge {
            VerticalEdge::Top => frame.min_y() - self.offset,
            VerticalEdge::Bottom => frame.max_y() - self.offset - visible_height,
        }
    }
}
