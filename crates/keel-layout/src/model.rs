//! Item and section models.
//!
//! These are plain data: one [`ItemModel`] per renderable unit (cell,
//! header, or footer) and one [`SectionModel`] per ordered group of items.
//! All behavior beyond size bookkeeping lives in the resolver and the
//! sizing coordinator.

use keel_geometry::{ItemAlignment, Size};

use crate::path::ElementKind;

/// Mutation-stable identity of an item. Survives moves, reloads, and
/// reconfigures; never reused within one engine instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub(crate) u64);

impl ItemId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Mutation-stable identity of a section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(pub(crate) u64);

impl SectionId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// How the host wants an element sized, as answered by the delegate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SizeMode {
    /// Authoritative from the start; measurement reports are ignored.
    Exact(Size),
    /// Estimate now, authoritative once the rendered cell reports its real
    /// size. `None` lets the engine pick an estimate (running average of
    /// measured heights, then the configured default).
    Estimated(Option<Size>),
    /// Like `Estimated`, but every item sharing `row` within the section is
    /// committed at the height of the tallest member.
    EstimatedStretchToRow {
        estimate: Option<Size>,
        row: u32,
    },
}

/// The sizing discipline retained on the item after the delegate's
/// [`SizeMode`] answer has been resolved against engine defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeasureMode {
    Exact,
    Estimated,
    StretchToRow(u32),
}

/// One renderable unit with its size bookkeeping.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemModel {
    pub id: ItemId,
    pub measure: MeasureMode,
    /// Size assumed until a measurement arrives.
    pub estimated_size: Size,
    /// Authoritative size once set. Cleared only by an explicit reload.
    pub calculated_size: Option<Size>,
    pub alignment: ItemAlignment,
    /// Spacing applied after this element along the scroll axis.
    pub spacing_after: f32,
}

impl ItemModel {
    /// The size the resolver should lay the item out at right now.
    #[inline]
    pub fn size(&self) -> Size {
        self.calculated_size.unwrap_or(self.estimated_size)
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.size().height
    }

    #[inline]
    pub fn is_exact(&self) -> bool {
        self.measure == MeasureMode::Exact
    }

    /// Row group for stretch-to-tallest items, `None` otherwise.
    #[inline]
    pub fn row(&self) -> Option<u32> {
        match self.measure {
            MeasureMode::StretchToRow(row) => Some(row),
            _ => None,
        }
    }

    pub(crate) fn set_calculated(&mut self, size: Size) {
        self.calculated_size = Some(size);
    }
}

/// Source of fresh identities. Monotonic, so an id observed once can never
/// come back attached to a different element.
#[derive(Debug, Default)]
pub(crate) struct IdAllocator {
    next_item: u64,
    next_section: u64,
}

impl IdAllocator {
    pub fn item_id(&mut self) -> ItemId {
        let id = ItemId(self.next_item);
        self.next_item += 1;
        id
    }

    pub fn section_id(&mut self) -> SectionId {
        let id = SectionId(self.next_section);
        self.next_section += 1;
        id
    }
}

/// Ordered group of items with optional header/footer and trailing spacing.
#[derive(Clone, Debug, PartialEq)]
pub struct SectionModel {
    pub id: SectionId,
    pub header: Option<ItemModel>,
    pub footer: Option<ItemModel>,
    pub items: Vec<ItemModel>,
    /// Inter-section spacing applied after this section.
    pub spacing_after: f32,
}

impl SectionModel {
    /// True when the section occupies no space at all.
    pub fn is_empty(&self) -> bool {
        self.header.is_none() && self.footer.is_none() && self.items.is_empty()
    }

    pub fn cell_count(&self) -> usize {
        self.items.len()
    }

    pub fn element(&self, kind: ElementKind, item: usize) -> Option<&ItemModel> {
        match kind {
            ElementKind::Header => self.header.as_ref(),
            ElementKind::Footer => self.footer.as_ref(),
            ElementKind::Cell => self.items.get(item),
        }
    }

    pub(crate) fn element_mut(&mut self, kind: ElementKind, item: usize) -> Option<&mut ItemModel> {
        match kind {
            ElementKind::Header => self.header.as_mut(),
            ElementKind::Footer => self.footer.as_mut(),
            ElementKind::Cell => self.items.get_mut(item),
        }
    }
}
