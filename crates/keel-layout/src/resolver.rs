//! Geometry resolution.
//!
//! Frames are derived from cumulative running offsets along the scroll
//! axis: a section starts where the previous non-empty section ended plus
//! the inter-section gap, and inside a section each vertical slot (header,
//! cell or stretch row, footer) starts where the previous slot ended plus
//! that slot's trailing spacing. One linear walk produces a
//! [`ResolvedLayout`] table that is cached per snapshot generation, so
//! repeated visible-rect queries during scrolling cost a binary search
//! plus the visible elements rather than a walk over the whole list.

use keel_geometry::Rect;
use smallvec::SmallVec;

use crate::path::{ElementKind, ElementRef, ItemPath};
use crate::settings::LayoutSettings;
use crate::snapshot::{LayoutSnapshot, SnapshotTag};

/// Absolute frames for one section.
#[derive(Clone, Debug)]
pub(crate) struct ResolvedSection {
    /// Union of the section's slots; zero-height for empty sections.
    pub bounds: Rect,
    pub header: Option<Rect>,
    pub footer: Option<Rect>,
    /// Frame per cell, indexed by item index.
    pub items: Vec<Rect>,
}

/// The full offset table for one snapshot generation.
#[derive(Clone, Debug)]
pub(crate) struct ResolvedLayout {
    pub generation: u64,
    pub sections: Vec<ResolvedSection>,
    pub content_height: f32,
}

impl ResolvedLayout {
    pub fn resolve(
        snapshot: &LayoutSnapshot,
        settings: &LayoutSettings,
        viewport_width: f32,
    ) -> Self {
        let insets = settings.content_insets;
        let content_width = (viewport_width - insets.horizontal_sum()).max(0.0);
        let left = insets.left;

        let mut sections = Vec::with_capacity(snapshot.section_count());
        let mut y = insets.top;
        // Trailing gap of the last non-empty section, applied only once a
        // further non-empty section actually follows.
        let mut pending_section_gap: Option<f32> = None;

        for section in snapshot.sections() {
            if section.is_empty() {
                sections.push(ResolvedSection {
                    bounds: Rect::new(left, y, content_width, 0.0),
                    header: None,
                    footer: None,
                    items: Vec::new(),
                });
                continue;
            }
            if let Some(gap) = pending_section_gap.take() {
                y += gap;
            }
            let origin = y;
            let mut pending_slot_gap: Option<f32> = None;

            let header = section.header.as_ref().map(|item| {
                let frame = place_single(item, left, y, content_width);
                y = frame.max_y();
                pending_slot_gap = Some(item.spacing_after);
                frame
            });

            let mut items = Vec::with_capacity(section.items.len());
            let mut index = 0;
            while index < section.items.len() {
                if let Some(gap) = pending_slot_gap.take() {
                    y += gap;
                }
                let item = &section.items[index];
                match item.row() {
                    Some(row) => {
                        // Consecutive members of the same row share one
                        // vertical slot at the height of the tallest.
                        // Rows rarely have more than a few columns, so the
                        // member buffer stays on the stack.
                        let mut members: SmallVec<[(f32, f32); 4]> = SmallVec::new();
                        let mut row_height = 0.0f32;
                        let mut x = left;
                        let mut trailing_spacing = 0.0;
                        while let Some(member) = section.items.get(index) {
                            if member.row() != Some(row) {
                                break;
                            }
                            let width = member.size().width.min(content_width);
                            members.push((x, width));
                            x += width + settings.inter_item_spacing;
                            row_height = row_height.max(member.height());
                            trailing_spacing = member.spacing_after;
                            index += 1;
                        }
                        for (x, width) in members {
                            items.push(Rect::new(x, y, width, row_height));
                        }
                        y += row_height;
                        pending_slot_gap = Some(trailing_spacing);
                    }
                    None => {
                        let frame = place_single(item, left, y, content_width);
                        y = frame.max_y();
                        pending_slot_gap = Some(item.spacing_after);
                        items.push(frame);
                        index += 1;
                    }
                }
            }

            let footer = section.footer.as_ref().map(|item| {
                if let Some(gap) = pending_slot_gap.take() {
                    y += gap;
                }
                let frame = place_single(item, left, y, content_width);
                y = frame.max_y();
                frame
            });

            sections.push(ResolvedSection {
                bounds: Rect::new(left, origin, content_width, y - origin),
                header,
                footer,
                items,
            });
            pending_section_gap = Some(section.spacing_after);
        }

        ResolvedLayout {
            generation: snapshot.generation(),
            sections,
            content_height: y + insets.bottom,
        }
    }

    pub fn frame(&self, path: ItemPath, kind: ElementKind) -> Option<Rect> {
        let section = self.sections.get(path.section)?;
        match kind {
            ElementKind::Header => section.header,
            ElementKind::Footer => section.footer,
            ElementKind::Cell => section.items.get(path.item).copied(),
        }
    }

    /// All elements whose frames intersect `rect`, boundary-inclusive, in
    /// scroll-axis order.
    pub fn elements_in(&self, rect: &Rect) -> Vec<ElementRef> {
        let min_y = rect.min_y();
        let max_y = rect.max_y();
        let mut out = Vec::new();

        let start = self
            .sections
            .partition_point(|section| section.bounds.max_y() < min_y);
        for (section_index, section) in self.sections.iter().enumerate().skip(start) {
            if section.bounds.min_y() > max_y {
                break;
            }
            if let Some(header) = section.header {
                if header.intersects_vertically(min_y, max_y) {
                    out.push(ElementRef::header(section_index));
                }
            }
            let first_item = section
                .items
                .partition_point(|frame| frame.max_y() < min_y);
            for (item_index, frame) in section.items.iter().enumerate().skip(first_item) {
                if frame.min_y() > max_y {
                    break;
                }
                if frame.intersects_vertically(min_y, max_y) {
                    out.push(ElementRef::cell(section_index, item_index));
                }
            }
            if let Some(footer) = section.footer {
                if footer.intersects_vertically(min_y, max_y) {
                    out.push(ElementRef::footer(section_index));
                }
            }
        }
        out
    }
}

fn place_single(
    item: &crate::model::ItemModel,
    left: f32,
    y: f32,
    content_width: f32,
) -> Rect {
    let size = item.size();
    let (offset, width) = item.alignment.resolve(content_width, size.width);
    Rect::new(left + offset, y, width, size.height)
}

/// Caches one [`ResolvedLayout`] per snapshot tag, keyed by generation.
/// Stale entries are detected by generation mismatch, so mutation sites
/// never have to remember to evict anything.
#[derive(Debug, Default)]
pub(crate) struct GeometryResolver {
    before: Option<ResolvedLayout>,
    after: Option<ResolvedLayout>,
}

impl GeometryResolver {
    pub fn resolved(
        &mut self,
        snapshot: &LayoutSnapshot,
        settings: &LayoutSettings,
        viewport_width: f32,
        tag: SnapshotTag,
    ) -> &ResolvedLayout {
        let slot = match tag {
            SnapshotTag::BeforeUpdate => &mut self.before,
            SnapshotTag::AfterUpdate => &mut self.after,
        };
        let stale = slot
            .as_ref()
            .map_or(true, |resolved| resolved.generation != snapshot.generation());
        if stale {
            log::trace!(
                "resolving layout for {:?} at generation {}",
                tag,
                snapshot.generation()
            );
            *slot = Some(ResolvedLayout::resolve(snapshot, settings, viewport_width));
        }
        slot.as_ref().expect("resolved layout populated above")
    }

    pub fn invalidate_all(&mut self) {
        self.before = None;
        self.after = None;
    }
}
