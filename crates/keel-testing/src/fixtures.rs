//! Configurable delegate and layout builders for tests.

use std::collections::HashMap;

use keel_geometry::{ItemAlignment, Rect, Size};
use keel_layout::{ElementKind, ItemPath, LayoutDelegate, LayoutSettings, ListLayout, SizeMode};

/// Shape of one fixture section.
#[derive(Clone, Copy, Debug, Default)]
pub struct SectionFixture {
    pub items: usize,
    pub header: bool,
    pub footer: bool,
}

/// A data-driven [`LayoutDelegate`] for tests. Sections are described by
/// counts; individual elements can be overridden with explicit size modes
/// or alignments.
#[derive(Default)]
pub struct FixtureDelegate {
    sections: Vec<SectionFixture>,
    size_modes: HashMap<(usize, usize, u8), SizeMode>,
    alignments: HashMap<(usize, usize, u8), ItemAlignment>,
    inter_item_spacing: Option<f32>,
    inter_section_spacing: Option<f32>,
}

fn kind_tag(kind: ElementKind) -> u8 {
    match kind {
        ElementKind::Header => 0,
        ElementKind::Cell => 1,
        ElementKind::Footer => 2,
    }
}

impl FixtureDelegate {
    /// One section per count, cells only.
    pub fn with_counts(counts: &[usize]) -> Self {
        Self {
            sections: counts
                .iter()
                .map(|&items| SectionFixture {
                    items,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn with_sections(sections: Vec<SectionFixture>) -> Self {
        Self {
            sections,
            ..Default::default()
        }
    }

    pub fn size_mode_at(mut self, path: ItemPath, kind: ElementKind, mode: SizeMode) -> Self {
        self.size_modes
            .insert((path.section, path.item, kind_tag(kind)), mode);
        self
    }

    pub fn alignment_at(
        mut self,
        path: ItemPath,
        kind: ElementKind,
        alignment: ItemAlignment,
    ) -> Self {
        self.alignments
            .insert((path.section, path.item, kind_tag(kind)), alignment);
        self
    }

    pub fn item_spacing(mut self, spacing: f32) -> Self {
        self.inter_item_spacing = Some(spacing);
        self
    }

    pub fn section_spacing(mut self, spacing: f32) -> Self {
        self.inter_section_spacing = Some(spacing);
        self
    }

    /// Grow or shrink a section's cell count, for use between batches.
    pub fn set_count(&mut self, section: usize, items: usize) {
        self.sections[section].items = items;
    }
}

impl LayoutDelegate for FixtureDelegate {
    fn number_of_sections(&self) -> usize {
        self.sections.len()
    }

    fn number_of_items(&self, section: usize) -> usize {
        self.sections[section].items
    }

    fn has_header(&self, section: usize) -> bool {
        self.sections[section].header
    }

    fn has_footer(&self, section: usize) -> bool {
        self.sections[section].footer
    }

    fn size_mode(&self, kind: ElementKind, path: ItemPath) -> SizeMode {
        self.size_modes
            .get(&(path.section, path.item, kind_tag(kind)))
            .copied()
            .unwrap_or(SizeMode::Estimated(None))
    }

    fn alignment(&self, kind: ElementKind, path: ItemPath) -> ItemAlignment {
        self.alignments
            .get(&(path.section, path.item, kind_tag(kind)))
            .copied()
            .unwrap_or(ItemAlignment::Fill)
    }

    fn inter_item_spacing(&self, _section: usize) -> Option<f32> {
        self.inter_item_spacing
    }

    fn inter_section_spacing(&self, _section: usize) -> Option<f32> {
        self.inter_section_spacing
    }
}

/// Standard viewport used by the integration suites.
pub const TEST_VIEWPORT: Rect = Rect::new(0.0, 0.0, 320.0, 480.0);

/// Builds a populated engine over `delegate` with the standard viewport.
pub fn build_layout(settings: LayoutSettings, delegate: &FixtureDelegate) -> ListLayout {
    let mut layout = ListLayout::new(settings);
    layout.set_visible_bounds(TEST_VIEWPORT);
    layout.reset(delegate);
    layout
}

/// Shorthand for an estimated size mode with a known height.
pub fn estimated(height: f32) -> SizeMode {
    SizeMode::Estimated(Some(Size::new(0.0, height)))
}

/// Shorthand for an exact size mode with a known height.
pub fn exact(height: f32) -> SizeMode {
    SizeMode::Exact(Size::new(0.0, height))
}
