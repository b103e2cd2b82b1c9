//! Late-arriving measurement absorption.
//!
//! Rendered cells report their real size only after they exist, which can
//! be long after the item was first laid out from an estimate. The
//! coordinator decides whether a report is worth an invalidation, updates
//! the live snapshot, and computes the compensating scroll-offset delta
//! the host must apply in the same frame so the content visible on screen
//! does not jump.

use keel_geometry::Size;

use crate::path::{ElementKind, ItemPath};
use crate::snapshot::LayoutSnapshot;

/// Scroll-offset adjustment owed to the host after a measurement report.
///
/// Positive means the content above the visible window grew and the host
/// must scroll down by this much to keep later content fixed on screen.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CompensationDelta(pub f32);

impl CompensationDelta {
    pub const ZERO: CompensationDelta = CompensationDelta(0.0);

    pub fn get(self) -> f32 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}

/// Running mean of measured heights, used to seed estimates for items the
/// delegate declined to guess for.
#[derive(Debug, Default)]
struct RunningAverage {
    sum: f64,
    count: u64,
}

impl RunningAverage {
    fn record(&mut self, height: f32) {
        self.sum += f64::from(height);
        self.count += 1;
    }

    fn value(&self) -> Option<f32> {
        (self.count > 0).then(|| (self.sum / self.count as f64) as f32)
    }
}

/// Everything the compensation decision needs to know about the world
/// outside the model, captured by the engine before the mutation.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CompensationContext {
    /// Top edge of the visible window in content coordinates.
    pub visible_top: f32,
    pub visible_height: f32,
    /// Content height before the report is applied.
    pub content_height: f32,
    /// Top edge of the reported element's current frame (the row's top
    /// for stretch members).
    pub element_top: f32,
    pub keep_content_at_bottom: bool,
    pub is_scrolling: bool,
}

#[derive(Debug, Default)]
pub(crate) struct SizingCoordinator {
    average: RunningAverage,
}

impl SizingCoordinator {
    pub fn average_height(&self) -> Option<f32> {
        self.average.value()
    }

    /// Applies one measured-size report against the live snapshot.
    ///
    /// Exact items and reports within epsilon of the current size are
    /// absorbed as no-ops. Everything else updates the calculated size,
    /// bumps the snapshot generation, and yields the compensation owed.
    pub fn report(
        &mut self,
        snapshot: &mut LayoutSnapshot,
        path: ItemPath,
        kind: ElementKind,
        measured: Size,
        epsilon: f32,
        ctx: &CompensationContext,
    ) -> CompensationDelta {
        let Some(item) = snapshot.element(path, kind) else {
            log::warn!(
                "measured size reported for missing element {:?} at {:?}; dropping",
                kind,
                path
            );
            return CompensationDelta::ZERO;
        };
        if item.is_exact() {
            log::debug!(
                "ignoring measured size for exact-sized element {:?} at {:?}",
                kind,
                path
            );
            return CompensationDelta::ZERO;
        }

        let current = item.height();
        if (measured.height - current).abs() <= epsilon {
            return CompensationDelta::ZERO;
        }

        let height_delta = match item.row() {
            None => {
                self.commit(snapshot, path, kind, measured);
                measured.height - current
            }
            Some(row) => {
                // The slot the member occupies is as tall as the tallest
                // sibling, with unreported siblings standing in at their
                // estimates. Only a change of that maximum moves anything.
                let old_row_height = row_height(snapshot, path.section, row);
                self.commit(snapshot, path, kind, measured);
                row_height(snapshot, path.section, row) - old_row_height
            }
        };
        if height_delta == 0.0 {
            return CompensationDelta::ZERO;
        }

        compensation(height_delta, ctx)
    }

    fn commit(
        &mut self,
        snapshot: &mut LayoutSnapshot,
        path: ItemPath,
        kind: ElementKind,
        measured: Size,
    ) {
        self.average.record(measured.height);
        snapshot
            .element_mut(path, kind)
            .expect("element presence checked by caller")
            .set_calculated(measured);
        snapshot.bump_generation();
    }
}

/// Tallest member of a stretch row, measured members at their calculated
/// height and stragglers at their estimates.
fn row_height(snapshot: &LayoutSnapshot, section: usize, row: u32) -> f32 {
    snapshot
        .section(section)
        .map(|section| {
            section
                .items
                .iter()
                .filter(|item| item.row() == Some(row))
                .map(|item| item.height())
                .fold(0.0f32, f32::max)
        })
        .unwrap_or(0.0)
}

fn compensation(height_delta: f32, ctx: &CompensationContext) -> CompensationDelta {
    let pinned_to_bottom =
        ctx.keep_content_at_bottom && ctx.content_height > ctx.visible_height;
    let anchored = pinned_to_bottom || ctx.is_scrolling;
    if ctx.element_top < ctx.visible_top && anchored {
        CompensationDelta(height_delta)
    } else {
        CompensationDelta::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemId, ItemModel, MeasureMode, SectionId, SectionModel};
    use keel_geometry::ItemAlignment;

    fn item(id: u64, mode: MeasureMode, height: f32) -> ItemModel {
        let calculated = matches!(mode, MeasureMode::Exact).then(|| Size::new(100.0, height));
        ItemModel {
            id: ItemId(id),
            measure: mode,
            estimated_size: Size::new(100.0, height),
            calculated_size: calculated,
            alignment: ItemAlignment::Fill,
            spacing_after: 0.0,
        }
    }

    fn snapshot_of(items: Vec<ItemModel>) -> LayoutSnapshot {
        LayoutSnapshot::new(vec![SectionModel {
            id: SectionId(0),
            header: None,
            footer: None,
            items,
            spacing_after: 0.0,
        }])
    }

    fn scrolling_ctx(element_top: f32) -> CompensationContext {
        CompensationContext {
            visible_top: 100.0,
            visible_height: 300.0,
            content_height: 1000.0,
            element_top,
            keep_content_at_bottom: false,
            is_scrolling: true,
        }
    }

    #[test]
    fn test_exact_items_never_change() {
        let mut snapshot = snapshot_of(vec![item(1, MeasureMode::Exact, 40.0)]);
        let mut coordinator = SizingCoordinator::default();
        let generation = snapshot.generation();

        let delta = coordinator.report(
            &mut snapshot,
            ItemPath::new(0, 0),
            ElementKind::Cell,
            Size::new(100.0, 90.0),
            0.5,
            &scrolling_ctx(0.0),
        );

        assert!(delta.is_zero());
        assert_eq!(snapshot.generation(), generation);
        let unchanged = snapshot.element(ItemPath::new(0, 0), ElementKind::Cell).unwrap();
        assert_eq!(unchanged.calculated_size, Some(Size::new(100.0, 40.0)));
    }

    #[test]
    fn test_report_within_epsilon_is_a_no_op() {
        let mut snapshot = snapshot_of(vec![item(1, MeasureMode::Estimated, 40.0)]);
        let mut coordinator = SizingCoordinator::default();
        let generation = snapshot.generation();

        let delta = coordinator.report(
            &mut snapshot,
            ItemPath::new(0, 0),
            ElementKind::Cell,
            Size::new(100.0, 40.3),
            0.5,
            &scrolling_ctx(0.0),
        );

        assert!(delta.is_zero());
        assert_eq!(snapshot.generation(), generation);
    }

    #[test]
    fn test_growth_above_visible_top_compensates_while_scrolling() {
        let mut snapshot = snapshot_of(vec![item(1, MeasureMode::Estimated, 40.0)]);
        let mut coordinator = SizingCoordinator::default();

        let delta = coordinator.report(
            &mut snapshot,
            ItemPath::new(0, 0),
            ElementKind::Cell,
            Size::new(100.0, 70.0),
            0.5,
            &scrolling_ctx(0.0),
        );

        assert_eq!(delta.get(), 30.0);
        let updated = snapshot.element(ItemPath::new(0, 0), ElementKind::Cell).unwrap();
        assert_eq!(updated.calculated_size, Some(Size::new(100.0, 70.0)));
    }

    #[test]
    fn test_growth_below_visible_top_needs_no_compensation() {
        let mut snapshot = snapshot_of(vec![item(1, MeasureMode::Estimated, 40.0)]);
        let mut coordinator = SizingCoordinator::default();

        let delta = coordinator.report(
            &mut snapshot,
            ItemPath::new(0, 0),
            ElementKind::Cell,
            Size::new(100.0, 70.0),
            0.5,
            &scrolling_ctx(150.0),
        );

        assert!(delta.is_zero());
        // The model still took the measurement.
        let updated = snapshot.element(ItemPath::new(0, 0), ElementKind::Cell).unwrap();
        assert_eq!(updated.calculated_size, Some(Size::new(100.0, 70.0)));
    }

    #[test]
    fn test_idle_unpinned_report_applies_without_compensation() {
        let mut snapshot = snapshot_of(vec![item(1, MeasureMode::Estimated, 40.0)]);
        let mut coordinator = SizingCoordinator::default();
        let ctx = CompensationContext {
            is_scrolling: false,
            ..scrolling_ctx(0.0)
        };

        let delta = coordinator.report(
            &mut snapshot,
            ItemPath::new(0, 0),
            ElementKind::Cell,
            Size::new(100.0, 70.0),
            0.5,
            &ctx,
        );

        assert!(delta.is_zero());
    }

    #[test]
    fn test_pinned_bottom_compensates_when_content_overflows_viewport() {
        let mut snapshot = snapshot_of(vec![item(1, MeasureMode::Estimated, 40.0)]);
        let mut coordinator = SizingCoordinator::default();
        let ctx = CompensationContext {
            keep_content_at_bottom: true,
            is_scrolling: false,
            ..scrolling_ctx(0.0)
        };

        let delta = coordinator.report(
            &mut snapshot,
            ItemPath::new(0, 0),
            ElementKind::Cell,
            Size::new(100.0, 65.0),
            0.5,
            &ctx,
        );

        assert_eq!(delta.get(), 25.0);
    }

    #[test]
    fn test_pinned_bottom_without_overflow_does_not_compensate() {
        let mut snapshot = snapshot_of(vec![item(1, MeasureMode::Estimated, 40.0)]);
        let mut coordinator = SizingCoordinator::default();
        let ctx = CompensationContext {
            keep_content_at_bottom: true,
            is_scrolling: false,
            content_height: 200.0,
            ..scrolling_ctx(0.0)
        };

        let delta = coordinator.report(
            &mut snapshot,
            ItemPath::new(0, 0),
            ElementKind::Cell,
            Size::new(100.0, 65.0),
            0.5,
            &ctx,
        );

        assert!(delta.is_zero());
    }

    #[test]
    fn test_shrinking_item_yields_negative_compensation() {
        let mut snapshot = snapshot_of(vec![item(1, MeasureMode::Estimated, 80.0)]);
        let mut coordinator = SizingCoordinator::default();

        let delta = coordinator.report(
            &mut snapshot,
            ItemPath::new(0, 0),
            ElementKind::Cell,
            Size::new(100.0, 50.0),
            0.5,
            &scrolling_ctx(0.0),
        );

        assert_eq!(delta.get(), -30.0);
    }

    #[test]
    fn test_stretch_row_delta_tracks_the_maximum_only() {
        let mut members: Vec<ItemModel> = (0..3)
            .map(|i| item(i, MeasureMode::StretchToRow(0), 40.0))
            .collect();
        members[1].estimated_size = Size::new(100.0, 60.0);
        let mut snapshot = snapshot_of(members);
        let mut coordinator = SizingCoordinator::default();

        // Member 0 measures below the current row maximum of 60: the row
        // height does not move, so no compensation is owed.
        let delta = coordinator.report(
            &mut snapshot,
            ItemPath::new(0, 0),
            ElementKind::Cell,
            Size::new(100.0, 50.0),
            0.5,
            &scrolling_ctx(0.0),
        );
        assert!(delta.is_zero());

        // Member 2 measures above the maximum: the row grows by 15.
        let delta = coordinator.report(
            &mut snapshot,
            ItemPath::new(0, 2),
            ElementKind::Cell,
            Size::new(100.0, 75.0),
            0.5,
            &scrolling_ctx(0.0),
        );
        assert_eq!(delta.get(), 15.0);
    }

    #[test]
    fn test_average_height_feeds_from_measurements() {
        let mut snapshot = snapshot_of(vec![
            item(1, MeasureMode::Estimated, 40.0),
            item(2, MeasureMode::Estimated, 40.0),
        ]);
        let mut coordinator = SizingCoordinator::default();
        assert!(coordinator.average_height().is_none());

        coordinator.report(
            &mut snapshot,
            ItemPath::new(0, 0),
            ElementKind::Cell,
            Size::new(100.0, 60.0),
            0.5,
            &scrolling_ctx(0.0),
        );
        coordinator.report(
            &mut snapshot,
            ItemPath::new(0, 1),
            ElementKind::Cell,
            Size::new(100.0, 80.0),
            0.5,
            &scrolling_ctx(0.0),
        );

        assert_eq!(coordinator.average_height(), Some(70.0));
    }

    #[test]
    fn test_missing_element_is_absorbed() {
        let mut snapshot = snapshot_of(vec![item(1, MeasureMode::Estimated, 40.0)]);
        let mut coordinator = SizingCoordinator::default();
        let delta = coordinator.report(
            &mut snapshot,
            ItemPath::new(5, 5),
            ElementKind::Cell,
            Size::new(100.0, 70.0),
            0.5,
            &scrolling_ctx(0.0),
        );
        assert!(delta.is_zero());
    }
}
