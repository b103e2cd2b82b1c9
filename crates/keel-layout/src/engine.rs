//! The engine facade.
//!
//! [`ListLayout`] is headless and UI-agnostic: the hosting scroll surface
//! drives it by feeding viewport geometry, scroll state, structural change
//! batches, and measured sizes, and reads back frames, visibility ranges,
//! and compensating offsets. All calls must come from the one thread that
//! owns the instance; the only internally parallel work is the pure
//! re-estimation fan-out behind [`ListLayout::reestimate`].

use keel_geometry::{Rect, Size};

use crate::anchor::{PositionAnchor, VerticalEdge};
use crate::changes::{apply_changes, ChangeOperation, ElementFactory};
use crate::delegate::{ElementAttributes, LayoutDelegate};
use crate::invalidation::{CompensationContext, CompensationDelta, SizingCoordinator};
use crate::model::{IdAllocator, ItemId, ItemModel};
use crate::path::{ElementKind, ElementRef, ItemPath};
use crate::reestimate::reestimate_sections;
use crate::resolver::GeometryResolver;
use crate::settings::LayoutSettings;
use crate::snapshot::{LayoutSnapshot, SnapshotTag, StateStore};
use crate::transaction::{TransactionPhase, UpdateOrchestrator};

pub struct ListLayout {
    settings: LayoutSettings,
    store: StateStore,
    resolver: GeometryResolver,
    sizing: SizingCoordinator,
    orchestrator: UpdateOrchestrator,
    ids: IdAllocator,
    /// Visible window in content coordinates; its width is the layout
    /// width, its origin the current scroll offset.
    visible_bounds: Rect,
    is_scrolling: bool,
}

impl ListLayout {
    pub fn new(settings: LayoutSettings) -> Self {
        Self {
            settings,
            store: StateStore::new(),
            resolver: GeometryResolver::default(),
            sizing: SizingCoordinator::default(),
            orchestrator: UpdateOrchestrator::new(),
            ids: IdAllocator::default(),
            visible_bounds: Rect::ZERO,
            is_scrolling: false,
        }
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    /// Rebuilds the whole model from the delegate, dropping all geometry.
    /// Use [`apply`](Self::apply) for incremental changes instead.
    pub fn reset(&mut self, delegate: &dyn LayoutDelegate) {
        if self.orchestrator.phase() != TransactionPhase::Idle {
            panic!("the model cannot be rebuilt while an update transaction is open");
        }
        let mut factory = ElementFactory {
            delegate,
            settings: &self.settings,
            ids: &mut self.ids,
            average_height: self.sizing.average_height(),
        };
        let sections = (0..delegate.number_of_sections())
            .map(|index| factory.section(index))
            .collect();
        self.store.set_before(LayoutSnapshot::new(sections));
        self.resolver.invalidate_all();
    }

    /// Opens an update transaction and applies `changes` to the
    /// after-update snapshot. Panics if a transaction is already open.
    pub fn apply(&mut self, changes: &[ChangeOperation], delegate: &dyn LayoutDelegate) {
        self.orchestrator.open();
        self.store.open_update();
        let mut factory = ElementFactory {
            delegate,
            settings: &self.settings,
            ids: &mut self.ids,
            average_height: self.sizing.average_height(),
        };
        apply_changes(
            self.store.snapshot_mut(SnapshotTag::AfterUpdate),
            changes,
            &mut factory,
        );
    }

    /// Collapses the after-update snapshot into the live one and returns
    /// the total compensating scroll offset accumulated while the
    /// transaction was open. The host applies it to its scroll position
    /// once, in the same frame.
    pub fn commit(&mut self) -> f32 {
        let compensation = self.orchestrator.begin_commit();
        self.store.commit_update();
        self.resolver.invalidate_all();
        self.orchestrator.finish_commit();
        log::debug!("committed update transaction, compensation {compensation}");
        compensation
    }

    pub fn phase(&self) -> TransactionPhase {
        self.orchestrator.phase()
    }

    pub fn is_updating(&self) -> bool {
        self.orchestrator.is_open()
    }

    pub fn set_visible_bounds(&mut self, bounds: Rect) {
        self.visible_bounds = bounds;
    }

    pub fn visible_bounds(&self) -> Rect {
        self.visible_bounds
    }

    /// The host reports whether the user is actively scrolling; the
    /// compensation policy keys off it.
    pub fn set_scrolling(&mut self, scrolling: bool) {
        self.is_scrolling = scrolling;
    }

    /// Read access to either snapshot. The after-update snapshot only
    /// exists while a transaction is open.
    pub fn snapshot(&self, tag: SnapshotTag) -> &LayoutSnapshot {
        self.store.snapshot(tag)
    }

    pub fn content_height(&mut self) -> f32 {
        let tag = self.store.live_tag();
        self.content_height_at(tag)
    }

    pub fn content_height_at(&mut self, tag: SnapshotTag) -> f32 {
        self.resolved(tag).content_height
    }

    pub fn frame(&mut self, path: ItemPath, kind: ElementKind) -> Option<Rect> {
        let tag = self.store.live_tag();
        self.frame_at(path, kind, tag)
    }

    pub fn frame_at(
        &mut self,
        path: ItemPath,
        kind: ElementKind,
        tag: SnapshotTag,
    ) -> Option<Rect> {
        self.resolved(tag).frame(path, kind)
    }

    /// Elements intersecting `rect`, boundary-inclusive, in scroll order.
    pub fn elements_in(&mut self, rect: Rect) -> Vec<ElementRef> {
        let tag = self.store.live_tag();
        self.resolved(tag).elements_in(&rect)
    }

    /// The query the host issues every scroll tick.
    pub fn visible_elements(&mut self) -> Vec<ElementRef> {
        self.elements_in(self.visible_bounds)
    }

    pub fn identity(&self, path: ItemPath, kind: ElementKind) -> Option<ItemId> {
        self.store.snapshot(self.store.live_tag()).identity(path, kind)
    }

    pub fn identity_at(
        &self,
        path: ItemPath,
        kind: ElementKind,
        tag: SnapshotTag,
    ) -> Option<ItemId> {
        self.store.snapshot(tag).identity(path, kind)
    }

    pub fn location_of(&self, id: ItemId, tag: SnapshotTag) -> Option<ElementRef> {
        self.store.snapshot(tag).location_of(id)
    }

    /// Absorbs one measured-size report against the live snapshot and
    /// returns the compensating scroll delta owed for this report alone.
    /// While a transaction is open the delta also joins the running total
    /// returned by [`commit`](Self::commit).
    pub fn report_measured_size(
        &mut self,
        path: ItemPath,
        kind: ElementKind,
        measured: Size,
    ) -> CompensationDelta {
        let tag = self.store.live_tag();
        let Some(frame) = self.frame_at(path, kind, tag) else {
            log::warn!(
                "measured size reported for element without geometry: {:?} at {:?}",
                kind,
                path
            );
            return CompensationDelta::ZERO;
        };
        let ctx = CompensationContext {
            visible_top: self.visible_bounds.min_y(),
            visible_height: self.visible_bounds.height,
            content_height: self.content_height_at(tag),
            element_top: frame.min_y(),
            keep_content_at_bottom: self.settings.keep_content_at_bottom,
            is_scrolling: self.is_scrolling,
        };
        let delta = self.sizing.report(
            self.store.snapshot_mut(tag),
            path,
            kind,
            measured,
            self.settings.size_epsilon,
            &ctx,
        );
        if self.orchestrator.is_open() && !delta.is_zero() {
            self.orchestrator.accumulate(delta.get());
        }
        delta
    }

    /// Captures the element nearest the requested visible edge. Returns
    /// `None` when nothing is visible.
    pub fn capture_anchor(&mut self, edge: VerticalEdge) -> Option<PositionAnchor> {
        let tag = self.store.live_tag();
        let visible = self.visible_bounds;
        let elements = self.elements_in(visible);
        let target = match edge {
            VerticalEdge::Top => elements.first(),
            VerticalEdge::Bottom => elements.last(),
        }
        .copied()?;
        let frame = self.frame_at(target.path, target.kind, tag)?;
        let id = self.store.snapshot(tag).identity(target.path, target.kind)?;
        Some(PositionAnchor::capture(id, target.kind, edge, &frame, &visible))
    }

    /// Consumes the anchor and returns the scroll top that puts the
    /// anchored edge back at its captured screen position. `None` when the
    /// anchored element no longer exists.
    pub fn restore_anchor(&mut self, anchor: PositionAnchor) -> Option<f32> {
        let tag = self.store.live_tag();
        let Some(location) = self.store.snapshot(tag).location_of(anchor.item()) else {
            log::debug!(
                "anchor target {:?} no longer exists; restore skipped",
                anchor.item()
            );
            return None;
        };
        let frame = self.frame_at(location.path, location.kind, tag)?;
        Some(anchor.restore(&frame, self.visible_bounds.height))
    }

    /// Starting attributes for an element addressed in after-update
    /// coordinates. Elements that also exist before the update animate
    /// from their old frame; inserted elements appear with the delegate's
    /// appear transform (zero opacity at their final frame by default).
    pub fn initial_attributes(
        &mut self,
        path: ItemPath,
        kind: ElementKind,
        delegate: &dyn LayoutDelegate,
    ) -> Option<ElementAttributes> {
        self.require_open("initial attributes");
        let id = self
            .store
            .snapshot(SnapshotTag::AfterUpdate)
            .identity(path, kind)?;
        if let Some(before) = self
            .store
            .snapshot(SnapshotTag::BeforeUpdate)
            .location_of(id)
        {
            let frame = self.frame_at(before.path, before.kind, SnapshotTag::BeforeUpdate)?;
            Some(ElementAttributes::new(frame))
        } else {
            let frame = self.frame_at(path, kind, SnapshotTag::AfterUpdate)?;
            let mut attributes = ElementAttributes { frame, alpha: 0.0 };
            delegate.configure_appearing(kind, path, &mut attributes);
            Some(attributes)
        }
    }

    /// Ending attributes for an element addressed in before-update
    /// coordinates. Surviving elements animate to their new frame; deleted
    /// elements disappear at their last known frame shifted by the
    /// compensation accumulated so far, so the endpoint lines up with what
    /// is actually on screen.
    pub fn final_attributes(
        &mut self,
        path: ItemPath,
        kind: ElementKind,
        delegate: &dyn LayoutDelegate,
    ) -> Option<ElementAttributes> {
        self.require_open("final attributes");
        let id = self
            .store
            .snapshot(SnapshotTag::BeforeUpdate)
            .identity(path, kind)?;
        if let Some(after) = self
            .store
            .snapshot(SnapshotTag::AfterUpdate)
            .location_of(id)
        {
            let frame = self.frame_at(after.path, after.kind, SnapshotTag::AfterUpdate)?;
            Some(ElementAttributes::new(frame))
        } else {
            let frame = self
                .frame_at(path, kind, SnapshotTag::BeforeUpdate)?
                .translate(0.0, self.orchestrator.accumulated());
            let mut attributes = ElementAttributes { frame, alpha: 0.0 };
            delegate.configure_disappearing(kind, path, &mut attributes);
            Some(attributes)
        }
    }

    /// Recomputes estimates for all still-unmeasured items by fanning the
    /// pure `recompute` function out across worker threads. Joins before
    /// returning, so no query can observe partial results.
    pub fn reestimate<F>(&mut self, recompute: F)
    where
        F: Fn(&ItemModel) -> Option<Size> + Sync,
    {
        let tag = self.store.live_tag();
        let snapshot = self.store.snapshot_mut(tag);
        if reestimate_sections(snapshot.sections_mut(), &recompute) {
            snapshot.bump_generation();
        }
    }

    fn resolved(&mut self, tag: SnapshotTag) -> &crate::resolver::ResolvedLayout {
        self.resolver.resolved(
            self.store.snapshot(tag),
            &self.settings,
            self.visible_bounds.width,
            tag,
        )
    }

    fn require_open(&self, what: &str) {
        if !self.orchestrator.is_open() {
            panic!("{what} can only be resolved while an update transaction is open");
        }
    }
}
