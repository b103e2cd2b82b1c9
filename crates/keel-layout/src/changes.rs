//! Structural change operations and their batch applier.
//!
//! A batch is applied in exactly the order the caller supplied; nothing is
//! reordered or commuted. Hosts follow platform list-update semantics
//! (deletes and moves-out addressed in before-update coordinates first,
//! inserts and moves-in in after-update coordinates second), and the
//! applier simply trusts that order. An operation that addresses a path
//! absent from the snapshot it runs against is a programming error on the
//! caller's side and fails loudly: continuing would leave every later
//! frame built on an inconsistent index.

use keel_geometry::Size;

use crate::delegate::LayoutDelegate;
use crate::model::{IdAllocator, ItemModel, MeasureMode, SectionModel, SizeMode};
use crate::path::{ElementKind, ItemPath};
use crate::settings::LayoutSettings;
use crate::snapshot::LayoutSnapshot;

/// One structural mutation inside a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeOperation {
    InsertSection { at: usize },
    DeleteSection { at: usize },
    MoveSection { from: usize, to: usize },
    /// Rebuild a section's contents from the delegate. The section identity
    /// survives; the rebuilt items are new elements with fresh identities.
    ReloadSection { at: usize },
    InsertItem { at: ItemPath },
    DeleteItem { at: ItemPath },
    /// Relocate an item. Its identity and any calculated size travel with it.
    MoveItem { from: ItemPath, to: ItemPath },
    /// Replace an item's sizing policy from the delegate, discarding its
    /// calculated size so it will be measured again. Identity survives.
    ReloadItem { at: ItemPath },
    /// Refresh presentation attributes in place. Identity and calculated
    /// size both survive.
    ReconfigureItem { at: ItemPath },
}

/// Builds model elements by querying the delegate, resolving omitted
/// estimates against the measurement average and engine defaults.
pub(crate) struct ElementFactory<'a> {
    pub delegate: &'a dyn LayoutDelegate,
    pub settings: &'a LayoutSettings,
    pub ids: &'a mut IdAllocator,
    /// Running average of measured heights, if any measurements exist.
    pub average_height: Option<f32>,
}

impl ElementFactory<'_> {
    pub fn item(&mut self, kind: ElementKind, path: ItemPath) -> ItemModel {
        let (measure, estimated_size, calculated_size) =
            match self.delegate.size_mode(kind, path) {
                SizeMode::Exact(size) => (MeasureMode::Exact, size, Some(size)),
                SizeMode::Estimated(estimate) => (
                    MeasureMode::Estimated,
                    self.resolve_estimate(estimate),
                    None,
                ),
                SizeMode::EstimatedStretchToRow { estimate, row } => (
                    MeasureMode::StretchToRow(row),
                    self.resolve_estimate(estimate),
                    None,
                ),
            };
        ItemModel {
            id: self.ids.item_id(),
            measure,
            estimated_size,
            calculated_size,
            alignment: self.delegate.alignment(kind, path),
            spacing_after: self.item_spacing(path.section),
        }
    }

    pub fn section(&mut self, index: usize) -> SectionModel {
        let header = self
            .delegate
            .has_header(index)
            .then(|| self.item(ElementKind::Header, ItemPath::section_path(index)));
        let footer = self
            .delegate
            .has_footer(index)
            .then(|| self.item(ElementKind::Footer, ItemPath::section_path(index)));
        let items = (0..self.delegate.number_of_items(index))
            .map(|item| self.item(ElementKind::Cell, ItemPath::new(index, item)))
            .collect();
        SectionModel {
            id: self.ids.section_id(),
            header,
            footer,
            items,
            spacing_after: self.section_spacing(index),
        }
    }

    /// Refreshes presentation attributes without touching sizing state.
    pub fn reconfigure(&mut self, item: &mut ItemModel, kind: ElementKind, path: ItemPath) {
        item.alignment = self.delegate.alignment(kind, path);
        item.spacing_after = self.item_spacing(path.section);
    }

    fn resolve_estimate(&self, estimate: Option<Size>) -> Size {
        estimate.unwrap_or_else(|| {
            Size::new(
                self.settings.default_estimate.width,
                self.average_height
                    .unwrap_or(self.settings.default_estimate.height),
            )
        })
    }

    fn item_spacing(&self, section: usize) -> f32 {
        self.delegate
            .inter_item_spacing(section)
            .unwrap_or(self.settings.inter_item_spacing)
    }

    fn section_spacing(&self, section: usize) -> f32 {
        self.delegate
            .inter_section_spacing(section)
            .unwrap_or(self.settings.inter_section_spacing)
    }
}

/// Applies a batch to the after-update snapshot, then rebuilds its
/// identity index once and bumps its generation.
pub(crate) fn apply_changes(
    snapshot: &mut LayoutSnapshot,
    changes: &[ChangeOperation],
    factory: &mut ElementFactory<'_>,
) {
    for &change in changes {
        apply_one(snapshot, change, factory);
    }
    snapshot.rebuild_index();
    snapshot.bump_generation();
    log::trace!(
        "applied {} change(s), {} section(s) in the updated snapshot",
        changes.len(),
        snapshot.section_count()
    );
}

fn apply_one(
    snapshot: &mut LayoutSnapshot,
    change: ChangeOperation,
    factory: &mut ElementFactory<'_>,
) {
    match change {
        ChangeOperation::InsertSection { at } => {
            // Validate before building so the delegate is never asked
            // about a position the structure cannot hold.
            if at > snapshot.section_count() {
                stale_path(change);
            }
            let section = factory.section(at);
            snapshot.sections_mut().insert(at, section);
        }
        ChangeOperation::DeleteSection { at } => {
            let sections = snapshot.sections_mut();
            if at >= sections.len() {
                stale_path(change);
            }
            sections.remove(at);
        }
        ChangeOperation::MoveSection { from, to } => {
            let sections = snapshot.sections_mut();
            if from >= sections.len() {
                stale_path(change);
            }
            let section = sections.remove(from);
            if to > sections.len() {
                stale_path(change);
            }
            sections.insert(to, section);
        }
        ChangeOperation::ReloadSection { at } => {
            if at >= snapshot.section_count() {
                stale_path(change);
            }
            let mut rebuilt = factory.section(at);
            let sections = snapshot.sections_mut();
            rebuilt.id = sections[at].id;
            sections[at] = rebuilt;
        }
        ChangeOperation::InsertItem { at } => {
            let fits = snapshot
                .section(at.section)
                .is_some_and(|section| at.item <= section.items.len());
            if !fits {
                stale_path(change);
            }
            let item = factory.item(ElementKind::Cell, at);
            snapshot.sections_mut()[at.section].items.insert(at.item, item);
        }
        ChangeOperation::DeleteItem { at } => {
            let Some(section) = snapshot.sections_mut().get_mut(at.section) else {
                stale_path(change);
            };
            if at.item >= section.items.len() {
                stale_path(change);
            }
            section.items.remove(at.item);
        }
        ChangeOperation::MoveItem { from, to } => {
            let item = {
                let Some(section) = snapshot.sections_mut().get_mut(from.section) else {
                    stale_path(change);
                };
                if from.item >= section.items.len() {
                    stale_path(change);
                }
                section.items.remove(from.item)
            };
            let Some(section) = snapshot.sections_mut().get_mut(to.section) else {
                stale_path(change);
            };
            if to.item > section.items.len() {
                stale_path(change);
            }
            section.items.insert(to.item, item);
        }
        ChangeOperation::ReloadItem { at } => {
            if snapshot.element(at, ElementKind::Cell).is_none() {
                stale_path(change);
            }
            let mut fresh = factory.item(ElementKind::Cell, at);
            let existing = snapshot
                .element_mut(at, ElementKind::Cell)
                .expect("element presence checked above");
            fresh.id = existing.id;
            *existing = fresh;
        }
        ChangeOperation::ReconfigureItem { at } => {
            let Some(item) = snapshot.element_mut(at, ElementKind::Cell) else {
                stale_path(change);
            };
            factory.reconfigure(item, ElementKind::Cell, at);
        }
    }
}

fn stale_path(change: ChangeOperation) -> ! {
    panic!("change {change:?} references a path outside the updated snapshot");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemId;
    use crate::path::ElementRef;

    struct FlatDelegate {
        counts: Vec<usize>,
    }

    impl LayoutDelegate for FlatDelegate {
        fn number_of_sections(&self) -> usize {
            self.counts.len()
        }

        fn number_of_items(&self, section: usize) -> usize {
            self.counts[section]
        }
    }

    fn build(counts: &[usize]) -> (LayoutSnapshot, IdAllocator) {
        let delegate = FlatDelegate {
            counts: counts.to_vec(),
        };
        let settings = LayoutSettings::default();
        let mut ids = IdAllocator::default();
        let mut factory = ElementFactory {
            delegate: &delegate,
            settings: &settings,
            ids: &mut ids,
            average_height: None,
        };
        let sections = (0..delegate.number_of_sections())
            .map(|index| factory.section(index))
            .collect();
        (LayoutSnapshot::new(sections), ids)
    }

    fn apply(snapshot: &mut LayoutSnapshot, ids: &mut IdAllocator, changes: &[ChangeOperation]) {
        let delegate = FlatDelegate { counts: vec![9; 9] };
        let settings = LayoutSettings::default();
        let mut factory = ElementFactory {
            delegate: &delegate,
            settings: &settings,
            ids,
            average_height: None,
        };
        apply_changes(snapshot, changes, &mut factory);
    }

    #[test]
    fn test_insert_item_shifts_later_paths_and_keeps_identities() {
        let (mut snapshot, mut ids) = build(&[3]);
        let shifted = snapshot.identity(ItemPath::new(0, 1), ElementKind::Cell).unwrap();

        apply(
            &mut snapshot,
            &mut ids,
            &[ChangeOperation::InsertItem {
                at: ItemPath::new(0, 1),
            }],
        );

        assert_eq!(snapshot.section(0).unwrap().cell_count(), 4);
        assert_eq!(snapshot.location_of(shifted), Some(ElementRef::cell(0, 2)));
    }

    #[test]
    fn test_delete_then_insert_at_same_path() {
        let (mut snapshot, mut ids) = build(&[3]);
        let deleted = snapshot.identity(ItemPath::new(0, 1), ElementKind::Cell).unwrap();
        let survivor = snapshot.identity(ItemPath::new(0, 2), ElementKind::Cell).unwrap();

        apply(
            &mut snapshot,
            &mut ids,
            &[
                ChangeOperation::DeleteItem {
                    at: ItemPath::new(0, 1),
                },
                ChangeOperation::InsertItem {
                    at: ItemPath::new(0, 1),
                },
            ],
        );

        assert!(snapshot.location_of(deleted).is_none());
        assert_eq!(snapshot.location_of(survivor), Some(ElementRef::cell(0, 2)));
        let inserted = snapshot.identity(ItemPath::new(0, 1), ElementKind::Cell).unwrap();
        assert_ne!(inserted, deleted);
    }

    #[test]
    fn test_move_item_across_sections_preserves_identity() {
        let (mut snapshot, mut ids) = build(&[2, 2]);
        let moved = snapshot.identity(ItemPath::new(0, 0), ElementKind::Cell).unwrap();

        apply(
            &mut snapshot,
            &mut ids,
            &[ChangeOperation::MoveItem {
                from: ItemPath::new(0, 0),
                to: ItemPath::new(1, 2),
            }],
        );

        assert_eq!(snapshot.location_of(moved), Some(ElementRef::cell(1, 2)));
        assert_eq!(snapshot.section(0).unwrap().cell_count(), 1);
        assert_eq!(snapshot.section(1).unwrap().cell_count(), 3);
    }

    #[test]
    fn test_reload_item_keeps_identity_but_drops_calculated_size() {
        let (mut snapshot, mut ids) = build(&[1]);
        let path = ItemPath::new(0, 0);
        let id = snapshot.identity(path, ElementKind::Cell).unwrap();
        snapshot
            .element_mut(path, ElementKind::Cell)
            .unwrap()
            .set_calculated(Size::new(100.0, 77.0));

        apply(&mut snapshot, &mut ids, &[ChangeOperation::ReloadItem { at: path }]);

        let item = snapshot.element(path, ElementKind::Cell).unwrap();
        assert_eq!(item.id, id);
        assert!(item.calculated_size.is_none());
    }

    #[test]
    fn test_reconfigure_keeps_calculated_size() {
        let (mut snapshot, mut ids) = build(&[1]);
        let path = ItemPath::new(0, 0);
        snapshot
            .element_mut(path, ElementKind::Cell)
            .unwrap()
            .set_calculated(Size::new(100.0, 77.0));

        apply(
            &mut snapshot,
            &mut ids,
            &[ChangeOperation::ReconfigureItem { at: path }],
        );

        let item = snapshot.element(path, ElementKind::Cell).unwrap();
        assert_eq!(item.calculated_size, Some(Size::new(100.0, 77.0)));
    }

    #[test]
    fn test_reload_section_keeps_section_identity() {
        let (mut snapshot, mut ids) = build(&[2]);
        let section_id = snapshot.section_identity(0).unwrap();
        let old_item = snapshot.identity(ItemPath::new(0, 0), ElementKind::Cell).unwrap();

        apply(&mut snapshot, &mut ids, &[ChangeOperation::ReloadSection { at: 0 }]);

        assert_eq!(snapshot.section_identity(0), Some(section_id));
        // Rebuilt contents are new elements.
        assert!(snapshot.location_of(old_item).is_none());
    }

    #[test]
    fn test_move_section() {
        let (mut snapshot, mut ids) = build(&[1, 2, 3]);
        let moved = snapshot.section_identity(2).unwrap();

        apply(
            &mut snapshot,
            &mut ids,
            &[ChangeOperation::MoveSection { from: 2, to: 0 }],
        );

        assert_eq!(snapshot.section_location(moved), Some(0));
        assert_eq!(snapshot.section(0).unwrap().cell_count(), 3);
    }

    #[test]
    fn test_operations_apply_in_caller_order() {
        // Insert twice at the same path: the second insert lands above the
        // first because it is applied against the already-mutated state.
        let (mut snapshot, mut ids) = build(&[1]);
        apply(
            &mut snapshot,
            &mut ids,
            &[
                ChangeOperation::InsertItem {
                    at: ItemPath::new(0, 0),
                },
                ChangeOperation::InsertItem {
                    at: ItemPath::new(0, 0),
                },
            ],
        );
        let first = snapshot.identity(ItemPath::new(0, 1), ElementKind::Cell).unwrap();
        let second = snapshot.identity(ItemPath::new(0, 0), ElementKind::Cell).unwrap();
        assert!(second > first, "later insert got the later identity");
    }

    #[test]
    #[should_panic(expected = "references a path outside the updated snapshot")]
    fn test_stale_delete_panics() {
        let (mut snapshot, mut ids) = build(&[1]);
        apply(
            &mut snapshot,
            &mut ids,
            &[ChangeOperation::DeleteItem {
                at: ItemPath::new(0, 5),
            }],
        );
    }

    #[test]
    #[should_panic(expected = "references a path outside the updated snapshot")]
    fn test_stale_section_insert_panics() {
        let (mut snapshot, mut ids) = build(&[1]);
        apply(
            &mut snapshot,
            &mut ids,
            &[ChangeOperation::InsertSection { at: 4 }],
        );
    }

    #[test]
    fn test_fresh_identities_are_never_reused() {
        let (mut snapshot, mut ids) = build(&[1]);
        let original: Vec<ItemId> = snapshot.sections()[0].items.iter().map(|i| i.id).collect();
        apply(
            &mut snapshot,
            &mut ids,
            &[
                ChangeOperation::DeleteItem {
                    at: ItemPath::new(0, 0),
                },
                ChangeOperation::InsertItem {
                    at: ItemPath::new(0, 0),
                },
            ],
        );
        let replacement = snapshot.identity(ItemPath::new(0, 0), ElementKind::Cell).unwrap();
        assert!(!original.contains(&replacement));
    }
}
