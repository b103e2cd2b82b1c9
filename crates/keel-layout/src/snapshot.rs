//! Dual-snapshot state store.
//!
//! A [`LayoutSnapshot`] is one complete section/item graph plus hash
//! indexes that resolve identity to position in O(1). During an open
//! update transaction the [`StateStore`] holds two fully independent
//! snapshots, tagged before- and after-update; committing collapses the
//! after graph into the before slot. The two graphs never share storage:
//! opening a transaction copies the model, so a mutation of one side can
//! never alias into the other.

use crate::collections::map::HashMap;
use crate::model::{ItemId, SectionId, SectionModel};
use crate::path::{ElementKind, ElementRef, ItemPath};

/// Which of the two coexisting snapshots a query addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SnapshotTag {
    BeforeUpdate,
    AfterUpdate,
}

/// A complete section/item graph at one point in time.
#[derive(Clone, Debug)]
pub struct LayoutSnapshot {
    sections: Vec<SectionModel>,
    /// Bumped on every mutation; geometry caches key off this.
    generation: u64,
    item_index: HashMap<ItemId, ElementRef>,
    section_index: HashMap<SectionId, usize>,
}

impl LayoutSnapshot {
    pub fn new(sections: Vec<SectionModel>) -> Self {
        let mut snapshot = Self {
            sections,
            generation: 0,
            item_index: HashMap::default(),
            section_index: HashMap::default(),
        };
        snapshot.rebuild_index();
        snapshot
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn sections(&self) -> &[SectionModel] {
        &self.sections
    }

    pub fn section(&self, index: usize) -> Option<&SectionModel> {
        self.sections.get(index)
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Element data at a path, `None` when the path is out of range.
    pub fn element(&self, path: ItemPath, kind: ElementKind) -> Option<&crate::model::ItemModel> {
        self.sections.get(path.section)?.element(kind, path.item)
    }

    /// Identity of the element at a path, `None` when absent.
    pub fn identity(&self, path: ItemPath, kind: ElementKind) -> Option<ItemId> {
        self.element(path, kind).map(|item| item.id)
    }

    pub fn section_identity(&self, index: usize) -> Option<SectionId> {
        self.sections.get(index).map(|section| section.id)
    }

    /// Position of an identity in this snapshot. Absence means the item
    /// was deleted from (or never inserted into) this side of the update
    /// and is not a fault.
    pub fn location_of(&self, id: ItemId) -> Option<ElementRef> {
        self.item_index.get(&id).copied()
    }

    pub fn section_location(&self, id: SectionId) -> Option<usize> {
        self.section_index.get(&id).copied()
    }

    pub(crate) fn sections_mut(&mut self) -> &mut Vec<SectionModel> {
        &mut self.sections
    }

    pub(crate) fn element_mut(
        &mut self,
        path: ItemPath,
        kind: ElementKind,
    ) -> Option<&mut crate::model::ItemModel> {
        self.sections
            .get_mut(path.section)?
            .element_mut(kind, path.item)
    }

    pub(crate) fn bump_generation(&mut self) {
        self.generation += 1;
    }

    /// Rebuilds both identity indexes from the section arrays. Called once
    /// per structural batch; afterwards every lookup is O(1).
    pub(crate) fn rebuild_index(&mut self) {
        self.item_index.clear();
        self.section_index.clear();
        for (section_index, section) in self.sections.iter().enumerate() {
            self.section_index.insert(section.id, section_index);
            if let Some(header) = &section.header {
                self.item_index
                    .insert(header.id, ElementRef::header(section_index));
            }
            for (item_index, item) in section.items.iter().enumerate() {
                self.item_index
                    .insert(item.id, ElementRef::cell(section_index, item_index));
            }
            if let Some(footer) = &section.footer {
                self.item_index
                    .insert(footer.id, ElementRef::footer(section_index));
            }
        }
    }

    /// Copy taken when a transaction opens. The clone starts above the
    /// parent's generation so caches keyed on (tag, generation) can never
    /// confuse the two.
    pub(crate) fn clone_for_update(&self) -> Self {
        let mut copy = self.clone();
        copy.generation = self.generation + 1;
        copy
    }
}

/// Exclusive owner of the before/after snapshot pair.
#[derive(Debug)]
pub struct StateStore {
    before: LayoutSnapshot,
    after: Option<LayoutSnapshot>,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            before: LayoutSnapshot::empty(),
            after: None,
        }
    }

    pub fn has_update(&self) -> bool {
        self.after.is_some()
    }

    /// The snapshot mutations and queries should address right now:
    /// after-update while a transaction is open, before-update otherwise.
    pub fn live_tag(&self) -> SnapshotTag {
        if self.after.is_some() {
            SnapshotTag::AfterUpdate
        } else {
            SnapshotTag::BeforeUpdate
        }
    }

    pub fn snapshot(&self, tag: SnapshotTag) -> &LayoutSnapshot {
        match tag {
            SnapshotTag::BeforeUpdate => &self.before,
            SnapshotTag::AfterUpdate => self
                .after
                .as_ref()
                .unwrap_or_else(|| panic!("no update transaction is open; the after-update snapshot does not exist")),
        }
    }

    pub(crate) fn snapshot_mut(&mut self, tag: SnapshotTag) -> &mut LayoutSnapshot {
        match tag {
            SnapshotTag::BeforeUpdate => &mut self.before,
            SnapshotTag::AfterUpdate => self
                .after
                .as_mut()
                .unwrap_or_else(|| panic!("no update transaction is open; the after-update snapshot does not exist")),
        }
    }

    pub(crate) fn set_before(&mut self, snapshot: LayoutSnapshot) {
        self.before = snapshot;
    }

    /// Brings the after-update snapshot to life as an independent copy of
    /// the before-update graph.
    pub(crate) fn open_update(&mut self) {
        debug_assert!(self.after.is_none(), "update already open");
        self.after = Some(self.before.clone_for_update());
    }

    /// Collapses after-update into the before slot, ending the dual phase.
    pub(crate) fn commit_update(&mut self) {
        let after = self
            .after
            .take()
            .unwrap_or_else(|| panic!("commit without an open update transaction"));
        self.before = after;
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
