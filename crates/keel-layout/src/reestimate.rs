//! Parallel re-estimation of unmeasured item sizes.
//!
//! Recomputing an estimate is pure per-item work (static inputs, no shared
//! mutable state), so it is the one job allowed off the owning thread.
//! Sections are handed out as exclusive mutable units and large sections
//! are further split into exclusive chunks; the rayon join acts as the
//! barrier, so no geometry query can observe a half-reestimated snapshot.

use keel_geometry::Size;
use rayon::prelude::*;

use crate::model::{ItemModel, SectionModel};

/// Items per work unit when splitting one section's array.
const REESTIMATE_CHUNK: usize = 64;

/// Recomputes estimates for every item still waiting on a measurement.
/// Returns whether anything changed so the caller can invalidate geometry.
pub(crate) fn reestimate_sections<F>(sections: &mut [SectionModel], recompute: &F) -> bool
where
    F: Fn(&ItemModel) -> Option<Size> + Sync,
{
    sections
        .par_iter_mut()
        .map(|section| {
            let mut changed = false;
            if let Some(header) = section.header.as_mut() {
                changed |= reestimate_item(header, recompute);
            }
            if let Some(footer) = section.footer.as_mut() {
                changed |= reestimate_item(footer, recompute);
            }
            let items_changed = section
                .items
                .par_chunks_mut(REESTIMATE_CHUNK)
                .map(|chunk| {
                    let mut chunk_changed = false;
                    for item in chunk {
                        chunk_changed |= reestimate_item(item, recompute);
                    }
                    chunk_changed
                })
                .reduce(|| false, |a, b| a || b);
            changed || items_changed
        })
        .reduce(|| false, |a, b| a || b)
}

fn reestimate_item<F>(item: &mut ItemModel, recompute: &F) -> bool
where
    F: Fn(&ItemModel) -> Option<Size> + Sync,
{
    // A calculated size is authoritative; estimates only matter before
    // measurement and for exact items not at all.
    if item.is_exact() || item.calculated_size.is_some() {
        return false;
    }
    match recompute(item) {
        Some(size) if size != item.estimated_size => {
            item.estimated_size = size;
            true
        }
        _ => false,
    }
}
