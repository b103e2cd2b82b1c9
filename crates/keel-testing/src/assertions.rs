//! Geometry assertion helpers shared by the integration suites.

use keel_geometry::Rect;
use keel_layout::{ElementRef, ListLayout};

/// A rect large enough to intersect any realistic content.
const EVERYTHING: Rect = Rect::new(-1.0e9, -1.0e9, 2.0e9, 2.0e9);

/// Every element in the live snapshot, in scroll order, with its frame.
pub fn all_elements(layout: &mut ListLayout) -> Vec<(ElementRef, Rect)> {
    layout
        .elements_in(EVERYTHING)
        .into_iter()
        .map(|element| {
            let frame = layout
                .frame(element.path, element.kind)
                .expect("listed element must have a frame");
            (element, frame)
        })
        .collect()
}

/// Asserts that frames never overlap and appear in scroll order. Elements
/// sharing a stretch row sit at the same offset and are exempt from the
/// pairwise check.
pub fn assert_frame_monotonicity(layout: &mut ListLayout) {
    let elements = all_elements(layout);
    for pair in elements.windows(2) {
        let (ref a_ref, a) = pair[0];
        let (ref b_ref, b) = pair[1];
        if a.min_y() == b.min_y() {
            continue;
        }
        assert!(
            a.max_y() <= b.min_y() + 1.0e-3,
            "frame order violated: {a_ref:?} ends at {} but {b_ref:?} starts at {}",
            a.max_y(),
            b.min_y()
        );
    }
}

/// Asserts that the reported content height matches the furthest frame
/// extent plus the bottom inset.
pub fn assert_height_additivity(layout: &mut ListLayout) {
    let insets = layout.settings().content_insets;
    let elements = all_elements(layout);
    let expected = elements
        .iter()
        .map(|(_, frame)| frame.max_y())
        .fold(insets.top, f32::max)
        + insets.bottom;
    let actual = layout.content_height();
    assert!(
        (actual - expected).abs() < 1.0e-3,
        "content height {actual} does not match furthest extent {expected}"
    );
}
