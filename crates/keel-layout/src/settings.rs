//! Engine configuration.

use keel_geometry::{EdgeInsets, Size};

/// Fallback height assumed for an item before anything has been measured
/// and before a running average exists.
pub const DEFAULT_ITEM_HEIGHT_ESTIMATE: f32 = 40.0;

/// Tunable layout policy for one [`crate::ListLayout`] instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutSettings {
    /// Default spacing between consecutive elements inside a section.
    /// The delegate can override it per section.
    pub inter_item_spacing: f32,
    /// Default spacing between consecutive non-empty sections.
    pub inter_section_spacing: f32,
    /// Padding around the whole content area.
    pub content_insets: EdgeInsets,
    /// Estimate used for items whose delegate declined to guess and for
    /// which no measurement average exists yet.
    pub default_estimate: Size,
    /// Measured sizes within this distance of the current size are treated
    /// as no-ops. Parameterized because the meaningful threshold depends on
    /// the display scale of the rendering surface.
    pub size_epsilon: f32,
    /// Keep the bottom edge of the content pinned while heights change,
    /// the policy a streaming chat transcript wants.
    pub keep_content_at_bottom: bool,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            inter_item_spacing: 0.0,
            inter_section_spacing: 0.0,
            content_insets: EdgeInsets::ZERO,
            default_estimate: Size::new(0.0, DEFAULT_ITEM_HEIGHT_ESTIMATE),
            // Half a logical pixel.
            size_epsilon: 0.5,
            keep_content_at_bottom: false,
        }
    }
}
