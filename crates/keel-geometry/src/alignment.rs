//! Cross-axis alignment for list elements

/// Horizontal placement of an element inside the available content width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ItemAlignment {
    /// Pin to the leading edge, keeping the element's own width.
    Leading,
    /// Center within the available width.
    Center,
    /// Pin to the trailing edge, keeping the element's own width.
    Trailing,
    /// Stretch to the full available width.
    #[default]
    Fill,
}

impl ItemAlignment {
    /// Resolves the element's x offset and final width inside `available`.
    ///
    /// `preferred` wider than `available` is clamped rather than allowed to
    /// overflow the content area.
    pub fn resolve(&self, available: f32, preferred: f32) -> (f32, f32) {
        let width = preferred.min(available);
        match self {
            ItemAlignment::Fill => (0.0, available),
            ItemAlignment::Leading => (0.0, width),
            ItemAlignment::Center => (((available - width) / 2.0).max(0.0), width),
            ItemAlignment::Trailing => ((available - width).max(0.0), width),
        }
    }
}
