use crate::rect::Rect;

/// Per-frame report for one live target.
#[derive(Debug, Clone)]
pub struct Track {
    pub label: u32,

    /// Consecutive frames without an accepted observation.
    pub time_since_update: u32,

    /// Smoothed (posterior) centroid, in px.
    pub position: [f32; 2],

    /// Box centered on the centroid, sized to the appearance template when
    /// one is stored.
    pub bbox: Rect,
}
