use serde_derive::{Deserialize, Serialize};

/// Sentinel value detectors emit for an unobserved coordinate.
pub const MISSING: f32 = -1.0;

/// Per-frame detector output for one marker id: center plus 4 corners,
/// any of which may be the (-1, -1) missing sentinel.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MarkerObservation {
    pub center: [f32; 2],
    pub corners: [[f32; 2]; 4],
}

impl MarkerObservation {
    #[inline]
    pub fn new(center: [f32; 2], corners: [[f32; 2]; 4]) -> Self {
        Self { center, corners }
    }

    /// Observation with every coordinate set to the missing sentinel.
    #[inline]
    pub fn missing() -> Self {
        Self {
            center: [MISSING; 2],
            corners: [[MISSING; 2]; 4],
        }
    }

    /// Center-only observation, corners missing.
    #[inline]
    pub fn with_center(x: f32, y: f32) -> Self {
        Self {
            center: [x, y],
            corners: [[MISSING; 2]; 4],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    Present,
    Missing,
    /// Exactly one coordinate negative. Detectors never emit this; treated
    /// as missing by the filters.
    Malformed,
}

#[inline]
pub fn classify(x: f32, y: f32) -> Sample {
    if x >= 0.0 && y >= 0.0 {
        Sample::Present
    } else if x < 0.0 && y < 0.0 {
        Sample::Missing
    } else {
        Sample::Malformed
    }
}
