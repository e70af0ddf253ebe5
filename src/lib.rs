pub mod error;
pub mod kalman;
pub mod marker;
pub mod observation;
pub mod patch;
pub mod rect;
pub mod target;

mod track;

pub use error::Error;
pub use kalman::PointFilter;
pub use marker::{MarkerTracker, MarkerTrackerConfig};
pub use observation::MarkerObservation;
pub use patch::Patch;
pub use rect::Rect;
pub use target::{TargetTracker, TargetTrackerConfig};
pub use track::Track;

/// Grayscale image view the appearance-aware tracker crops patches from.
pub type Image<'a> = ndarray::ArrayView2<'a, f32>;
