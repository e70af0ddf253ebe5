use serde_derive::{Deserialize, Serialize};

use crate::error::Error;
use crate::kalman::PointFilter;
use crate::observation::MarkerObservation;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MarkerTrackerConfig {
    /// Base time step of the velocity term.
    pub velocity_factor: f32,
    /// Acceleration time step; negative selects the 4-state model.
    pub acceleration_factor: f32,
    /// Consecutive misses after which a marker stops being extrapolated.
    pub max_missing: u32,
}

impl Default for MarkerTrackerConfig {
    fn default() -> Self {
        Self {
            velocity_factor: 1.0,
            acceleration_factor: -1.0,
            max_missing: 20,
        }
    }
}

/// Filter state for one fixed marker id: a Kalman filter on the center and
/// a plain (dx, dy) offset per corner. Corners are reconstructed from the
/// filtered center rather than filtered independently.
#[derive(Debug)]
struct MarkerTrack {
    id: i32,
    filter: PointFilter,
    missing: u32,
    deltas: [[f32; 2]; 4],
}

/// Smooths and gap-fills the center/corner streams of a fixed, known set of
/// marker ids. One filter per id, created up front, never removed.
///
/// Frames must be fed in ascending order; each `step` output depends only on
/// the frames seen so far. The first frame is consumed by the constructor
/// and passes through unfiltered.
#[derive(Debug)]
pub struct MarkerTracker {
    cfg: MarkerTrackerConfig,
    tracks: Vec<MarkerTrack>,
}

impl MarkerTracker {
    /// One filter per id, initialized at the first frame's centers.
    /// Fails fast when the id list and observation row disagree in length.
    pub fn new(
        ids: &[i32],
        first_frame: &[MarkerObservation],
        cfg: MarkerTrackerConfig,
    ) -> Result<Self, Error> {
        if ids.len() != first_frame.len() {
            return Err(Error::ObservationCountMismatch {
                expected: ids.len(),
                got: first_frame.len(),
            });
        }

        let tracks = ids
            .iter()
            .zip(first_frame)
            .map(|(&id, obs)| MarkerTrack {
                id,
                filter: PointFilter::new(
                    obs.center[0],
                    obs.center[1],
                    cfg.velocity_factor,
                    cfg.acceleration_factor,
                ),
                missing: 0,
                deltas: [[0.0; 2]; 4],
            })
            .collect();

        Ok(Self { cfg, tracks })
    }

    /// Filters one frame of observations, ordered like the id list.
    /// Missing centers are replaced by the prediction, missing corners by
    /// the filtered center plus the last known corner offset.
    pub fn step(
        &mut self,
        observations: &[MarkerObservation],
    ) -> Result<Vec<MarkerObservation>, Error> {
        if observations.len() != self.tracks.len() {
            return Err(Error::ObservationCountMismatch {
                expected: self.tracks.len(),
                got: observations.len(),
            });
        }

        let mut filtered = Vec::with_capacity(observations.len());

        for (track, obs) in self.tracks.iter_mut().zip(observations) {
            // Every 5 consecutive misses stretch the effective time step by
            // one, widening the extrapolation while the marker is unseen.
            let dt = (track.missing / 5) as f32 + self.cfg.velocity_factor;
            track
                .filter
                .set_transition(dt, self.cfg.acceleration_factor);

            let center = track.filter.update_step(
                obs.center[0],
                obs.center[1],
                &mut track.missing,
                self.cfg.max_missing,
            );

            let mut corners = obs.corners;
            for (corner, delta) in corners.iter_mut().zip(track.deltas.iter_mut()) {
                *corner = relative_update(center, *corner, delta, track.missing, self.cfg.max_missing);
            }

            filtered.push(MarkerObservation { center, corners });
        }

        Ok(filtered)
    }

    #[inline]
    pub fn ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.tracks.iter().map(|t| t.id)
    }

    /// Consecutive missed frames for the given id.
    pub fn missing(&self, id: i32) -> Option<u32> {
        self.tracks.iter().find(|t| t.id == id).map(|t| t.missing)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Corner position from the filtered center. Present corners refresh the
/// stored offset; missing corners are synthesized from it while the center
/// is still within its extrapolation window.
fn relative_update(
    center: [f32; 2],
    corner: [f32; 2],
    delta: &mut [f32; 2],
    missing: u32,
    max_missing: u32,
) -> [f32; 2] {
    if missing < max_missing && (corner[0] < 0.0 || corner[1] < 0.0) {
        [delta[0] + center[0], delta[1] + center[1]]
    } else if corner[0] >= 0.0 && corner[1] >= 0.0 {
        *delta = [corner[0] - center[0], corner[1] - center[1]];
        corner
    } else {
        corner
    }
}
