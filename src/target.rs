use serde_derive::{Deserialize, Serialize};

use crate::kalman::PointFilter;
use crate::patch::Patch;
use crate::rect::Rect;
use crate::track::Track;
use crate::Image;

/// Reported box size for targets without an appearance template.
const FALLBACK_BOX: f32 = 6.0;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TargetTrackerConfig {
    /// Half-width of the square association gate, in pixels.
    pub gate: f32,
    /// Consecutive misses after which a target is retired.
    pub max_missing: u32,
    /// Base time step of freshly spawned filters.
    pub velocity_factor: f32,
    /// Acceleration time step; negative selects the 4-state model.
    pub acceleration_factor: f32,
    /// Minimum template correlation for a gated match to be accepted.
    /// `None` disables the appearance check entirely.
    pub min_correlation: Option<f32>,
}

impl TargetTrackerConfig {
    /// Gate-only association.
    pub fn basic() -> Self {
        Self {
            gate: 20.0,
            max_missing: 23,
            velocity_factor: 1.5,
            acceleration_factor: -1.0,
            min_correlation: None,
        }
    }

    /// Gated association confirmed by template correlation.
    pub fn appearance() -> Self {
        Self {
            max_missing: 18,
            min_correlation: Some(0.97),
            ..Self::basic()
        }
    }
}

impl Default for TargetTrackerConfig {
    fn default() -> Self {
        Self::basic()
    }
}

#[derive(Debug)]
struct Target {
    label: u32,
    filter: PointFilter,
    missing: u32,
    template: Option<Patch>,
    predicted: [f32; 2],
}

/// Tracks a changing population of moving blobs with persistent labels.
///
/// Association is a first-match linear scan over the live targets in
/// creation order: the first target whose prediction gates a blob wins,
/// deliberately biasing ties toward older targets. Unmatched blobs spawn
/// new targets; targets unseen for more than `max_missing` frames are
/// dropped.
pub struct TargetTracker {
    cfg: TargetTrackerConfig,
    targets: Vec<Target>,
    next_label: u32,
}

impl TargetTracker {
    pub fn new(cfg: TargetTrackerConfig) -> Self {
        Self {
            cfg,
            targets: Vec::new(),
            next_label: 1,
        }
    }

    /// Consumes one frame of blob candidates, in detector order. `image` is
    /// only sampled when the appearance check is enabled; without it gated
    /// matches are accepted on the gate alone.
    ///
    /// An empty blob list is not an error: every target coasts on its
    /// prediction and ages toward retirement.
    pub fn update(&mut self, blobs: &[Rect], image: Option<Image<'_>>) {
        for target in &mut self.targets {
            target.predicted = target.filter.predict();
            target.missing += 1;
        }

        let mut matched = vec![false; self.targets.len()];
        let mut spawned = Vec::new();

        for blob in blobs {
            let [cx, cy] = blob.center();
            let mut found = false;
            let mut close = false;

            // Targets spawned earlier this frame are not candidates.
            for (target, taken) in self.targets.iter_mut().zip(matched.iter_mut()) {
                if *taken {
                    continue;
                }

                let dx = cx - target.predicted[0];
                let dy = cy - target.predicted[1];

                if dx.abs() >= self.cfg.gate || dy.abs() >= self.cfg.gate {
                    continue;
                }

                if let Some(min_correlation) = self.cfg.min_correlation {
                    if let (Some(img), Some(template)) = (image.as_ref(), target.template.as_ref()) {
                        let candidate = Patch::crop(img.view(), blob);
                        let score = candidate
                            .resized(template.rows(), template.cols())
                            .correlation(template);

                        if score <= min_correlation {
                            // Gated but unconfirmed: keep scanning, and make
                            // sure this blob cannot spawn a duplicate of an
                            // already tracked object.
                            close = true;
                            continue;
                        }

                        target.template = Some(candidate);
                    }
                }

                target.filter.correct(cx, cy);
                target.missing = 0;
                *taken = true;
                found = true;
                break;
            }

            if !found && !close {
                log::debug!("spawning target {} at ({}, {})", self.next_label, cx, cy);

                spawned.push(Target {
                    label: self.next_label,
                    filter: PointFilter::new(
                        cx,
                        cy,
                        self.cfg.velocity_factor,
                        self.cfg.acceleration_factor,
                    ),
                    missing: 0,
                    template: image.as_ref().map(|img| Patch::crop(img.view(), blob)),
                    predicted: [cx, cy],
                });
                self.next_label += 1;
            }
        }

        self.targets.extend(spawned);

        let max_missing = self.cfg.max_missing;
        self.targets.retain(|target| {
            if target.missing > max_missing {
                log::debug!(
                    "retiring target {} after {} missed frames",
                    target.label,
                    target.missing
                );
                false
            } else {
                true
            }
        });
    }

    /// Current live targets for rendering or export, in creation order.
    /// The box is sized to the stored template when one exists.
    pub fn tracks(&self) -> Vec<Track> {
        self.targets
            .iter()
            .map(|target| {
                let [x, y] = target.filter.position();
                let (w, h) = match &target.template {
                    Some(template) => (template.cols() as f32, template.rows() as f32),
                    None => (FALLBACK_BOX, FALLBACK_BOX),
                };

                Track {
                    label: target.label,
                    time_since_update: target.missing,
                    position: [x, y],
                    bbox: Rect::centered(x, y, w, h),
                }
            })
            .collect()
    }

    /// Consecutive missed frames for the given label.
    pub fn missing(&self, label: u32) -> Option<u32> {
        self.targets
            .iter()
            .find(|t| t.label == label)
            .map(|t| t.missing)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn blob(cx: f32, cy: f32) -> Rect {
        Rect::centered(cx, cy, 10.0, 10.0)
    }

    fn labels(tracker: &TargetTracker) -> Vec<u32> {
        tracker.tracks().iter().map(|t| t.label).collect()
    }

    #[test]
    fn unmatched_blobs_spawn_sequentially_labeled_targets() {
        let mut tracker = TargetTracker::new(TargetTrackerConfig::basic());

        tracker.update(&[blob(100.0, 100.0), blob(300.0, 100.0)], None);

        assert_eq!(labels(&tracker), vec![1, 2]);
    }

    #[test]
    fn gated_blob_keeps_its_label() {
        let mut tracker = TargetTracker::new(TargetTrackerConfig::basic());

        tracker.update(&[blob(100.0, 100.0)], None);
        tracker.update(&[blob(105.0, 103.0)], None);

        assert_eq!(labels(&tracker), vec![1]);
        assert_eq!(tracker.missing(1), Some(0));
    }

    #[test]
    fn first_match_prefers_the_older_target() {
        let mut tracker = TargetTracker::new(TargetTrackerConfig::basic());

        // Target 1 at x=100, then target 2 at x=125 (outside 1's gate).
        tracker.update(&[blob(100.0, 100.0)], None);
        tracker.update(&[blob(100.0, 100.0), blob(125.0, 100.0)], None);
        assert_eq!(labels(&tracker), vec![1, 2]);

        // A blob inside both gates must land on target 1; target 2 coasts.
        tracker.update(&[blob(112.0, 100.0)], None);

        assert_eq!(tracker.missing(1), Some(0));
        assert_eq!(tracker.missing(2), Some(1));
    }

    #[test]
    fn matched_target_is_not_matched_twice_in_one_frame() {
        let mut tracker = TargetTracker::new(TargetTrackerConfig::basic());

        tracker.update(&[blob(100.0, 100.0)], None);

        // Both blobs gate onto target 1; the second must spawn a new target
        // instead of re-correcting it.
        tracker.update(&[blob(102.0, 100.0), blob(98.0, 100.0)], None);

        assert_eq!(labels(&tracker), vec![1, 2]);
    }

    #[test]
    fn empty_frames_make_targets_coast_and_retire() {
        let cfg = TargetTrackerConfig {
            max_missing: 3,
            ..TargetTrackerConfig::basic()
        };
        let mut tracker = TargetTracker::new(cfg);

        tracker.update(&[blob(100.0, 100.0)], None);
        assert_eq!(tracker.len(), 1);

        for expected in 1..=3 {
            tracker.update(&[], None);
            assert_eq!(tracker.missing(1), Some(expected));
            assert_eq!(tracker.len(), 1);
        }

        // Counter hits 4 > 3 this frame: removed exactly now.
        tracker.update(&[], None);
        assert!(tracker.is_empty());
    }

    #[test]
    fn reacquired_target_stops_aging() {
        let mut tracker = TargetTracker::new(TargetTrackerConfig::basic());

        tracker.update(&[blob(100.0, 100.0)], None);
        tracker.update(&[], None);
        tracker.update(&[], None);
        assert_eq!(tracker.missing(1), Some(2));

        tracker.update(&[blob(101.0, 100.0)], None);
        assert_eq!(tracker.missing(1), Some(0));
        assert_eq!(labels(&tracker), vec![1]);
    }

    #[test]
    fn tracks_report_template_sized_boxes() {
        let image = Array2::from_shape_fn((64, 64), |(r, c)| (r * 64 + c) as f32);
        let mut tracker = TargetTracker::new(TargetTrackerConfig::appearance());

        tracker.update(&[Rect::ltwh(10.0, 20.0, 12.0, 8.0)], Some(image.view()));

        let tracks = tracker.tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].bbox.w, 12.0);
        assert_eq!(tracks[0].bbox.h, 8.0);

        let mut basic = TargetTracker::new(TargetTrackerConfig::basic());
        basic.update(&[blob(100.0, 100.0)], None);
        assert_eq!(basic.tracks()[0].bbox.w, FALLBACK_BOX);
    }

    #[test]
    fn appearance_match_accepts_similar_patches() {
        let image = Array2::from_shape_fn((64, 64), |(r, c)| ((r + c) % 17) as f32);
        let mut tracker = TargetTracker::new(TargetTrackerConfig::appearance());

        let b = Rect::ltwh(10.0, 10.0, 12.0, 12.0);
        tracker.update(&[b], Some(image.view()));

        // Same texture at the same spot correlates at 1.0.
        tracker.update(&[b], Some(image.view()));

        assert_eq!(labels(&tracker), vec![1]);
        assert_eq!(tracker.missing(1), Some(0));
    }

    #[test]
    fn rejected_correlation_spawns_nothing_and_corrects_nothing() {
        let image = Array2::from_shape_fn((64, 64), |(r, c)| (r * 64 + c) as f32);
        let inverted = image.mapv(|v| 4096.0 - v);
        let mut tracker = TargetTracker::new(TargetTrackerConfig::appearance());

        let b = Rect::ltwh(10.0, 10.0, 12.0, 12.0);
        tracker.update(&[b], Some(image.view()));

        // Same place, opposite texture: gated but unconfirmed. The blob is
        // "close", so it neither matches nor spawns.
        tracker.update(&[b], Some(inverted.view()));

        assert_eq!(labels(&tracker), vec![1]);
        assert_eq!(tracker.missing(1), Some(1));
    }
}
