//! Cross-frame grain tracking.
//!
//! The tracker carries grain identities through a time series of frame
//! summaries: each frame's grains are matched greedily against the
//! previous frame ([`matcher`]), unmatched grains draw fresh ids from a
//! monotonic counter, and every grain accumulates its drift relative to
//! the frame in which its id first appeared. Tracking is sequential by
//! nature; it runs after the per-frame detection batch.

pub mod matcher;

pub use matcher::{GrainMatcher, IdMapping};

use crate::model::atom::GrainId;
use crate::model::lattice::CubicLattice;
use crate::model::orientation::{cos_half_from_rad, misorientation};
use crate::model::summary::{FrameSummary, GrainSummary};
use crate::model::symmetry::cubic_misorientation;

/// Parameters of the cross-frame matching stage.
#[derive(Debug, Clone)]
pub struct TrackConfig {
    /// Maximum misorientation between matching partners, radians.
    pub max_misorientation: f64,
    /// Upper volume-change fraction between matching partners. Carried in
    /// the configuration for forward compatibility; matching does not
    /// evaluate it.
    pub max_volume_fraction: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            max_misorientation: 5.0_f64.to_radians(),
            max_volume_fraction: 0.5,
        }
    }
}

/// Tracks grain identities over consecutive frames.
pub struct GrainTracker {
    lattice: CubicLattice,
    cos_half_threshold: f64,
    prev: FrameSummary,
    next_id: GrainId,
    initial_states: Vec<Option<GrainSummary>>,
}

impl GrainTracker {
    /// Seeds the tracker from a restart table whose ids may be sparse;
    /// fresh ids continue above the largest one present.
    pub fn from_restart(config: &TrackConfig, lattice: CubicLattice, initial: FrameSummary) -> Self {
        let next_id = initial.max_assigned_id() + 1;
        Self::new(config, lattice, initial, next_id)
    }

    /// Seeds the tracker from the first frame of the series, whose ids are
    /// dense `0..n`.
    pub fn from_first_frame(
        config: &TrackConfig,
        lattice: CubicLattice,
        initial: FrameSummary,
    ) -> Self {
        let next_id = initial.num_grains() as GrainId;
        Self::new(config, lattice, initial, next_id)
    }

    fn new(
        config: &TrackConfig,
        lattice: CubicLattice,
        initial: FrameSummary,
        next_id: GrainId,
    ) -> Self {
        let mut tracker = Self {
            lattice,
            cos_half_threshold: cos_half_from_rad(config.max_misorientation),
            prev: initial,
            next_id,
            initial_states: Vec::new(),
        };
        for grain in tracker.prev.grains() {
            if let Some(id) = grain.assigned_id {
                record_initial_state(&mut tracker.initial_states, id, grain);
            }
        }
        tracker
    }

    /// Number the next unmatched grain would receive.
    pub fn next_id(&self) -> GrainId {
        self.next_id
    }

    /// Carries ids into `cur`: matches against the previous frame,
    /// rewrites assigned ids in place, updates the drift statistics, and
    /// makes `cur` the reference for the following frame. Returns the id
    /// mapping for rewriting per-atom exports.
    pub fn advance(&mut self, cur: &mut FrameSummary) -> IdMapping {
        let matcher = GrainMatcher::new(&self.prev, &self.lattice, self.cos_half_threshold, self.next_id);
        let (mapping, next_id) = matcher.map(cur);
        self.next_id = next_id;
        self.update_drift(cur);
        self.prev = cur.clone();
        mapping
    }

    /// Misorientation and center travel of every grain relative to its
    /// state in the frame where its id first appeared.
    fn update_drift(&mut self, cur: &mut FrameSummary) {
        let mut drift = Vec::with_capacity(cur.num_grains());
        for grain in cur.grains() {
            let initial = grain
                .assigned_id
                .and_then(|id| self.initial_states.get(id as usize))
                .and_then(|s| s.as_ref());
            drift.push(initial.map(|init| {
                (
                    misorientation(&grain.quaternion, &init.quaternion),
                    cubic_misorientation(&grain.quaternion, &init.quaternion),
                    cur.sqr_distance(&grain.center, &init.center).sqrt(),
                )
            }));
        }
        for (grain, drift) in cur.grains_mut().iter_mut().zip(drift) {
            match drift {
                Some((misori, reduced, distance)) => {
                    grain.misorientation_to_initial = misori;
                    grain.reduced_misorientation_to_initial = reduced;
                    grain.distance_to_initial = distance;
                }
                None => {
                    // first appearance of this id; it becomes the reference
                    if let Some(id) = grain.assigned_id {
                        record_initial_state(&mut self.initial_states, id, grain);
                    }
                }
            }
        }
    }
}

fn record_initial_state(states: &mut Vec<Option<GrainSummary>>, id: GrainId, grain: &GrainSummary) {
    let slot = id as usize;
    if slot >= states.len() {
        states.resize(slot + 1, None);
    }
    states[slot] = Some(grain.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::lattice::VolumeUnit;

    fn lattice() -> CubicLattice {
        CubicLattice::fcc(4.05, VolumeUnit::default(), "Al")
    }

    fn grain(center: [f64; 3], q: [f64; 4], num_atoms: u64, id: GrainId) -> GrainSummary {
        GrainSummary {
            center,
            quaternion: q,
            num_atoms,
            num_regular_atoms: num_atoms,
            num_orphan_atoms: 0,
            orientation_spread: 0.0,
            assigned_id: Some(id),
            mean_properties: vec![],
            misorientation_to_initial: 0.0,
            reduced_misorientation_to_initial: 0.0,
            distance_to_initial: 0.0,
        }
    }

    fn frame(grains: Vec<GrainSummary>) -> FrameSummary {
        let mut f = FrameSummary::new([0.0; 3], [200.0; 3], true);
        for g in grains {
            f.add_grain(g);
        }
        f
    }

    const IDENT: [f64; 4] = [1.0, 0.0, 0.0, 0.0];

    #[test]
    fn ids_persist_over_identical_frames() {
        let seed = frame(vec![
            grain([20.0, 20.0, 20.0], IDENT, 4000, 0),
            grain([90.0, 90.0, 90.0], IDENT, 3000, 1),
        ]);
        let mut tracker = GrainTracker::from_first_frame(&TrackConfig::default(), lattice(), seed.clone());
        let mut cur = seed.clone();
        assert!(tracker.advance(&mut cur).is_identity());
        let mut cur2 = seed;
        assert!(tracker.advance(&mut cur2).is_identity());
        assert_eq!(tracker.next_id(), 2);
    }

    #[test]
    fn restart_numbering_continues_above_the_maximum() {
        let seed = frame(vec![grain([20.0, 20.0, 20.0], IDENT, 4000, 17)]);
        let tracker = GrainTracker::from_restart(&TrackConfig::default(), lattice(), seed);
        assert_eq!(tracker.next_id(), 18);
    }

    #[test]
    fn drift_is_measured_against_the_seed_frame() {
        let seed = frame(vec![grain([20.0, 20.0, 20.0], IDENT, 4000, 0)]);
        let mut tracker = GrainTracker::from_first_frame(&TrackConfig::default(), lattice(), seed);

        let mut cur = frame(vec![grain([23.0, 24.0, 20.0], IDENT, 4000, 0)]);
        tracker.advance(&mut cur);
        let g = cur.grain(0).unwrap();
        assert_eq!(g.assigned_id, Some(0));
        assert!((g.distance_to_initial - 5.0).abs() < 1e-9);
        assert!(g.misorientation_to_initial.abs() < 1e-12);

        // a second step drifts further but still measures against frame 0
        let mut cur2 = frame(vec![grain([26.0, 28.0, 20.0], IDENT, 4000, 0)]);
        tracker.advance(&mut cur2);
        assert!((cur2.grain(0).unwrap().distance_to_initial - 10.0).abs() < 1e-9);
    }

    #[test]
    fn fresh_grains_become_their_own_reference() {
        let seed = frame(vec![grain([20.0, 20.0, 20.0], IDENT, 4000, 0)]);
        let mut tracker = GrainTracker::from_first_frame(&TrackConfig::default(), lattice(), seed);

        let mut cur = frame(vec![
            grain([20.0, 20.0, 20.0], IDENT, 4000, 0),
            grain([150.0, 150.0, 150.0], IDENT, 1000, 1),
        ]);
        tracker.advance(&mut cur);
        assert_eq!(cur.grain(1).unwrap().assigned_id, Some(1));
        assert_eq!(cur.grain(1).unwrap().distance_to_initial, 0.0);

        // the new grain is now tracked against its first appearance
        let mut cur2 = frame(vec![
            grain([20.0, 20.0, 20.0], IDENT, 4000, 0),
            grain([153.0, 150.0, 150.0], IDENT, 1000, 1),
        ]);
        tracker.advance(&mut cur2);
        assert!((cur2.grain(1).unwrap().distance_to_initial - 3.0).abs() < 1e-9);
    }
}
