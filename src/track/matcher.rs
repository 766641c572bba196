//! Greedy matching of grains across two consecutive frames.

use crate::model::atom::GrainId;
use crate::model::lattice::CubicLattice;
use crate::model::orientation::cos_half_misorientation;
use crate::model::summary::{FrameSummary, GrainSummary};

/// Search radius as a fraction of the grain's equivalent-sphere radius.
const EQUIVALENT_SPHERE_FACTOR: f64 = 0.783_901_754_1;

const FOUR_THIRDS_PI: f64 = 4.188_790_204_786_391;

/// The id rewrites produced by matching one frame: pairs of
/// (previous assigned id, persistent id).
#[derive(Debug, Clone, Default)]
pub struct IdMapping {
    pairs: Vec<(GrainId, GrainId)>,
}

impl IdMapping {
    pub fn mapped(&self, old: GrainId) -> Option<GrainId> {
        self.pairs
            .iter()
            .find(|(from, _)| *from == old)
            .map(|&(_, to)| to)
    }

    pub fn pairs(&self) -> &[(GrainId, GrainId)] {
        &self.pairs
    }

    pub fn is_identity(&self) -> bool {
        self.pairs.iter().all(|&(from, to)| from == to)
    }
}

/// Matches the grains of a current frame against an earlier one.
///
/// Grains are visited in frame order (largest first, as detection sorts
/// them). Each grain claims the closest unclaimed previous grain within
/// its equivalent-sphere search radius that also lies within the
/// orientation threshold; grains without a partner draw fresh ids from a
/// monotonic counter.
pub struct GrainMatcher<'a> {
    prev: &'a FrameSummary,
    lattice: &'a CubicLattice,
    cos_half_threshold: f64,
    next_id: GrainId,
    claimed: Vec<bool>,
}

impl<'a> GrainMatcher<'a> {
    pub fn new(
        prev: &'a FrameSummary,
        lattice: &'a CubicLattice,
        cos_half_threshold: f64,
        next_id: GrainId,
    ) -> Self {
        Self {
            prev,
            lattice,
            cos_half_threshold,
            next_id,
            claimed: vec![false; prev.num_grains()],
        }
    }

    /// Rewrites the assigned ids of `cur` in place. Returns the id mapping
    /// (for rewriting per-atom exports) and the counter value for the next
    /// frame.
    pub fn map(mut self, cur: &mut FrameSummary) -> (IdMapping, GrainId) {
        let mut mapped_ids = Vec::with_capacity(cur.num_grains());
        for grain in cur.grains() {
            let id = match self.corresponding(cur, grain) {
                Some(id) => id,
                None => {
                    let id = self.next_id;
                    self.next_id += 1;
                    id
                }
            };
            mapped_ids.push(id);
        }

        let mut pairs = Vec::with_capacity(mapped_ids.len());
        for (grain, &id) in cur.grains_mut().iter_mut().zip(&mapped_ids) {
            if let Some(old) = grain.assigned_id {
                pairs.push((old, id));
            }
            grain.assigned_id = Some(id);
        }
        (IdMapping { pairs }, self.next_id)
    }

    /// The previous-frame partner of `grain`, if any: closest unclaimed
    /// grain within the search radius and the orientation threshold.
    /// Claims the partner.
    fn corresponding(&mut self, frame: &FrameSummary, grain: &GrainSummary) -> Option<GrainId> {
        let radius =
            EQUIVALENT_SPHERE_FACTOR * (grain.volume(self.lattice) / FOUR_THIRDS_PI).cbrt();
        let max_sqr_distance = radius * radius;

        let mut smallest_sqr_distance = max_sqr_distance;
        let mut closest: Option<usize> = None;
        for (i, old) in self.prev.grains().iter().enumerate() {
            if self.claimed[i] || old.assigned_id.is_none() {
                continue;
            }
            let sqr_distance = frame.sqr_distance(&grain.center, &old.center);
            if sqr_distance > max_sqr_distance {
                continue;
            }
            if cos_half_misorientation(&grain.quaternion, &old.quaternion)
                < self.cos_half_threshold
            {
                continue;
            }
            if sqr_distance <= smallest_sqr_distance {
                smallest_sqr_distance = sqr_distance;
                closest = Some(i);
            }
        }

        let i = closest?;
        self.claimed[i] = true;
        self.prev.grains()[i].assigned_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::lattice::VolumeUnit;
    use crate::model::orientation::cos_half_from_rad;

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
    const ROT45Z: [f64; 4] = [0.923_879_532_511_286_7, 0.0, 0.0, 0.382_683_432_365_089_8];

    fn threshold() -> f64 {
        cos_half_from_rad(5.0_f64.to_radians())
    }

    #[test]
    fn identical_frames_map_to_identity() {
        let prev = frame(vec![
            grain([20.0, 20.0, 20.0], IDENT, 4000, 0),
            grain([90.0, 90.0, 90.0], ROT45Z, 3000, 1),
        ]);
        let mut cur = prev.clone();
        let (mapping, next) = GrainMatcher::new(&prev, &lattice(), threshold(), 2).map(&mut cur);
        assert!(mapping.is_identity());
        assert_eq!(next, 2);
        assert_eq!(cur.grain(0).unwrap().assigned_id, Some(0));
        assert_eq!(cur.grain(1).unwrap().assigned_id, Some(1));
    }

    #[test]
    fn new_grain_draws_a_fresh_id() {
        let prev = frame(vec![grain([20.0, 20.0, 20.0], IDENT, 4000, 0)]);
        let mut cur = frame(vec![
            grain([20.0, 20.0, 20.0], IDENT, 4000, 0),
            grain([150.0, 150.0, 150.0], ROT45Z, 500, 1),
        ]);
        let (mapping, next) = GrainMatcher::new(&prev, &lattice(), threshold(), 1).map(&mut cur);
        assert_eq!(cur.grain(0).unwrap().assigned_id, Some(0));
        assert_eq!(cur.grain(1).unwrap().assigned_id, Some(1));
        assert_eq!(mapping.mapped(1), Some(1));
        assert_eq!(next, 2);
    }

    #[test]
    fn misoriented_overlap_is_not_matched() {
        let prev = frame(vec![grain([20.0, 20.0, 20.0], IDENT, 4000, 7)]);
        let mut cur = frame(vec![grain([20.0, 20.0, 20.0], ROT45Z, 4000, 0)]);
        let (mapping, next) = GrainMatcher::new(&prev, &lattice(), threshold(), 8).map(&mut cur);
        assert_eq!(cur.grain(0).unwrap().assigned_id, Some(8));
        assert_eq!(mapping.mapped(0), Some(8));
        assert_eq!(next, 9);
    }

    #[test]
    fn a_previous_grain_is_claimed_once() {
        let prev = frame(vec![grain([20.0, 20.0, 20.0], IDENT, 4000, 3)]);
        let mut cur = frame(vec![
            grain([21.0, 20.0, 20.0], IDENT, 4000, 0),
            grain([19.0, 20.0, 20.0], IDENT, 4000, 1),
        ]);
        let (_, next) = GrainMatcher::new(&prev, &lattice(), threshold(), 4).map(&mut cur);
        assert_eq!(cur.grain(0).unwrap().assigned_id, Some(3));
        assert_eq!(cur.grain(1).unwrap().assigned_id, Some(4));
        assert_eq!(next, 5);
    }

    #[test]
    fn matching_wraps_around_periodic_boundaries() {
        let prev = frame(vec![grain([1.0, 20.0, 20.0], IDENT, 4000, 0)]);
        let mut cur = frame(vec![grain([199.0, 20.0, 20.0], IDENT, 4000, 0)]);
        let (mapping, _) = GrainMatcher::new(&prev, &lattice(), threshold(), 1).map(&mut cur);
        assert!(mapping.is_identity());
        assert_eq!(cur.grain(0).unwrap().assigned_id, Some(0));
    }

    #[test]
    fn distant_grain_is_outside_the_search_radius() {
        // 4000 Al atoms -> equivalent sphere radius about 25 Å, search
        // radius about 20 Å
        let prev = frame(vec![grain([60.0, 20.0, 20.0], IDENT, 4000, 0)]);
        let mut cur = frame(vec![grain([20.0, 20.0, 20.0], IDENT, 4000, 0)]);
        let (_, next) = GrainMatcher::new(&prev, &lattice(), threshold(), 1).map(&mut cur);
        assert_eq!(cur.grain(0).unwrap().assigned_id, Some(1));
        assert_eq!(next, 2);
    }
}
