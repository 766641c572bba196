//! Orientation-aware region growing.
//!
//! A grain grows generation by generation from a seed atom: every accepted
//! atom contributes its shell neighbors as candidates of the next
//! generation, tagged with the accepting atom as growth parent. Acceptance
//! compares candidate and parent orientation; once the grain exceeds 100
//! atoms, candidates must additionally stay within three times the angular
//! threshold of the grain's running mean orientation, which stops slow
//! orientation drift across a low-angle boundary.
//!
//! Candidate positions are accumulated from the seed outwards, so a grain
//! wrapping a periodic boundary keeps an unwrapped, contiguous coordinate
//! set and its center does not collapse to the box interior.

use crate::model::atom::{AtomHandle, GrainId, OriId};
use crate::model::grain::Grain;
use crate::model::orientation::{cos_half_from_rad, have_close_orientations};

use super::index::SpatialIndex;
use super::orient::OrientationTable;

/// Grain size up to which only the parent test applies.
const PLAIN_TEST_LIMIT: usize = 100;

/// Mean-orientation refresh period, in accepted atoms.
const MEAN_REFRESH_PERIOD: usize = 100;

/// A prospective grain member: the atom, its accumulated absolute
/// position, and the orientation of the atom that proposed it.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    handle: AtomHandle,
    position: [f64; 3],
    parent_orientation: OriId,
}

/// Region-growing engine; one instance serves all seeds of a snapshot.
#[derive(Debug)]
pub struct GrowthEngine {
    cos_half_threshold: f64,
    big_cos_half_threshold: f64,
    r_sqr_min: f64,
    r_sqr_max: f64,
    max_neighbors: usize,
}

impl GrowthEngine {
    /// `angular_threshold` in radians; the shell window selects growth
    /// neighbors, `max_neighbors` caps the shell search.
    pub fn new(
        angular_threshold: f64,
        r_sqr_min: f64,
        r_sqr_max: f64,
        max_neighbors: usize,
    ) -> Self {
        Self {
            cos_half_threshold: cos_half_from_rad(angular_threshold),
            big_cos_half_threshold: cos_half_from_rad(3.0 * angular_threshold),
            r_sqr_min,
            r_sqr_max,
            max_neighbors,
        }
    }

    /// Grows one grain from `seed`, writing `grain_id` into every accepted
    /// atom. Returns the number of atoms collected; 0 when the seed itself
    /// is unusable (already assigned or without orientation).
    pub fn grow(
        &self,
        index: &mut SpatialIndex,
        orientations: &OrientationTable,
        seed: AtomHandle,
        grain_id: GrainId,
        grain: &mut Grain,
    ) -> usize {
        let seed_atom = index.atom(seed);
        let Some(seed_ori) = seed_atom.orientation() else {
            return 0;
        };
        if seed_atom.grain().is_some() {
            return 0;
        }

        let mut current = vec![Candidate {
            handle: seed,
            position: index.global_position(seed),
            parent_orientation: seed_ori,
        }];
        let mut next = Vec::new();

        while !current.is_empty() {
            for candidate in &current {
                if !self.accept(index, orientations, grain, candidate) {
                    continue;
                }
                let ori = index.atom(candidate.handle).orientation();
                // accept() guarantees an orientation
                let Some(ori) = ori else { continue };
                index.atom_mut(candidate.handle).set_grain(Some(grain_id));
                grain.add(candidate.handle, orientations.quaternion(ori));
                grain.add_to_center(&candidate.position);
                if grain.num_atoms() % MEAN_REFRESH_PERIOD == 1 {
                    grain.refresh_mean_orientation();
                }
                // An overfull shell contributes no candidates, like an
                // empty one.
                let shell = index
                    .shell_neighbors(
                        candidate.handle,
                        self.r_sqr_min,
                        self.r_sqr_max,
                        self.max_neighbors,
                    )
                    .unwrap_or_default();
                for neighbor in shell {
                    next.push(Candidate {
                        handle: neighbor.handle,
                        position: [
                            candidate.position[0] + neighbor.rel_pos[0],
                            candidate.position[1] + neighbor.rel_pos[1],
                            candidate.position[2] + neighbor.rel_pos[2],
                        ],
                        parent_orientation: ori,
                    });
                }
            }
            current = std::mem::take(&mut next);
        }

        if grain.num_atoms() > 0 {
            grain.finalize_center();
            grain.refresh_mean_orientation();
        }
        grain.num_atoms()
    }

    fn accept(
        &self,
        index: &SpatialIndex,
        orientations: &OrientationTable,
        grain: &Grain,
        candidate: &Candidate,
    ) -> bool {
        let atom = index.atom(candidate.handle);
        if atom.grain().is_some() {
            return false;
        }
        let Some(ori) = atom.orientation() else {
            return false;
        };
        let q = orientations.quaternion(ori);
        let parent_q = orientations.quaternion(candidate.parent_orientation);
        if !have_close_orientations(q, parent_q, self.cos_half_threshold) {
            return false;
        }
        if grain.num_atoms() > PLAIN_TEST_LIMIT
            && !have_close_orientations(q, grain.mean_quaternion(), self.big_cos_half_threshold)
        {
            return false;
        }
        true
    }
}
