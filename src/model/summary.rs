//! Detached per-grain and per-frame summaries.
//!
//! A [`GrainSummary`] carries everything the tracking stage and the table
//! writers need to know about a grain without holding on to its atoms; a
//! [`FrameSummary`] bundles the grain summaries of one snapshot with the
//! simulation box they live in. Both serialize, so summaries round-trip
//! through the grain tables on disk.

use serde::{Deserialize, Serialize};

use super::atom::GrainId;
use super::grain::Grain;
use super::lattice::CubicLattice;
use super::orientation::Orientation;

/// Summary of one detected grain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrainSummary {
    /// Geometric center, absolute coordinates in Å.
    pub center: [f64; 3],
    /// Mean orientation quaternion, scalar first.
    pub quaternion: [f64; 4],
    pub num_atoms: u64,
    pub num_regular_atoms: u64,
    pub num_orphan_atoms: u64,
    /// Mean misorientation of regular members to the mean, radians.
    pub orientation_spread: f64,
    /// Persistent cross-frame identifier, if assigned.
    pub assigned_id: Option<GrainId>,
    /// Per-property means over member atoms, in frame property order.
    pub mean_properties: Vec<f64>,
    /// Misorientation to the grain's state in the tracking reference
    /// frame, radians. Zero until tracking has run.
    #[serde(default)]
    pub misorientation_to_initial: f64,
    /// Like [`misorientation_to_initial`], reduced by cubic symmetry.
    ///
    /// [`misorientation_to_initial`]: GrainSummary::misorientation_to_initial
    #[serde(default)]
    pub reduced_misorientation_to_initial: f64,
    /// Distance the grain center traveled since the tracking reference
    /// frame, Å.
    #[serde(default)]
    pub distance_to_initial: f64,
}

impl GrainSummary {
    pub fn from_grain(grain: &Grain, mean_properties: Vec<f64>) -> Self {
        Self {
            center: *grain.center(),
            quaternion: *grain.mean_quaternion(),
            num_atoms: grain.num_atoms() as u64,
            num_regular_atoms: grain.num_regular_atoms() as u64,
            num_orphan_atoms: grain.num_orphan_atoms() as u64,
            orientation_spread: grain.orientation_spread(),
            assigned_id: grain.assigned_id(),
            mean_properties,
            misorientation_to_initial: 0.0,
            reduced_misorientation_to_initial: 0.0,
            distance_to_initial: 0.0,
        }
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::from_quaternion(self.quaternion)
    }

    /// Grain volume in Å³.
    pub fn volume(&self, lattice: &CubicLattice) -> f64 {
        self.num_atoms as f64 * lattice.volume_per_atom()
    }

    /// Grain volume in the lattice's configured volume unit.
    pub fn volume_in_unit(&self, lattice: &CubicLattice) -> f64 {
        self.num_atoms as f64 * lattice.volume_per_atom_in_unit()
    }
}

/// The grains of one snapshot together with its simulation box.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameSummary {
    origin: [f64; 3],
    size: [f64; 3],
    periodic: bool,
    property_names: Vec<String>,
    grains: Vec<GrainSummary>,
}

impl FrameSummary {
    pub fn new(origin: [f64; 3], size: [f64; 3], periodic: bool) -> Self {
        Self {
            origin,
            size,
            periodic,
            property_names: Vec::new(),
            grains: Vec::new(),
        }
    }

    pub fn origin(&self) -> &[f64; 3] {
        &self.origin
    }

    pub fn size(&self) -> &[f64; 3] {
        &self.size
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    pub fn property_names(&self) -> &[String] {
        &self.property_names
    }

    pub fn set_property_names(&mut self, names: Vec<String>) {
        self.property_names = names;
    }

    pub fn add_grain(&mut self, grain: GrainSummary) {
        self.grains.push(grain);
    }

    pub fn grains(&self) -> &[GrainSummary] {
        &self.grains
    }

    pub fn grains_mut(&mut self) -> &mut [GrainSummary] {
        &mut self.grains
    }

    pub fn num_grains(&self) -> usize {
        self.grains.len()
    }

    pub fn grain(&self, id: usize) -> Option<&GrainSummary> {
        self.grains.get(id)
    }

    /// Largest assigned id over all grains, 0 if none is assigned.
    pub fn max_assigned_id(&self) -> GrainId {
        self.grains
            .iter()
            .filter_map(|g| g.assigned_id)
            .max()
            .unwrap_or(0)
    }

    /// Maps a coordinate into the box, `origin + [0, size)` per dimension.
    /// Coordinates pass through unchanged for non-periodic boxes.
    fn reduced_coordinate(&self, pos: f64, dim: usize) -> f64 {
        if !self.periodic {
            return pos;
        }
        let rest = (pos - self.origin[dim]) % self.size[dim];
        if rest >= 0.0 {
            self.origin[dim] + rest
        } else {
            self.origin[dim] + rest + self.size[dim]
        }
    }

    /// Maps a point into the box (identity for non-periodic boxes).
    pub fn reduced_point(&self, p: &[f64; 3]) -> [f64; 3] {
        [
            self.reduced_coordinate(p[0], 0),
            self.reduced_coordinate(p[1], 1),
            self.reduced_coordinate(p[2], 2),
        ]
    }

    /// Squared distance between two points, minimum-image for periodic
    /// boxes.
    pub fn sqr_distance(&self, p1: &[f64; 3], p2: &[f64; 3]) -> f64 {
        if !self.periodic {
            return (0..3).map(|i| (p1[i] - p2[i]) * (p1[i] - p2[i])).sum();
        }
        let r1 = self.reduced_point(p1);
        let r2 = self.reduced_point(p2);
        let mut sum = 0.0;
        for i in 0..3 {
            let mut d = (r2[i] - r1[i]).abs();
            if d > 0.5 * self.size[i] {
                d = self.size[i] - d;
            }
            sum += d * d;
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(periodic: bool) -> FrameSummary {
        FrameSummary::new([0.0, 0.0, 0.0], [10.0, 10.0, 10.0], periodic)
    }

    fn summary(id: Option<GrainId>) -> GrainSummary {
        GrainSummary {
            center: [1.0, 2.0, 3.0],
            quaternion: [1.0, 0.0, 0.0, 0.0],
            num_atoms: 8,
            num_regular_atoms: 6,
            num_orphan_atoms: 2,
            orientation_spread: 0.01,
            assigned_id: id,
            mean_properties: vec![],
            misorientation_to_initial: 0.0,
            reduced_misorientation_to_initial: 0.0,
            distance_to_initial: 0.0,
        }
    }

    #[test]
    fn periodic_distance_wraps_around() {
        let f = frame(true);
        let d = f.sqr_distance(&[0.5, 0.0, 0.0], &[9.5, 0.0, 0.0]);
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn nonperiodic_distance_does_not_wrap() {
        let f = frame(false);
        let d = f.sqr_distance(&[0.5, 0.0, 0.0], &[9.5, 0.0, 0.0]);
        assert!((d - 81.0).abs() < 1e-12);
    }

    #[test]
    fn reduced_point_maps_into_box() {
        let f = frame(true);
        let p = f.reduced_point(&[12.5, -0.5, 3.0]);
        assert!((p[0] - 2.5).abs() < 1e-12);
        assert!((p[1] - 9.5).abs() < 1e-12);
        assert!((p[2] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn max_assigned_id_skips_unassigned() {
        let mut f = frame(true);
        f.add_grain(summary(Some(7)));
        f.add_grain(summary(None));
        f.add_grain(summary(Some(3)));
        assert_eq!(f.max_assigned_id(), 7);
    }

    #[test]
    fn max_assigned_id_defaults_to_zero() {
        assert_eq!(frame(true).max_assigned_id(), 0);
    }

    #[test]
    fn volume_scales_with_atom_count() {
        let lattice = CubicLattice::fcc(4.0, Default::default(), "Al");
        let g = summary(None);
        assert!((g.volume(&lattice) - 8.0 * 16.0).abs() < 1e-9);
    }
}
