//! A grain under construction: contiguous atoms of closely matching
//! orientation, collected by the growth engine and extended by orphan
//! adoption.

use super::atom::{AtomHandle, GrainId};
use super::lattice::CubicLattice;
use super::orientation::{cos_half_misorientation, rad_from_cos_half, MeanOrientation};

/// Orientation-spread statistics of one atom population of a grain.
#[derive(Debug, Clone, Copy)]
struct Spread {
    /// Mean misorientation to the grain mean, radians.
    angle: f64,
    /// Mean half-angle cosine of the misorientation to the grain mean.
    cos_half: f64,
}

impl Default for Spread {
    fn default() -> Self {
        Self {
            angle: 0.0,
            cos_half: 1.0,
        }
    }
}

/// One grain of a snapshot.
///
/// Members are the atoms accepted during region growing; they contribute to
/// the quaternion running sum. Orphans are adopted afterwards by majority
/// vote; they count towards the grain's size and statistics but not its
/// mean orientation. Both lists hold handles only; atom storage stays with
/// the spatial index.
#[derive(Debug, Clone, Default)]
pub struct Grain {
    members: Vec<AtomHandle>,
    orphans: Vec<AtomHandle>,
    mean_orientation: MeanOrientation,
    center_sum: [f64; 3],
    n_center: usize,
    center: [f64; 3],
    regular_spread: Spread,
    orphan_spread: Spread,
    total_spread: Spread,
    assigned_id: Option<GrainId>,
}

impl Grain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts an atom as a regular member, folding its orientation into
    /// the quaternion running sum.
    pub fn add(&mut self, handle: AtomHandle, quaternion: &[f64; 4]) {
        self.members.push(handle);
        self.mean_orientation.add(quaternion);
    }

    /// Adopts an orphan atom. No orientation contribution.
    pub fn add_orphan(&mut self, handle: AtomHandle) {
        self.orphans.push(handle);
    }

    /// Folds an absolute atom position into the center running sum.
    pub fn add_to_center(&mut self, pos: &[f64; 3]) {
        self.center_sum[0] += pos[0];
        self.center_sum[1] += pos[1];
        self.center_sum[2] += pos[2];
        self.n_center += 1;
    }

    /// Finalizes the geometric center from the running sum.
    pub fn finalize_center(&mut self) {
        if self.n_center > 0 {
            let inv = 1.0 / self.n_center as f64;
            self.center = [
                self.center_sum[0] * inv,
                self.center_sum[1] * inv,
                self.center_sum[2] * inv,
            ];
        }
    }

    pub fn refresh_mean_orientation(&mut self) {
        self.mean_orientation.refresh();
    }

    #[inline]
    pub fn num_atoms(&self) -> usize {
        self.members.len() + self.orphans.len()
    }

    #[inline]
    pub fn num_regular_atoms(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn num_orphan_atoms(&self) -> usize {
        self.orphans.len()
    }

    pub fn members(&self) -> &[AtomHandle] {
        &self.members
    }

    pub fn orphans(&self) -> &[AtomHandle] {
        &self.orphans
    }

    /// All atoms of the grain, members first.
    pub fn atoms(&self) -> impl Iterator<Item = AtomHandle> + '_ {
        self.members.iter().chain(self.orphans.iter()).copied()
    }

    pub fn center(&self) -> &[f64; 3] {
        &self.center
    }

    pub fn mean_quaternion(&self) -> &[f64; 4] {
        self.mean_orientation.quaternion()
    }

    pub fn assigned_id(&self) -> Option<GrainId> {
        self.assigned_id
    }

    pub fn set_assigned_id(&mut self, id: Option<GrainId>) {
        self.assigned_id = id;
    }

    /// Grain volume in the lattice's native unit (Å³ per atom × atoms).
    pub fn volume(&self, lattice: &CubicLattice) -> f64 {
        self.num_atoms() as f64 * lattice.volume_per_atom()
    }

    /// Grain volume in the lattice's configured volume unit.
    pub fn volume_in_unit(&self, lattice: &CubicLattice) -> f64 {
        self.num_atoms() as f64 * lattice.volume_per_atom_in_unit()
    }

    /// Mean misorientation of member atoms to the grain mean, radians.
    pub fn orientation_spread(&self) -> f64 {
        self.regular_spread.angle
    }

    pub fn cos_half_orientation_spread(&self) -> f64 {
        self.regular_spread.cos_half
    }

    /// Size-weighted spread over members and orphans together.
    pub fn total_orientation_spread(&self) -> f64 {
        self.total_spread.angle
    }

    /// Computes the orientation-spread statistics from per-atom
    /// quaternions. `quat_of` resolves an atom handle to its orientation,
    /// `None` for indeterminate atoms, which are skipped.
    pub fn compute_orientation_spread<F>(&mut self, quat_of: F)
    where
        F: Fn(AtomHandle) -> Option<[f64; 4]>,
    {
        self.regular_spread = self.population_spread(&self.members, &quat_of);
        self.orphan_spread = self.population_spread(&self.orphans, &quat_of);

        let n_total = self.num_atoms();
        if n_total > 0 {
            let nr = self.members.len() as f64;
            let no = self.orphans.len() as f64;
            let nt = n_total as f64;
            self.total_spread = Spread {
                angle: (nr * self.regular_spread.angle + no * self.orphan_spread.angle) / nt,
                cos_half: (nr * self.regular_spread.cos_half + no * self.orphan_spread.cos_half)
                    / nt,
            };
        }
    }

    fn population_spread<F>(&self, atoms: &[AtomHandle], quat_of: &F) -> Spread
    where
        F: Fn(AtomHandle) -> Option<[f64; 4]>,
    {
        let mean = self.mean_orientation.quaternion();
        let mut spread = Spread {
            angle: 0.0,
            cos_half: 0.0,
        };
        let mut n = 0usize;
        for &handle in atoms {
            let Some(q) = quat_of(handle) else { continue };
            let cos_half = cos_half_misorientation(&q, mean);
            spread.cos_half += cos_half;
            spread.angle += rad_from_cos_half(cos_half);
            n += 1;
        }
        if n > 0 {
            spread.cos_half /= n as f64;
            spread.angle /= n as f64;
        } else {
            spread = Spread::default();
        }
        spread
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(i: usize) -> AtomHandle {
        AtomHandle::new(0, i)
    }

    #[test]
    fn counts_split_members_and_orphans() {
        let q = [1.0, 0.0, 0.0, 0.0];
        let mut grain = Grain::new();
        grain.add(handle(0), &q);
        grain.add(handle(1), &q);
        grain.add_orphan(handle(2));
        assert_eq!(grain.num_regular_atoms(), 2);
        assert_eq!(grain.num_orphan_atoms(), 1);
        assert_eq!(grain.num_atoms(), 3);
    }

    #[test]
    fn center_is_mean_of_contributions() {
        let mut grain = Grain::new();
        grain.add_to_center(&[0.0, 0.0, 0.0]);
        grain.add_to_center(&[2.0, 4.0, 6.0]);
        grain.finalize_center();
        assert_eq!(*grain.center(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn spread_of_uniform_grain_is_zero() {
        let q = [1.0, 0.0, 0.0, 0.0];
        let mut grain = Grain::new();
        for i in 0..5 {
            grain.add(handle(i), &q);
        }
        grain.refresh_mean_orientation();
        grain.compute_orientation_spread(|_| Some(q));
        assert!(grain.orientation_spread().abs() < 1e-12);
        assert!((grain.cos_half_orientation_spread() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn indeterminate_atoms_do_not_poison_spread() {
        let q = [1.0, 0.0, 0.0, 0.0];
        let mut grain = Grain::new();
        grain.add(handle(0), &q);
        grain.refresh_mean_orientation();
        grain.add_orphan(handle(1));
        grain.compute_orientation_spread(|h| if h.atom == 0 { Some(q) } else { None });
        assert!(grain.total_orientation_spread().abs() < 1e-9);
    }
}
