//! One frame of an atomistic simulation and its grain decomposition.
//!
//! A [`Snapshot`] ties the pieces of the pipeline together: the spatial
//! index holding the atoms, the orientation table, the detected grains and
//! any auxiliary per-atom properties carried through from the input file.
//! The intended call order is [`Snapshot::add_atom`] for every input atom,
//! then [`Snapshot::solve_orientations`], then [`Snapshot::detect_grains`],
//! then [`Snapshot::summary`].

use std::collections::HashMap;

use rayon::prelude::*;

use crate::model::atom::{AtomHandle, GrainId};
use crate::model::grain::Grain;
use crate::model::lattice::CubicLattice;
use crate::model::summary::{FrameSummary, GrainSummary};

use super::config::DetectConfig;
use super::error::DetectError;
use super::growth::GrowthEngine;
use super::index::SpatialIndex;
use super::orient::{solve_fcc, OrientationTable};
use super::orphan::adopt_orphans;

/// Grains at or below this atom count are dissolved after growth.
const MIN_GRAIN_ATOMS: usize = 1;

pub struct Snapshot {
    index: SpatialIndex,
    orientations: OrientationTable,
    lattice: CubicLattice,
    config: DetectConfig,
    grains: Vec<Grain>,
    property_names: Vec<String>,
    properties: HashMap<AtomHandle, Vec<f64>>,
}

impl Snapshot {
    /// Creates an empty snapshot over the box spanned by `origin` and
    /// `size` (Å). The cell grid is sized from the lattice's neighbor
    /// shell, so one layer of neighbor cells covers every search.
    pub fn new(
        origin: [f64; 3],
        size: [f64; 3],
        lattice: CubicLattice,
        config: DetectConfig,
    ) -> Result<Self, DetectError> {
        config.validate(&lattice)?;
        let center = [
            origin[0] + 0.5 * size[0],
            origin[1] + 0.5 * size[1],
            origin[2] + 0.5 * size[2],
        ];
        let index = SpatialIndex::new(
            &center,
            &size,
            lattice.preferred_cell_edge(),
            config.periodic,
        )?;
        Ok(Self {
            index,
            orientations: OrientationTable::new(),
            lattice,
            config,
            grains: Vec::new(),
            property_names: Vec::new(),
            properties: HashMap::new(),
        })
    }

    /// Names of the auxiliary per-atom columns passed to [`add_atom`].
    ///
    /// [`add_atom`]: Snapshot::add_atom
    pub fn set_property_names(&mut self, names: Vec<String>) {
        self.property_names = names;
    }

    pub fn property_names(&self) -> &[String] {
        &self.property_names
    }

    /// Inserts an atom at an absolute position, with its auxiliary
    /// property values. Returns `None` when a non-periodic box rejects the
    /// position; the rejection is counted on the index.
    pub fn add_atom(&mut self, pos: &[f64; 3], properties: &[f64]) -> Option<AtomHandle> {
        let handle = self.index.add_atom(pos)?;
        if !properties.is_empty() {
            self.properties.insert(handle, properties.to_vec());
        }
        Some(handle)
    }

    /// Solves the per-atom lattice orientations from the nearest-neighbor
    /// shell of every atom, in parallel. Atoms without a clean FCC
    /// neighborhood (an incomplete or overfull shell, atoms near free
    /// surfaces) stay unoriented. Returns the number of solved atoms.
    pub fn solve_orientations(&mut self) -> usize {
        let handles: Vec<AtomHandle> = self.index.handles().collect();
        let index = &self.index;
        let max_neighbors = self.config.max_neighbors;
        let (r_sqr_min, r_sqr_max) = self.lattice.neighbor_shell_sqr();
        let solved: Vec<Option<[f64; 4]>> = handles
            .par_iter()
            .map(|&h| {
                let shell = index.shell_neighbors(h, r_sqr_min, r_sqr_max, max_neighbors)?;
                let positions: Vec<[f64; 3]> = shell.iter().map(|n| n.rel_pos).collect();
                solve_fcc(&positions)
            })
            .collect();

        let mut count = 0;
        for (&handle, q) in handles.iter().zip(solved) {
            let ori = q.map(|q| {
                count += 1;
                self.orientations.push(q)
            });
            self.index.atom_mut(handle).set_orientation(ori);
        }
        count
    }

    /// Runs grain detection: region growing from every atom, dissolution
    /// of single-atom grains, orphan adoption, then size-ordered id
    /// assignment. Returns the number of surviving grains.
    pub fn detect_grains(&mut self) -> usize {
        let (r_sqr_min, r_sqr_max) = self.lattice.neighbor_shell_sqr();
        let engine = GrowthEngine::new(
            self.config.angular_threshold,
            r_sqr_min,
            r_sqr_max,
            self.config.max_neighbors,
        );

        let mut grains: Vec<Grain> = Vec::new();
        let handles: Vec<AtomHandle> = self.index.handles().collect();
        for seed in handles {
            let mut grain = Grain::new();
            let n = engine.grow(
                &mut self.index,
                &self.orientations,
                seed,
                grains.len() as GrainId,
                &mut grain,
            );
            if n > MIN_GRAIN_ATOMS {
                grains.push(grain);
            } else if n > 0 {
                // too small to be a grain; release its atoms
                for &member in grain.members() {
                    self.index.atom_mut(member).set_grain(None);
                }
            }
        }

        // adoption first: orphans count toward grain size, so the
        // size-ordered ids below must see the final membership
        adopt_orphans(
            &mut self.index,
            &mut grains,
            self.config.orphan_depth,
            self.config.max_neighbors,
        );

        grains.sort_by(|a, b| b.num_atoms().cmp(&a.num_atoms()));
        for (id, grain) in grains.iter_mut().enumerate() {
            grain.set_assigned_id(Some(id as GrainId));
            for atom in grain.atoms() {
                self.index.atom_mut(atom).set_grain(Some(id as GrainId));
            }
        }

        let index = &self.index;
        let orientations = &self.orientations;
        for grain in &mut grains {
            grain.compute_orientation_spread(|h| {
                index.atom(h).orientation().map(|id| *orientations.quaternion(id))
            });
        }
        self.grains = grains;
        self.grains.len()
    }

    /// Condenses the detected grains into a per-frame summary, including
    /// the mean of every auxiliary property over each grain.
    pub fn summary(&self) -> FrameSummary {
        let mut summary = FrameSummary::new(
            *self.index.origin(),
            *self.index.size(),
            self.index.is_periodic(),
        );
        summary.set_property_names(self.property_names.clone());
        for grain in &self.grains {
            summary.add_grain(GrainSummary::from_grain(grain, self.mean_properties(grain)));
        }
        summary
    }

    fn mean_properties(&self, grain: &Grain) -> Vec<f64> {
        let ncols = self.property_names.len();
        if ncols == 0 {
            return Vec::new();
        }
        let mut sums = vec![0.0; ncols];
        let mut n = 0usize;
        for handle in grain.atoms() {
            let Some(values) = self.properties.get(&handle) else {
                continue;
            };
            for (sum, v) in sums.iter_mut().zip(values) {
                *sum += v;
            }
            n += 1;
        }
        if n > 0 {
            for sum in &mut sums {
                *sum /= n as f64;
            }
        }
        sums
    }

    pub fn num_atoms(&self) -> usize {
        self.index.num_atoms()
    }

    pub fn num_grains(&self) -> usize {
        self.grains.len()
    }

    pub fn grains(&self) -> &[Grain] {
        &self.grains
    }

    pub fn grain(&self, id: GrainId) -> Option<&Grain> {
        self.grains.get(id as usize)
    }

    pub fn lattice(&self) -> &CubicLattice {
        &self.lattice
    }

    pub fn config(&self) -> &DetectConfig {
        &self.config
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn orientations(&self) -> &OrientationTable {
        &self.orientations
    }

    /// Atoms left without a grain after detection and adoption.
    pub fn num_unassigned_atoms(&self) -> usize {
        self.index
            .handles()
            .filter(|&h| self.index.atom(h).grain().is_none())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::lattice::VolumeUnit;

    const A: f64 = 4.05;

    fn snapshot(origin: [f64; 3], size: [f64; 3]) -> Snapshot {
        let lattice = CubicLattice::fcc(A, VolumeUnit::default(), "Al");
        let config = DetectConfig {
            periodic: false,
            ..DetectConfig::default()
        };
        Snapshot::new(origin, size, lattice, config).unwrap()
    }

    fn fill_fcc(snapshot: &mut Snapshot, base: [f64; 3], cells: usize, angle_z: f64, pe: f64) {
        let (s, c) = angle_z.sin_cos();
        let offsets = [
            [0.0, 0.0, 0.0],
            [0.5, 0.5, 0.0],
            [0.5, 0.0, 0.5],
            [0.0, 0.5, 0.5],
        ];
        for iz in 0..cells {
            for iy in 0..cells {
                for ix in 0..cells {
                    for off in &offsets {
                        let p = [
                            (ix as f64 + off[0]) * A,
                            (iy as f64 + off[1]) * A,
                            (iz as f64 + off[2]) * A,
                        ];
                        let rot = [c * p[0] - s * p[1], s * p[0] + c * p[1], p[2]];
                        snapshot.add_atom(
                            &[base[0] + rot[0], base[1] + rot[1], base[2] + rot[2]],
                            &[pe],
                        );
                    }
                }
            }
        }
    }

    fn fill_fcc_block(snapshot: &mut Snapshot, base: [f64; 3], cells: [usize; 3]) {
        let offsets = [
            [0.0, 0.0, 0.0],
            [0.5, 0.5, 0.0],
            [0.5, 0.0, 0.5],
            [0.0, 0.5, 0.5],
        ];
        for iz in 0..cells[2] {
            for iy in 0..cells[1] {
                for ix in 0..cells[0] {
                    for off in &offsets {
                        snapshot.add_atom(
                            &[
                                base[0] + (ix as f64 + off[0]) * A,
                                base[1] + (iy as f64 + off[1]) * A,
                                base[2] + (iz as f64 + off[2]) * A,
                            ],
                            &[],
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn single_crystal_is_one_grain_with_orphan_surface() {
        let mut snap = snapshot([0.0, 0.0, 0.0], [40.0, 40.0, 40.0]);
        fill_fcc(&mut snap, [4.0, 4.0, 4.0], 6, 0.0, 0.0);

        snap.solve_orientations();
        assert_eq!(snap.detect_grains(), 1);

        let grain = snap.grain(0).unwrap();
        // surface atoms lack a full shell, so they join as orphans
        assert!(grain.num_orphan_atoms() > 0);
        assert_eq!(grain.num_atoms(), snap.num_atoms());
        assert_eq!(snap.num_unassigned_atoms(), 0);
        // a perfect crystal has essentially no spread
        assert!(grain.orientation_spread() < 1e-6);
    }

    #[test]
    fn two_rotated_blocks_become_two_grains() {
        let mut snap = snapshot([0.0, 0.0, 0.0], [70.0, 40.0, 40.0]);
        snap.set_property_names(vec!["pe".into()]);
        fill_fcc(&mut snap, [2.0, 4.0, 4.0], 6, 0.0, -3.0);
        fill_fcc(&mut snap, [45.0, 4.0, 4.0], 5, std::f64::consts::FRAC_PI_4, -2.0);

        assert!(snap.solve_orientations() > 0);
        assert_eq!(snap.detect_grains(), 2);

        // ids are ordered by size, largest first
        assert!(snap.grain(0).unwrap().num_atoms() > snap.grain(1).unwrap().num_atoms());

        let summary = snap.summary();
        assert_eq!(summary.num_grains(), 2);
        // per-grain property means reflect the blocks
        let pe0 = summary.grain(0).unwrap().mean_properties[0];
        let pe1 = summary.grain(1).unwrap().mean_properties[0];
        assert!((pe0 + 3.0).abs() < 1e-9);
        assert!((pe1 + 2.0).abs() < 1e-9);
    }

    #[test]
    fn size_ordering_counts_orphans_too() {
        let mut snap = snapshot([0.0, 0.0, 0.0], [200.0, 60.0, 40.0]);
        // a thin beam: many surface atoms, so most of its size is orphans
        fill_fcc_block(&mut snap, [4.0, 4.0, 4.0], [45, 2, 2]);
        // a compact cube with fewer atoms overall but more regular members
        fill_fcc_block(&mut snap, [4.0, 30.0, 4.0], [5, 5, 5]);

        snap.solve_orientations();
        assert_eq!(snap.detect_grains(), 2);

        let beam = snap.grain(0).unwrap();
        let cube = snap.grain(1).unwrap();
        // the beam leads only once adopted orphans are counted in
        assert!(beam.num_atoms() > cube.num_atoms());
        assert!(beam.num_regular_atoms() < cube.num_regular_atoms());

        // members and orphans both carry the size-ordered ids
        for atom in beam.atoms() {
            assert_eq!(snap.index().atom(atom).grain(), Some(0));
        }
        for atom in cube.atoms() {
            assert_eq!(snap.index().atom(atom).grain(), Some(1));
        }
    }

    #[test]
    fn tiny_clusters_dissolve_after_growth() {
        let mut snap = snapshot([0.0, 0.0, 0.0], [40.0, 40.0, 40.0]);
        // one atom with its complete first shell, isolated in the box
        let center = [20.0, 20.0, 20.0];
        snap.add_atom(&center, &[]);
        let h = 0.5 * A;
        for (dx, dy, dz) in [
            (h, h, 0.0),
            (h, -h, 0.0),
            (-h, h, 0.0),
            (-h, -h, 0.0),
            (h, 0.0, h),
            (h, 0.0, -h),
            (-h, 0.0, h),
            (-h, 0.0, -h),
            (0.0, h, h),
            (0.0, h, -h),
            (0.0, -h, h),
            (0.0, -h, -h),
        ] {
            snap.add_atom(&[center[0] + dx, center[1] + dy, center[2] + dz], &[]);
        }

        // only the center sees a full shell; the shell atoms do not
        assert_eq!(snap.solve_orientations(), 1);
        // a single oriented atom cannot grow past itself, so the grain
        // dissolves and its atom is released
        assert_eq!(snap.detect_grains(), 0);
        assert_eq!(snap.num_unassigned_atoms(), 13);
    }

    #[test]
    fn lone_atoms_stay_unassigned() {
        let mut snap = snapshot([0.0, 0.0, 0.0], [60.0, 40.0, 40.0]);
        fill_fcc(&mut snap, [2.0, 4.0, 4.0], 6, 0.0, 0.0);
        // a far-away pair cannot form a grain
        snap.add_atom(&[52.0, 20.0, 20.0], &[]);
        snap.add_atom(&[54.0, 20.0, 20.0], &[]);

        snap.solve_orientations();
        assert_eq!(snap.detect_grains(), 1);
        assert_eq!(snap.num_unassigned_atoms(), 2);
    }

    #[test]
    fn out_of_box_atoms_are_rejected_when_open() {
        let mut snap = snapshot([0.0, 0.0, 0.0], [20.0, 20.0, 20.0]);
        assert!(snap.add_atom(&[25.0, 5.0, 5.0], &[]).is_none());
        assert_eq!(snap.index().rejected_atoms(), 1);
    }

    #[test]
    fn invalid_box_is_reported() {
        let lattice = CubicLattice::fcc(A, VolumeUnit::default(), "Al");
        let err = Snapshot::new(
            [0.0, 0.0, 0.0],
            [0.0, 10.0, 10.0],
            lattice,
            DetectConfig::default(),
        )
        .err();
        assert_eq!(err, Some(DetectError::InvalidBoxSize([0.0, 10.0, 10.0])));
    }
}
