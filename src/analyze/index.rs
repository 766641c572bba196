//! Regular cell grid over the simulation box.
//!
//! The index partitions the box into a cuboid grid of cells, each owning
//! the atoms inside it with cell-local coordinates. Every cell knows its
//! Moore neighborhood (up to 26 cells) together with the integer coordinate
//! offset to each neighbor; neighbor-relative atom positions are recovered
//! by shifting the query position by `offset × cell_size`, which makes the
//! periodic case transparent to all distance queries.
//!
//! Two query modes exist: a radial shell search with an exclusive squared
//! distance window and a hard result capacity (an overfull shell is a
//! failed query, not a truncated one), and a k-nearest search without any
//! distance filter.

use crate::model::atom::{Atom, AtomHandle};

use super::error::DetectError;

/// Upper bound of grid cells per axis.
const MAX_FRAGMENTATION: usize = 80;

/// A neighbor relation of one grid cell.
#[derive(Debug, Clone, Copy)]
pub struct CellNeighbor {
    pub cell: u32,
    /// Integer coordinate offset from the owning cell, each component in
    /// `-1..=1`.
    pub offset: [i8; 3],
}

/// One grid cell with its atoms and Moore neighborhood.
#[derive(Debug, Clone)]
pub struct Cell {
    origin: [f64; 3],
    atoms: Vec<Atom>,
    neighbors: Vec<CellNeighbor>,
}

impl Cell {
    pub fn origin(&self) -> &[f64; 3] {
        &self.origin
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn neighbors(&self) -> &[CellNeighbor] {
        &self.neighbors
    }
}

/// A neighbor atom found by a query: its handle and its position relative
/// to the query atom's cell-local frame.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    pub handle: AtomHandle,
    pub rel_pos: [f64; 3],
}

/// Spatial index over one snapshot.
///
/// Owns all atom storage; the rest of the pipeline refers to atoms through
/// [`AtomHandle`] values. The grid topology is fixed at construction, so
/// handles stay valid for the lifetime of the index.
#[derive(Debug)]
pub struct SpatialIndex {
    origin: [f64; 3],
    size: [f64; 3],
    cell_size: [f64; 3],
    nx: i64,
    ny: i64,
    nz: i64,
    periodic: bool,
    cells: Vec<Cell>,
    num_atoms: usize,
    rejected_atoms: u64,
}

impl SpatialIndex {
    /// Builds an empty grid over the box given by `center` and `size`.
    ///
    /// The box is split into cells of at least `min_cell_edge` per axis,
    /// clamped to `1..=80` cells per axis, so one layer of neighbor cells
    /// always covers a search radius up to `min_cell_edge`.
    pub fn new(
        center: &[f64; 3],
        size: &[f64; 3],
        min_cell_edge: f64,
        periodic: bool,
    ) -> Result<Self, DetectError> {
        if size.iter().any(|&s| s <= 0.0) || min_cell_edge <= 0.0 {
            return Err(DetectError::InvalidBoxSize(*size));
        }
        let frag = |extent: f64| ((extent / min_cell_edge) as usize).clamp(1, MAX_FRAGMENTATION);
        let (nx, ny, nz) = (frag(size[0]), frag(size[1]), frag(size[2]));

        let origin = [
            center[0] - 0.5 * size[0],
            center[1] - 0.5 * size[1],
            center[2] - 0.5 * size[2],
        ];
        let cell_size = [
            size[0] / nx as f64,
            size[1] / ny as f64,
            size[2] / nz as f64,
        ];

        let mut index = Self {
            origin,
            size: *size,
            cell_size,
            nx: nx as i64,
            ny: ny as i64,
            nz: nz as i64,
            periodic,
            cells: Vec::with_capacity(nx * ny * nz),
            num_atoms: 0,
            rejected_atoms: 0,
        };
        index.build_cells();
        Ok(index)
    }

    fn build_cells(&mut self) {
        for iz in 0..self.nz {
            for iy in 0..self.ny {
                for ix in 0..self.nx {
                    let mut neighbors = Vec::with_capacity(26);
                    for dz in -1..=1i64 {
                        for dy in -1..=1i64 {
                            for dx in -1..=1i64 {
                                if dx == 0 && dy == 0 && dz == 0 {
                                    continue;
                                }
                                let (jx, jy, jz) = (ix + dx, iy + dy, iz + dz);
                                if !self.periodic && !self.in_grid(jx, jy, jz) {
                                    continue;
                                }
                                neighbors.push(CellNeighbor {
                                    cell: self.cell_id(jx, jy, jz) as u32,
                                    offset: [dx as i8, dy as i8, dz as i8],
                                });
                            }
                        }
                    }
                    // Closest cells first, so shell searches hit the cap
                    // deterministically.
                    neighbors.sort_by_key(|n| {
                        n.offset.iter().map(|&c| (c as i64) * (c as i64)).sum::<i64>()
                    });
                    self.cells.push(Cell {
                        origin: [
                            self.origin[0] + self.cell_size[0] * ix as f64,
                            self.origin[1] + self.cell_size[1] * iy as f64,
                            self.origin[2] + self.cell_size[2] * iz as f64,
                        ],
                        atoms: Vec::new(),
                        neighbors,
                    });
                }
            }
        }
    }

    fn in_grid(&self, ix: i64, iy: i64, iz: i64) -> bool {
        ix >= 0 && iy >= 0 && iz >= 0 && ix < self.nx && iy < self.ny && iz < self.nz
    }

    /// Flat cell id; periodic grids wrap each coordinate.
    fn cell_id(&self, ix: i64, iy: i64, iz: i64) -> usize {
        let (ix, iy, iz) = if self.periodic {
            (
                ix.rem_euclid(self.nx),
                iy.rem_euclid(self.ny),
                iz.rem_euclid(self.nz),
            )
        } else {
            (ix, iy, iz)
        };
        (iz * self.ny * self.nx + iy * self.nx + ix) as usize
    }

    /// Ingests an atom at an absolute position.
    ///
    /// Periodic grids resolve the periodic image, so any finite position is
    /// accepted; non-periodic grids reject positions outside the box and
    /// count the rejection.
    pub fn add_atom(&mut self, pos: &[f64; 3]) -> Option<AtomHandle> {
        let rel = [
            pos[0] - self.origin[0],
            pos[1] - self.origin[1],
            pos[2] - self.origin[2],
        ];
        let (ix, iy, iz) = (
            (rel[0] / self.cell_size[0]).floor() as i64,
            (rel[1] / self.cell_size[1]).floor() as i64,
            (rel[2] / self.cell_size[2]).floor() as i64,
        );
        if !self.periodic && !self.in_grid(ix, iy, iz) {
            self.rejected_atoms += 1;
            return None;
        }
        let cell_id = self.cell_id(ix, iy, iz);
        let cell_origin = self.cells[cell_id].origin;
        let mut local = [
            pos[0] - cell_origin[0],
            pos[1] - cell_origin[1],
            pos[2] - cell_origin[2],
        ];
        if self.periodic {
            // The cell id wrapped, the position has not; pull the atom back
            // by whole box translations so it is local to the wrapped cell.
            for d in 0..3 {
                let image = (rel[d] / self.size[d]).trunc();
                if image > 0.0 {
                    local[d] -= image * self.size[d];
                } else if rel[d] < 0.0 {
                    local[d] -= (image - 1.0) * self.size[d];
                }
            }
        }
        let atom_id = self.cells[cell_id].atoms.len();
        self.cells[cell_id].atoms.push(Atom::new(local));
        self.num_atoms += 1;
        Some(AtomHandle::new(cell_id, atom_id))
    }

    pub fn num_atoms(&self) -> usize {
        self.num_atoms
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Atoms rejected for lying outside a non-periodic box.
    pub fn rejected_atoms(&self) -> u64 {
        self.rejected_atoms
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    pub fn origin(&self) -> &[f64; 3] {
        &self.origin
    }

    pub fn size(&self) -> &[f64; 3] {
        &self.size
    }

    pub fn cell(&self, id: usize) -> &Cell {
        &self.cells[id]
    }

    #[inline]
    pub fn atom(&self, handle: AtomHandle) -> &Atom {
        &self.cells[handle.cell as usize].atoms[handle.atom as usize]
    }

    #[inline]
    pub fn atom_mut(&mut self, handle: AtomHandle) -> &mut Atom {
        &mut self.cells[handle.cell as usize].atoms[handle.atom as usize]
    }

    /// Absolute position of an atom.
    pub fn global_position(&self, handle: AtomHandle) -> [f64; 3] {
        let cell = &self.cells[handle.cell as usize];
        let p = cell.atoms[handle.atom as usize].position();
        [
            cell.origin[0] + p[0],
            cell.origin[1] + p[1],
            cell.origin[2] + p[2],
        ]
    }

    /// All atom handles, in cell order.
    pub fn handles(&self) -> impl Iterator<Item = AtomHandle> + '_ {
        self.cells.iter().enumerate().flat_map(|(ic, cell)| {
            (0..cell.atoms.len()).map(move |ia| AtomHandle::new(ic, ia))
        })
    }

    /// Visits every neighbor candidate of `handle` (all atoms of the own
    /// cell except the query atom, plus all atoms of the Moore neighbor
    /// cells) with its position relative to the query atom.
    fn for_each_candidate<F: FnMut(AtomHandle, [f64; 3])>(&self, handle: AtomHandle, mut f: F) {
        let cell = &self.cells[handle.cell as usize];
        let atom_pos = cell.atoms[handle.atom as usize].position();

        for (ia, other) in cell.atoms.iter().enumerate() {
            if ia == handle.atom as usize {
                continue;
            }
            let p = other.position();
            f(
                AtomHandle::new(handle.cell as usize, ia),
                [p[0] - atom_pos[0], p[1] - atom_pos[1], p[2] - atom_pos[2]],
            );
        }
        for nbor in &cell.neighbors {
            // Query position as seen from the neighbor cell's frame.
            let shifted = [
                atom_pos[0] - nbor.offset[0] as f64 * self.cell_size[0],
                atom_pos[1] - nbor.offset[1] as f64 * self.cell_size[1],
                atom_pos[2] - nbor.offset[2] as f64 * self.cell_size[2],
            ];
            let nbor_cell = &self.cells[nbor.cell as usize];
            for (ia, other) in nbor_cell.atoms.iter().enumerate() {
                let p = other.position();
                f(
                    AtomHandle::new(nbor.cell as usize, ia),
                    [p[0] - shifted[0], p[1] - shifted[1], p[2] - shifted[2]],
                );
            }
        }
    }

    /// Shell search: all neighbors with squared distance strictly inside
    /// `(r_sqr_min, r_sqr_max)`. Returns `None` when more than `capacity`
    /// neighbors fall into the shell; an overfull shell means the window
    /// does not isolate the nearest-neighbor shell and the result would be
    /// arbitrary.
    pub fn shell_neighbors(
        &self,
        handle: AtomHandle,
        r_sqr_min: f64,
        r_sqr_max: f64,
        capacity: usize,
    ) -> Option<Vec<Neighbor>> {
        let mut found = Vec::with_capacity(capacity);
        let mut overflow = false;
        self.for_each_candidate(handle, |h, rel| {
            if overflow {
                return;
            }
            let d2 = rel[0] * rel[0] + rel[1] * rel[1] + rel[2] * rel[2];
            if d2 > r_sqr_min && d2 < r_sqr_max {
                if found.len() == capacity {
                    overflow = true;
                    return;
                }
                found.push(Neighbor {
                    handle: h,
                    rel_pos: rel,
                });
            }
        });
        if overflow {
            None
        } else {
            Some(found)
        }
    }

    /// The `k` nearest neighbors, sorted by ascending distance. No distance
    /// filter; fewer than `k` results only if the cell neighborhood holds
    /// fewer atoms.
    pub fn nearest_neighbors(&self, handle: AtomHandle, k: usize) -> Vec<Neighbor> {
        let mut all = Vec::new();
        self.for_each_candidate(handle, |h, rel| {
            all.push(Neighbor {
                handle: h,
                rel_pos: rel,
            });
        });
        all.sort_by(|a, b| {
            let da: f64 = a.rel_pos.iter().map(|c| c * c).sum();
            let db: f64 = b.rel_pos.iter().map(|c| c * c).sum();
            da.total_cmp(&db)
        });
        all.truncate(k);
        all
    }
}
