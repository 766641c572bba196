/// Index of an entry in a snapshot's orientation table.
pub type OriId = u32;

/// Identifier of a grain within a snapshot.
pub type GrainId = u32;

/// Stable handle to an atom owned by a [`SpatialIndex`](crate::SpatialIndex).
///
/// Atoms are stored inside their owning grid cell; a handle is the
/// `(cell, slot)` pair that locates one. Handles never dangle because cells
/// only append atoms and the grid topology is immutable for the lifetime of
/// a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtomHandle {
    pub cell: u32,
    pub atom: u32,
}

impl AtomHandle {
    pub fn new(cell: usize, atom: usize) -> Self {
        Self {
            cell: cell as u32,
            atom: atom as u32,
        }
    }
}

/// Single atom of a snapshot.
///
/// The position is stored relative to the owning cell's origin. The
/// orientation and grain references start out unset and are written at most
/// once each, by the orientation solver and by the growth engine (or orphan
/// adoption) respectively.
#[derive(Debug, Clone)]
pub struct Atom {
    position: [f64; 3],
    orientation: Option<OriId>,
    grain: Option<GrainId>,
}

impl Atom {
    pub fn new(position: [f64; 3]) -> Self {
        Self {
            position,
            orientation: None,
            grain: None,
        }
    }

    /// Position relative to the owning cell's origin.
    #[inline]
    pub fn position(&self) -> [f64; 3] {
        self.position
    }

    #[inline]
    pub fn orientation(&self) -> Option<OriId> {
        self.orientation
    }

    #[inline]
    pub fn grain(&self) -> Option<GrainId> {
        self.grain
    }

    pub fn set_orientation(&mut self, ori: Option<OriId>) {
        self.orientation = ori;
    }

    pub fn set_grain(&mut self, grain: Option<GrainId>) {
        self.grain = grain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_is_unclassified() {
        let atom = Atom::new([1.0, 2.0, 3.0]);
        assert_eq!(atom.position(), [1.0, 2.0, 3.0]);
        assert!(atom.orientation().is_none());
        assert!(atom.grain().is_none());
    }
}
