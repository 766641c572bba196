//! The (extended) CFG atom configuration format.

pub mod reader;
pub mod writer;

pub use reader::{read, read_file};
pub use writer::{write, write_file};

use std::path::Path;

use crate::model::atom::GrainId;
use crate::track::IdMapping;

use super::error::Error;

/// Auxiliary column carrying the per-atom grain id.
pub const GRAIN_ID_COLUMN: &str = "grainId";

/// Auxiliary column carrying the per-atom orientation table index.
pub const ORIENT_ID_COLUMN: &str = "orientId";

/// Grain id value of unassigned atoms in exported files.
pub const NO_GRAIN: f64 = -1.0;

pub const DEFAULT_ELEMENT: &str = "Al";
pub const DEFAULT_ATOM_MASS: f64 = 26.981_538_5;

/// One parsed CFG file: box geometry, named auxiliary columns, atoms.
#[derive(Debug, Clone)]
pub struct CfgContent {
    /// Box extents in Å (origin at zero).
    pub size: [f64; 3],
    /// Names of the auxiliary per-atom columns.
    pub property_names: Vec<String>,
    pub element: String,
    pub mass: f64,
    pub atoms: Vec<CfgAtom>,
    /// Data lines dropped for a wrong column count or unparsable fields.
    pub skipped_lines: u64,
}

#[derive(Debug, Clone)]
pub struct CfgAtom {
    /// Absolute position in Å.
    pub position: [f64; 3],
    /// Values of the auxiliary columns, in `property_names` order.
    pub properties: Vec<f64>,
}

/// Rewrites the grain-id auxiliary column of an exported CFG file after
/// tracking renumbered the grains. Ids without a mapping become
/// [`NO_GRAIN`]; a file without a grain-id column passes through
/// untouched.
pub fn rewrite_grain_ids(path: &Path, mapping: &IdMapping) -> Result<(), Error> {
    let mut content = read_file(path)?;
    let Some(col) = content
        .property_names
        .iter()
        .position(|n| n == GRAIN_ID_COLUMN)
    else {
        return Ok(());
    };
    for atom in &mut content.atoms {
        let old = atom.properties[col];
        if old < 0.0 {
            continue;
        }
        atom.properties[col] = match mapping.mapped(old as GrainId) {
            Some(new) => new as f64,
            None => NO_GRAIN,
        };
    }
    write_file(path, &content)
}
