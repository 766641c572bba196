//! File formats: CFG atom configurations and grain summary tables.
//!
//! [`cfg`] reads and writes the (extended) CFG format used by atomistic
//! simulation codes: fractional coordinates under an `H0` cell matrix,
//! named auxiliary columns per atom. [`table`] reads and writes the
//! per-frame grain summary CSV, which doubles as the tracking restart
//! format. Malformed atom lines are skipped and counted; structural
//! problems (bad header, wrong table layout) are errors.

use std::fmt;

pub mod cfg;
pub mod error;
pub mod table;

pub use error::Error;

/// The file formats this module can handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Cfg,
    GrainTable,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Cfg => write!(f, "CFG"),
            Format::GrainTable => write!(f, "grain table CSV"),
        }
    }
}
