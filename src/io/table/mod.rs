//! The per-frame grain summary table (semicolon-separated CSV).
//!
//! Layout: a title line, a geometry line (`sx;sy;sz;p;ox;oy;oz`, with an
//! empty flag field for non-periodic boxes), a column-name line, then one
//! row per grain sorted by assigned id. The fixed columns are followed by
//! derived columns (volume, drift relative to the tracking reference) and
//! by one mean-value column per auxiliary atom property. The reader only
//! consumes the fixed columns, so the table doubles as the tracking
//! restart format.

pub mod reader;
pub mod writer;

pub use reader::{read, read_file};
pub use writer::{write, write_file};

pub(crate) const SEPARATOR: char = ';';
pub(crate) const PERIODIC_FLAG: &str = "p";

/// The fixed columns every grain table starts with.
pub(crate) const COLUMNS: [&str; 15] = [
    "Grain ID",
    "NumAtoms",
    "NumRegularAtoms",
    "NumOrphanAtoms",
    "PosX",
    "PosY",
    "PosZ",
    "phi_1",
    "PHI",
    "phi_2",
    "OriSpread",
    "q0",
    "q1",
    "q2",
    "q3",
];

/// Derived columns appended after the fixed ones.
pub(crate) const EXTRA_COLUMNS: [&str; 4] = ["Volume", "misOri", "cubMisOri", "travelDistance"];
