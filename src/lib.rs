//! Grain detection and tracking for FCC atomistic simulation data.
//! Starting from nothing but atom positions, the library reconstructs
//! per-atom lattice orientations, segments a snapshot into grains, and
//! carries grain identities through a time series of snapshots.
//!
//! # Features
//!
//! - **Orientation reconstruction** — Per-atom crystal orientations from
//!   the 12-neighbor shell of an FCC site, reduced to a canonical
//!   representative under the 24 cubic symmetry operators
//! - **Grain detection** — Misorientation-bounded region growing with a
//!   running mean orientation, followed by majority-vote adoption of
//!   boundary atoms
//! - **Grain tracking** — Greedy cross-frame matching on center distance
//!   and orientation, with persistent ids and drift statistics
//! - **File formats** — Extended CFG configurations in and out, grain
//!   summary tables as semicolon-separated CSV
//!
//! # Quick Start
//!
//! The main entry point is the [`Snapshot`]: feed it atoms, solve
//! orientations, detect grains, and export a [`FrameSummary`]:
//!
//! ```
//! use polygrain::{CubicLattice, DetectConfig, Snapshot, VolumeUnit};
//!
//! let lattice = CubicLattice::fcc(4.05, VolumeUnit::default(), "Al");
//! let config = DetectConfig {
//!     periodic: false,
//!     ..DetectConfig::default()
//! };
//! let mut snapshot = Snapshot::new([0.0; 3], [40.0; 3], lattice, config)?;
//!
//! // a perfect FCC block: 6 unit cells per axis, 4 atoms per cell
//! let a = 4.05;
//! let offsets = [[0.0, 0.0, 0.0], [0.5, 0.5, 0.0], [0.5, 0.0, 0.5], [0.0, 0.5, 0.5]];
//! for iz in 0..6 {
//!     for iy in 0..6 {
//!         for ix in 0..6 {
//!             for off in &offsets {
//!                 snapshot.add_atom(
//!                     &[
//!                         4.0 + (ix as f64 + off[0]) * a,
//!                         4.0 + (iy as f64 + off[1]) * a,
//!                         4.0 + (iz as f64 + off[2]) * a,
//!                     ],
//!                     &[],
//!                 );
//!             }
//!         }
//!     }
//! }
//!
//! snapshot.solve_orientations();
//! assert_eq!(snapshot.detect_grains(), 1);
//!
//! let summary = snapshot.summary();
//! assert_eq!(summary.num_grains(), 1);
//! assert_eq!(summary.grain(0).unwrap().num_atoms, 6 * 6 * 6 * 4);
//! # Ok::<(), polygrain::DetectError>(())
//! ```
//!
//! # Module Organization
//!
//! - [`model`] — Atoms, orientations, cubic symmetry, lattices, grains,
//!   and the detached per-frame summaries
//! - [`analyze`] — The per-snapshot detection pipeline around [`Snapshot`]
//! - [`track`] — Cross-frame identity matching via [`GrainTracker`]
//! - [`io`] — CFG configurations and grain summary tables

pub mod analyze;
pub mod io;
pub mod model;
pub mod track;

pub use analyze::{DetectConfig, DetectError, OrientationTable, Snapshot, SpatialIndex};

pub use model::atom::{AtomHandle, GrainId, OriId};
pub use model::lattice::{CubicLattice, VolumeUnit, VolumeUnitError};
pub use model::orientation::Orientation;
pub use model::summary::{FrameSummary, GrainSummary};

pub use track::{GrainMatcher, GrainTracker, IdMapping, TrackConfig};

pub use io::Error as IoError;
