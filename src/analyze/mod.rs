//! The per-snapshot grain detection pipeline.
//!
//! Detection runs in stages over one [`Snapshot`]:
//!
//! 1. [`index`] – A linked-cell [`SpatialIndex`] over the simulation box,
//!    serving shell-window and k-nearest neighbor queries.
//! 2. [`orient`] – Per-atom orientation solving from the nearest-neighbor
//!    shell of an FCC site (parallelized across atoms).
//! 3. [`growth`] – Orientation-aware region growing that collects grains
//!    from seed atoms.
//! 4. [`orphan`] – Majority-vote adoption of the atoms growth left behind.
//!
//! [`config`] holds the tuning knobs, [`error`] the failure taxonomy of the
//! setup phase; anomalies of individual atoms are sentinels, not errors.

pub mod config;
pub mod error;
pub mod growth;
pub mod index;
pub mod orient;
pub mod orphan;
pub mod snapshot;

pub use config::DetectConfig;
pub use error::DetectError;
pub use index::SpatialIndex;
pub use orient::OrientationTable;
pub use snapshot::Snapshot;
