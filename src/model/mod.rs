//! Core data structures for atomistic snapshots and crystal grains.
//!
//! This module provides the foundational types that flow through `polygrain`:
//!
//! - [`atom`] – Atoms, their handles, and the orientation/grain references.
//! - [`orientation`] – Unit-quaternion orientations, Bunge-Euler conversion,
//!   misorientation measures, and incremental orientation means.
//! - [`symmetry`] – The 24 cubic symmetry operators and symmetry-aware
//!   misorientation.
//! - [`lattice`] – Cubic lattice geometry and derived search parameters.
//! - [`grain`] – Grains under construction, with member/orphan bookkeeping
//!   and orientation-spread statistics.
//! - [`summary`] – Detached per-grain and per-frame summaries used by
//!   tracking and the grain tables on disk.
//!
//! The model deliberately separates atoms (owned by the spatial index in
//! [`crate::analyze`]) from grains, which reference their atoms through
//! [`AtomHandle`](atom::AtomHandle) values only.

pub mod atom;
pub mod grain;
pub mod lattice;
pub mod orientation;
pub mod summary;
pub mod symmetry;
