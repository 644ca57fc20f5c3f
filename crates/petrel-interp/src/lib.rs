#![doc = include_str!("../README.md")]

//! Interval analysis for petrel.
//!
//! The path checker runs the [`env`] transfer over a CFG sliced to a single
//! trace and, when the post-state is bottom, extracts a minimal infeasible
//! statement sequence ([`path`]). The [`fixpoint`] module computes
//! whole-program block invariants with widening at loop heads.

pub mod env;
pub mod fixpoint;
pub mod lattice;
pub mod path;

pub use env::AbstractEnv;
pub use fixpoint::{analyze, FixpointConfig};
pub use lattice::{AbsBool, Bound, Interval, Lattice};
pub use path::{path_analyze, PathAnalysis, PathStmt, StmtParent};
