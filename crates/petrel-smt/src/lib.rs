#![doc = include_str!("../README.md")]

pub mod backends;
pub mod muc;
pub mod solver;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use muc::{run_muc, MucMethod, MucVerdict};
pub use solver::{Model, SolveResult, TheorySolver, Value};
