#![doc = include_str!("../README.md")]

pub mod ai_check;
pub mod config;
pub mod encode;
pub mod engine;
pub mod exec;
pub mod result;
pub mod smt_check;
pub mod stats;

pub use config::BmcOptions;
pub use encode::UnrollingExec;
pub use engine::{EngineError, PathBmc};
pub use exec::{Implicant, SymStore, SymbolicExecutor};
pub use result::Verdict;
pub use stats::CoreStats;
