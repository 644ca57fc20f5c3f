#![doc = include_str!("../README.md")]

//! Expression layer of the petrel bounded model checker.
//!
//! Formulas are stored in an [`ExprPool`] arena and referenced by copyable
//! [`ExprId`] handles. Structural equality implies identical ids, so set
//! membership, memoized visitors, and the blocking-clause ledger all work on
//! plain ids. The [`abstraction`] module turns a precise verification
//! condition into its Boolean skeleton; [`order`] provides the tuple-aware
//! total ordering used to keep unsat cores stable under permutation.

pub mod abstraction;
pub mod nnf;
pub mod order;
pub mod pool;

pub use abstraction::{bool_abstraction, bool_abstraction_side, AbstractionError};
pub use nnf::{nnf, pre_nnf};
pub use order::{cmp_expr, get_tuple, is_tuple, less_expr};
pub use pool::{ExprId, ExprNode, ExprPool, Sort};
