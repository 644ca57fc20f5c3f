#![doc = include_str!("../README.md")]

//! Intermediate representation for the petrel bounded model checker.
//!
//! Programs are control-flow graphs over SSA variables: each block carries
//! phi nodes, straight-line statements, and a guarded terminator. Front-end
//! lowering is out of scope; clients (and tests) construct programs
//! directly. The [`unroll`] module turns loops into a bounded acyclic
//! program; [`trace`] is the path witness exchanged with the engine.

pub mod cfg;
pub mod stmt;
pub mod trace;
pub mod unroll;

pub use cfg::{Block, BlockId, Program, VarId, VarInfo, VarSort};
pub use stmt::{BinOp, BoolOp, CmpOp, Cond, Operand, Phi, Stmt, Terminator};
pub use trace::BmcTrace;
pub use unroll::{topo_order, unroll, UnrollError, UnrolledProgram};
