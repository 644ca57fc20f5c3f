//! Interval analysis of a single trace.
//!
//! The CFG is sliced to the trace: branch guards become assumes on the
//! traversed edges, phi nodes become copies tagged with the source block,
//! and block bodies run in order. If the interval state hits bottom the
//! path is infeasible, and the witness is shrunk to a sequence that stays
//! infeasible under removal of any single statement.

use petrel_ir::{BlockId, BmcTrace, Program, Stmt};

use crate::env::AbstractEnv;

/// Where a sliced statement came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtParent {
    Block(BlockId),
    Edge(BlockId, BlockId),
}

/// One statement of the sliced path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStmt {
    pub parent: StmtParent,
    pub stmt: Stmt,
}

/// Outcome of analyzing one trace.
#[derive(Debug, Clone)]
pub struct PathAnalysis {
    /// True iff the abstract post-state is bottom (path infeasible).
    pub bottom: bool,
    /// When `bottom`, a 1-minimal infeasible statement sequence.
    pub relevant: Vec<PathStmt>,
}

/// Slice the program to `trace` and run the interval transfer over it.
pub fn path_analyze(program: &Program, trace: &BmcTrace) -> PathAnalysis {
    let seq = slice(program, trace);
    match first_bottom(&seq) {
        None => PathAnalysis {
            bottom: false,
            relevant: Vec::new(),
        },
        Some(idx) => {
            let relevant = shrink(seq[..=idx].to_vec());
            PathAnalysis {
                bottom: true,
                relevant,
            }
        }
    }
}

fn slice(program: &Program, trace: &BmcTrace) -> Vec<PathStmt> {
    let mut out = Vec::new();
    for (k, &b) in trace.blocks.iter().enumerate() {
        if k > 0 {
            let u = trace.blocks[k - 1];
            if let Some(cond) = program.blocks[u].term.edge_cond(b) {
                out.push(PathStmt {
                    parent: StmtParent::Edge(u, b),
                    stmt: Stmt::Assume(cond),
                });
            }
            for phi in &program.blocks[b].phis {
                if let Some((_, op)) = phi.incoming.iter().find(|(pb, _)| *pb == u) {
                    out.push(PathStmt {
                        parent: StmtParent::Block(u),
                        stmt: Stmt::Assign {
                            dst: phi.dst,
                            src: *op,
                        },
                    });
                }
            }
        }
        for stmt in &program.blocks[b].stmts {
            out.push(PathStmt {
                parent: StmtParent::Block(b),
                stmt: stmt.clone(),
            });
        }
    }
    out
}

fn first_bottom(seq: &[PathStmt]) -> Option<usize> {
    let mut env = AbstractEnv::top();
    for (i, ps) in seq.iter().enumerate() {
        env.transfer(&ps.stmt);
        if env.is_bottom() {
            return Some(i);
        }
    }
    None
}

/// Greedy 1-minimization: repeatedly drop statements whose removal keeps the
/// sequence infeasible. Removal only loses information, so a still-bottom
/// subsequence is still a genuine infeasibility witness.
fn shrink(seq: Vec<PathStmt>) -> Vec<PathStmt> {
    let mut core = seq;
    let mut i = 0;
    while i < core.len() {
        let mut candidate = core.clone();
        candidate.remove(i);
        if first_bottom(&candidate).is_some() {
            core = candidate;
        } else {
            i += 1;
        }
    }
    core
}
