//! Path discharge by abstract interpretation.
//!
//! Runs the interval analysis on the CFG sliced to the current trace. When
//! the post-state is bottom, the minimal relevant statements are translated
//! into bare block/edge literals and rebound through the symbolic stores;
//! any gap in that translation defers the path to the SMT checker instead
//! of weakening the verdict.

use petrel_expr::{cmp_expr, get_tuple, ExprId, ExprPool};
use petrel_interp::{path_analyze, PathStmt, StmtParent};
use petrel_ir::{BmcTrace, Program, Stmt};
use tracing::{debug, warn};

use crate::exec::SymbolicExecutor;

/// Outcome of the AI path check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiVerdict {
    /// The path is infeasible; the evaluated active literals are ready for
    /// a blocking clause.
    Infeasible { active: Vec<ExprId> },
    /// Nothing learned; run the SMT checker.
    Inconclusive,
}

pub fn ai_path_check<E: SymbolicExecutor>(
    pool: &mut ExprPool,
    exec: &mut E,
    program: &Program,
    trace: &BmcTrace,
) -> AiVerdict {
    let analysis = path_analyze(program, trace);
    if !analysis.bottom {
        return AiVerdict::Inconclusive;
    }
    debug!(
        relevant = analysis.relevant.len(),
        "abstract interpretation proved the path infeasible"
    );

    let mut bare = Vec::new();
    for ps in &analysis.relevant {
        if !classify(pool, exec, program, ps, &mut bare) {
            debug!("active-literal inference failed for a relevant statement; deferring to SMT");
            return AiVerdict::Inconclusive;
        }
    }
    bare.sort_by(|&a, &b| cmp_expr(pool, a, b));
    bare.dedup();

    // Rebind each bare literal in the first store that changes it. Tuple
    // constants are opaque to store evaluation, so their endpoints are
    // rebound by hand.
    let mut active = Vec::new();
    'lits: for &e in &bare {
        for store in exec.stores() {
            let v = store.eval(pool, e);
            if v != e {
                active.push(v);
                continue 'lits;
            }
            if let Some((src, dst)) = get_tuple(pool, e) {
                if store.is_defined(src) && store.is_defined(dst) {
                    let cs = store.eval(pool, src);
                    let cd = store.eval(pool, dst);
                    active.push(pool.mk_tuple_const(cs, cd));
                    continue 'lits;
                }
            }
        }
        warn!(
            literal = %pool.display(e),
            "no symbolic store evaluates an active literal; deferring to SMT"
        );
        return AiVerdict::Inconclusive;
    }
    active.sort_by(|&a, &b| cmp_expr(pool, a, b));
    active.dedup();

    AiVerdict::Infeasible { active }
}

/// Map one relevant statement to bare literals, following its provenance
/// in the sliced path. Returns false when the statement kind has no
/// translation.
fn classify<E: SymbolicExecutor>(
    pool: &mut ExprPool,
    exec: &mut E,
    program: &Program,
    ps: &PathStmt,
    out: &mut Vec<ExprId>,
) -> bool {
    match &ps.stmt {
        Stmt::BinOp { .. }
        | Stmt::Cast { .. }
        | Stmt::Select { .. }
        | Stmt::BoolBin { .. }
        | Stmt::AssignCmp { .. }
        | Stmt::ArrRead { .. }
        | Stmt::ArrWrite { .. }
        | Stmt::ArrAssign { .. } => {
            let StmtParent::Block(b) = ps.parent else {
                return false;
            };
            out.push(exec.block_symbol(pool, b));
            true
        }
        Stmt::Assume(_) => match ps.parent {
            StmtParent::Edge(src, dst) => {
                out.push(exec.block_symbol(pool, src));
                out.push(exec.edge_literal(pool, src, dst));
                true
            }
            StmtParent::Block(b) => {
                out.push(exec.block_symbol(pool, b));
                true
            }
        },
        Stmt::Assign { dst, .. } => {
            let src_block = match ps.parent {
                StmtParent::Block(b) => b,
                StmtParent::Edge(src, _) => src,
            };
            match program.phi_block_of(*dst) {
                Some(phi_block) => {
                    out.push(exec.block_symbol(pool, src_block));
                    out.push(exec.edge_literal(pool, src_block, phi_block));
                    true
                }
                // A copy that is not a phi has no block/edge reading.
                None => false,
            }
        }
    }
}
