//! Precise path discharge with the auxiliary theory solver.

use petrel_expr::{cmp_expr, ExprId, ExprPool};
use petrel_smt::{run_muc, Model, MucMethod, MucVerdict, SolveResult, TheorySolver};
use tracing::debug;

use crate::exec::{Implicant, SymbolicExecutor};

/// Outcome of the SMT path check.
#[derive(Debug)]
pub enum SmtVerdict {
    /// The path is feasible; the model is a genuine counter-example.
    Sat(Model),
    /// The path is infeasible; active literals derived from the unsat core.
    Unsat {
        active: Vec<ExprId>,
        solver_calls: u64,
    },
    Unknown(String),
}

/// Extract the implicant of the VC under `model`, decide it precisely, and
/// on UNSAT translate the minimal core back into active literals.
pub fn smt_path_check<S: TheorySolver, E: SymbolicExecutor>(
    pool: &mut ExprPool,
    exec: &E,
    aux: &mut S,
    vc: &[ExprId],
    model: &Model,
    method: MucMethod,
) -> Result<SmtVerdict, S::Error> {
    let Implicant {
        mut path_formula,
        active_map,
    } = exec.model_implicant(pool, vc, model);

    // Remove redundant literals; the tuple-aware order keeps cores stable
    // under enumeration order.
    path_formula.sort_by(|&a, &b| cmp_expr(pool, a, b));
    path_formula.dedup();
    debug!(atoms = path_formula.len(), "checking path formula");

    aux.reset()?;
    for &e in &path_formula {
        aux.assert(pool, e)?;
    }
    match aux.solve()? {
        SolveResult::Sat => {
            let vars: Vec<ExprId> = exec
                .model_vars()
                .iter()
                .chain(exec.theory_vars())
                .copied()
                .collect();
            let cex = aux.model(pool, &vars)?;
            Ok(SmtVerdict::Sat(cex))
        }
        SolveResult::Unknown(reason) => Ok(SmtVerdict::Unknown(reason)),
        SolveResult::Unsat => {
            let (verdict, solver_calls) = run_muc(method, pool, aux, &path_formula)?;
            let core = match verdict {
                MucVerdict::Core(core) => core,
                MucVerdict::Unknown(reason) => return Ok(SmtVerdict::Unknown(reason)),
            };
            debug!(core = core.len(), solver_calls, "minimal unsat core computed");

            // An implicant can lack active Booleans entirely, e.g. when the
            // whole program is a single block.
            let mut active: Vec<ExprId> = core
                .iter()
                .filter_map(|e| active_map.get(e).copied())
                .collect();
            active.sort_by(|&a, &b| cmp_expr(pool, a, b));
            active.dedup();
            Ok(SmtVerdict::Unsat {
                active,
                solver_calls,
            })
        }
    }
}
