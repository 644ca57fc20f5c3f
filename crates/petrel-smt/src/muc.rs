//! Minimal unsatisfiable cores.
//!
//! Three interchangeable engines over an unsat formula list: one solver
//! query with fresh assumption literals, the naive quadratic drop loop, and
//! recursive binary search with the naive engine below a size threshold.
//! All report the number of solver calls spent.

use petrel_expr::{ExprId, ExprPool};
use tracing::debug;

use crate::solver::{SolveResult, TheorySolver};

/// Strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MucMethod {
    /// One `solve_assuming` query; the backend's core, mapped back.
    #[default]
    Assumptions,
    /// Quadratic removal loop.
    Naive,
    /// Divide and conquer, naive below a threshold.
    BinarySearch,
}

impl MucMethod {
    pub fn name(self) -> &'static str {
        match self {
            MucMethod::Assumptions => "MUC with assumptions",
            MucMethod::Naive => "naive MUC",
            MucMethod::BinarySearch => "binary-search MUC",
        }
    }
}

/// Outcome of a core computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MucVerdict {
    Core(Vec<ExprId>),
    Unknown(String),
}

// Minimum size worth halving; below it the naive engine is cheaper.
const BINARY_SEARCH_THRESHOLD: usize = 10;

/// Compute a 1-minimal unsat core of `f` (which must be unsat) and the
/// solver-call count. The solver is reset and left dirty.
pub fn run_muc<S: TheorySolver>(
    method: MucMethod,
    pool: &mut ExprPool,
    solver: &mut S,
    f: &[ExprId],
) -> Result<(MucVerdict, u64), S::Error> {
    let mut calls = 0u64;
    let mut core = Vec::new();
    let unknown = match method {
        MucMethod::Assumptions => {
            if solver.supports_assumption_unsat_core() {
                return assumptions_muc(pool, solver, f);
            }
            debug!("backend lacks assumption cores, using the naive engine");
            naive_run(pool, solver, f, &[], &mut core, &mut calls)?
        }
        MucMethod::Naive => naive_run(pool, solver, f, &[], &mut core, &mut calls)?,
        MucMethod::BinarySearch => binary_run(pool, solver, f, &[], &mut core, &mut calls)?,
    };
    match unknown {
        Some(reason) => Ok((MucVerdict::Unknown(reason), calls)),
        None => Ok((MucVerdict::Core(core), calls)),
    }
}

fn assumptions_muc<S: TheorySolver>(
    pool: &mut ExprPool,
    solver: &mut S,
    f: &[ExprId],
) -> Result<(MucVerdict, u64), S::Error> {
    solver.reset()?;
    let mut assumptions = Vec::with_capacity(f.len());
    for (i, &fi) in f.iter().enumerate() {
        let a = pool.mk_bool_symbol(format!("muc!a{i}"));
        let imp = pool.mk_implies(a, fi);
        solver.assert(pool, imp)?;
        assumptions.push(a);
    }
    let verdict = match solver.solve_assuming(pool, &assumptions)? {
        SolveResult::Unsat => {
            let core_assumptions = solver.unsat_core_assumptions()?;
            let mut core = Vec::with_capacity(core_assumptions.len());
            for a in core_assumptions {
                if let Some(i) = assumptions.iter().position(|&x| x == a) {
                    core.push(f[i]);
                }
            }
            MucVerdict::Core(core)
        }
        SolveResult::Sat => {
            MucVerdict::Unknown("assumption query was unexpectedly satisfiable".into())
        }
        SolveResult::Unknown(reason) => MucVerdict::Unknown(reason),
    };
    Ok((verdict, 1))
}

fn check<S: TheorySolver>(
    pool: &ExprPool,
    solver: &mut S,
    items: &[ExprId],
    assumptions: &[ExprId],
    calls: &mut u64,
) -> Result<SolveResult, S::Error> {
    solver.reset()?;
    for &e in assumptions {
        solver.assert(pool, e)?;
    }
    for &e in items {
        solver.assert(pool, e)?;
    }
    *calls += 1;
    solver.solve()
}

/// Quadratic removal with swap-then-pop, resilient to mutation of the
/// candidate list. `assumptions` are asserted alongside every candidate
/// (used by the binary-search driver). Appends the core to `out`; returns a
/// reason when the solver gave up.
fn naive_run<S: TheorySolver>(
    pool: &ExprPool,
    solver: &mut S,
    f: &[ExprId],
    assumptions: &[ExprId],
    out: &mut Vec<ExprId>,
    calls: &mut u64,
) -> Result<Option<String>, S::Error> {
    let mut core = f.to_vec();
    let mut i = 0;
    while i < core.len() {
        let saved = core[i];
        core[i] = *core.last().unwrap();
        let candidate = &core[..core.len() - 1];
        match check(pool, solver, candidate, assumptions, calls)? {
            SolveResult::Sat => {
                core[i] = saved;
                i += 1;
            }
            SolveResult::Unsat => {
                core.pop();
            }
            SolveResult::Unknown(reason) => return Ok(Some(reason)),
        }
    }
    out.extend(core);
    Ok(None)
}

/// Recursively halve `f` under `assumptions`, minimizing each half against
/// the other. Appends to `core`.
fn binary_run<S: TheorySolver>(
    pool: &ExprPool,
    solver: &mut S,
    f: &[ExprId],
    assumptions: &[ExprId],
    core: &mut Vec<ExprId>,
    calls: &mut u64,
) -> Result<Option<String>, S::Error> {
    if f.len() <= BINARY_SEARCH_THRESHOLD {
        return match f.len() {
            0 => Ok(None),
            1 => {
                core.extend_from_slice(f);
                Ok(None)
            }
            _ => naive_run(pool, solver, f, assumptions, core, calls),
        };
    }

    let (a, b) = f.split_at(f.len() / 2);

    match check(pool, solver, a, assumptions, calls)? {
        SolveResult::Unsat => return binary_run(pool, solver, a, assumptions, core, calls),
        SolveResult::Sat => {}
        SolveResult::Unknown(reason) => return Ok(Some(reason)),
    }
    match check(pool, solver, b, assumptions, calls)? {
        SolveResult::Unsat => return binary_run(pool, solver, b, assumptions, core, calls),
        SolveResult::Sat => {}
        SolveResult::Unknown(reason) => return Ok(Some(reason)),
    }

    // Both halves are needed. Minimize A against B, then B against A's
    // core.
    let mut extended = assumptions.to_vec();
    extended.extend_from_slice(b);
    let mark = core.len();
    if let Some(reason) = binary_run(pool, solver, a, &extended, core, calls)? {
        return Ok(Some(reason));
    }

    extended.truncate(assumptions.len());
    let core_a: Vec<ExprId> = core[mark..].to_vec();
    extended.extend(core_a);
    binary_run(pool, solver, b, &extended, core, calls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::EnumSolver;

    /// {a, !a} plus `n` irrelevant literals.
    fn padded_contradiction(pool: &mut ExprPool, n: usize) -> (Vec<ExprId>, Vec<ExprId>) {
        let a = pool.mk_bool_symbol("a");
        let na = pool.mk_not(a);
        let mut f = vec![a];
        for i in 0..n {
            f.push(pool.mk_bool_symbol(format!("pad{i}")));
        }
        f.push(na);
        (f, vec![a, na])
    }

    fn is_unsat(pool: &ExprPool, f: &[ExprId]) -> bool {
        let mut s = EnumSolver::new();
        for &e in f {
            s.assert(pool, e).unwrap();
        }
        s.solve().unwrap() == SolveResult::Unsat
    }

    fn core_of(method: MucMethod, pool: &mut ExprPool, f: &[ExprId]) -> (Vec<ExprId>, u64) {
        let mut solver = EnumSolver::new();
        let (verdict, calls) = run_muc(method, pool, &mut solver, f).unwrap();
        match verdict {
            MucVerdict::Core(core) => (core, calls),
            MucVerdict::Unknown(r) => panic!("unexpected unknown: {r}"),
        }
    }

    #[test]
    fn all_methods_find_the_contradiction() {
        for method in [
            MucMethod::Assumptions,
            MucMethod::Naive,
            MucMethod::BinarySearch,
        ] {
            let mut pool = ExprPool::new();
            let (f, expected) = padded_contradiction(&mut pool, 6);
            let (mut core, calls) = core_of(method, &mut pool, &f);
            core.sort_unstable();
            let mut expected = expected;
            expected.sort_unstable();
            assert_eq!(core, expected, "{}", method.name());
            assert!(calls >= 1);
        }
    }

    #[test]
    fn cores_are_unsat_and_one_minimal() {
        let mut pool = ExprPool::new();
        // (a \/ b), !a, !b, c  -- the core is the first three.
        let a = pool.mk_bool_symbol("a");
        let b = pool.mk_bool_symbol("b");
        let c = pool.mk_bool_symbol("c");
        let na = pool.mk_not(a);
        let nb = pool.mk_not(b);
        let disj = pool.mk_or(vec![a, b]);
        let f = vec![disj, na, c, nb];

        for method in [
            MucMethod::Assumptions,
            MucMethod::Naive,
            MucMethod::BinarySearch,
        ] {
            let (core, _) = core_of(method, &mut pool, &f);
            assert!(is_unsat(&pool, &core), "{}", method.name());
            for i in 0..core.len() {
                let mut smaller = core.clone();
                smaller.remove(i);
                assert!(
                    !is_unsat(&pool, &smaller),
                    "{}: core not 1-minimal",
                    method.name()
                );
            }
        }
    }

    #[test]
    fn binary_search_handles_lists_past_the_threshold() {
        let mut pool = ExprPool::new();
        let (f, expected) = padded_contradiction(&mut pool, 12);
        let (mut core, calls) = core_of(MucMethod::BinarySearch, &mut pool, &f);
        core.sort_unstable();
        let mut expected = expected;
        expected.sort_unstable();
        assert_eq!(core, expected);
        assert!(calls > 1);
    }

    #[test]
    fn assumption_method_reports_a_single_call() {
        let mut pool = ExprPool::new();
        let (f, _) = padded_contradiction(&mut pool, 4);
        let (_, calls) = core_of(MucMethod::Assumptions, &mut pool, &f);
        assert_eq!(calls, 1);
    }
}
