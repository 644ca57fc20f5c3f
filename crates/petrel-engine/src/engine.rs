//! The Boolean-abstraction refinement loop.
//!
//! The main solver holds the Boolean abstraction of the VC plus the
//! accumulated blocking clauses; the auxiliary solver is reset for each
//! path. A path is first handed to the optional abstract-interpretation
//! checker, then to the SMT checker; whichever refutes it contributes a
//! blocking clause. Re-emitting an identical clause means the refinement
//! stopped making progress and aborts the run rather than spinning.

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;
use tracing::{debug, info, warn};

use petrel_expr::{bool_abstraction_side, AbstractionError, ExprId, ExprPool};
use petrel_interp::AbstractEnv;
use petrel_ir::{BlockId, BmcTrace, Program, UnrollError};
use petrel_smt::{Model, SolveResult, TheorySolver};

use crate::ai_check::{ai_path_check, AiVerdict};
use crate::config::BmcOptions;
use crate::encode::UnrollingExec;
use crate::exec::SymbolicExecutor;
use crate::result::Verdict;
use crate::smt_check::{smt_path_check, SmtVerdict};
use crate::stats::CoreStats;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Abstraction(#[from] AbstractionError),
    #[error(transparent)]
    Unroll(#[from] UnrollError),
    #[error("solver error: {0}")]
    Solver(String),
}

/// Path-based bounded model checker over a theory solver `S` and a
/// symbolic executor `E`.
pub struct PathBmc<S: TheorySolver, E: SymbolicExecutor = UnrollingExec> {
    pool: ExprPool,
    program: Program,
    exec: E,
    main: S,
    aux: S,
    opts: BmcOptions,
    side: Vec<ExprId>,
    blocking_clauses: IndexSet<ExprId>,
    active_literals: Vec<ExprId>,
    model: Option<Model>,
    cex_model: Option<Model>,
    trace: Option<BmcTrace>,
    invariants: Option<IndexMap<BlockId, AbstractEnv>>,
    stats: CoreStats,
}

impl<S: TheorySolver> PathBmc<S, UnrollingExec> {
    /// Build the engine over the reference executor.
    pub fn new(
        program: Program,
        opts: BmcOptions,
        main: S,
        aux: S,
    ) -> Result<Self, EngineError> {
        let exec = UnrollingExec::new(program.clone(), opts.unroll_bound)?;
        Ok(Self::with_executor(program, exec, opts, main, aux))
    }
}

impl<S: TheorySolver, E: SymbolicExecutor> PathBmc<S, E> {
    pub fn with_executor(
        program: Program,
        exec: E,
        opts: BmcOptions,
        main: S,
        aux: S,
    ) -> Self {
        Self {
            pool: ExprPool::new(),
            program,
            exec,
            main,
            aux,
            opts,
            side: Vec::new(),
            blocking_clauses: IndexSet::new(),
            active_literals: Vec::new(),
            model: None,
            cex_model: None,
            trace: None,
            invariants: None,
            stats: CoreStats::default(),
        }
    }

    fn solver_err(e: S::Error) -> EngineError {
        EngineError::Solver(e.to_string())
    }

    /// Decide whether any bounded execution reaches the failure block.
    pub fn solve(&mut self) -> Result<Verdict, EngineError> {
        info!("starting path-based BMC");

        self.side = self.exec.encode(&mut self.pool);
        let abs_side = bool_abstraction_side(&mut self.pool, &self.side)?;
        debug!(
            precise = self.side.len(),
            abstracted = abs_side.len(),
            "asserting initial Boolean abstraction"
        );
        for &e in &abs_side {
            self.main.assert(&self.pool, e).map_err(Self::solver_err)?;
        }

        if self.opts.use_abstract_interp {
            let invariants = petrel_interp::analyze(&self.program);
            debug!(
                blocks = invariants.len(),
                "computed whole-program interval invariants"
            );
            self.invariants = Some(invariants);
        }

        let mut iterations = 0u64;
        loop {
            match self.main.solve().map_err(Self::solver_err)? {
                SolveResult::Unsat => {
                    if iterations == 0 {
                        warn!("program is trivially unsat: initial Boolean abstraction was enough");
                    }
                    info!(paths = self.stats.total_paths, "program is safe within the bound");
                    return Ok(Verdict::Unsat);
                }
                SolveResult::Unknown(reason) => return Ok(Verdict::Unknown(reason)),
                SolveResult::Sat => {}
            }
            iterations += 1;
            self.stats.total_paths += 1;

            let model = self
                .main
                .model(&self.pool, self.exec.model_vars())
                .map_err(Self::solver_err)?;
            let trace = self.exec.trace_of_model(&self.pool, &model);
            debug!(
                iteration = iterations,
                trace = %trace.display(&self.program),
                "enumerated symbolic path"
            );
            self.model = Some(model.clone());
            self.trace = Some(trace.clone());

            if self.opts.use_abstract_interp {
                match ai_path_check(&mut self.pool, &mut self.exec, &self.program, &trace) {
                    AiVerdict::Infeasible { active } => {
                        self.active_literals = active;
                        if !self.add_blocking_clause()? {
                            return Ok(self.stagnation());
                        }
                        self.stats.paths_discharged_by_ai += 1;
                        continue;
                    }
                    AiVerdict::Inconclusive => {}
                }
            }

            match smt_path_check(
                &mut self.pool,
                &self.exec,
                &mut self.aux,
                &self.side,
                &model,
                self.opts.muc_method,
            )
            .map_err(Self::solver_err)?
            {
                SmtVerdict::Sat(cex) => {
                    info!(iteration = iterations, "feasible path found: counter-example");
                    self.cex_model = Some(cex);
                    return Ok(Verdict::Sat);
                }
                SmtVerdict::Unknown(reason) => return Ok(Verdict::Unknown(reason)),
                SmtVerdict::Unsat {
                    active,
                    solver_calls,
                } => {
                    self.stats.muc_solver_calls += solver_calls;
                    self.active_literals = active;
                    if !self.add_blocking_clause()? {
                        return Ok(self.stagnation());
                    }
                    self.stats.paths_discharged_by_smt += 1;
                }
            }
        }
    }

    /// Negate the active-literal conjunction and assert it. Returns false
    /// when the identical clause was already present, which means the
    /// active-literal derivation stopped shrinking the search space.
    fn add_blocking_clause(&mut self) -> Result<bool, EngineError> {
        let clause = if self.active_literals.is_empty() {
            warn!("no active Boolean literals; path constraint is trivially unsat");
            self.pool.mk_false()
        } else {
            let conj = self.pool.mk_and(self.active_literals.clone());
            self.pool.mk_not(conj)
        };
        debug!(clause = %self.pool.display(clause), "adding blocking clause");
        self.main
            .assert(&self.pool, clause)
            .map_err(Self::solver_err)?;
        let inserted = self.blocking_clauses.insert(clause);
        if inserted {
            self.stats.blocking_clauses_added += 1;
        }
        Ok(inserted)
    }

    fn stagnation(&self) -> Verdict {
        warn!("same blocking clause emitted twice; aborting refinement");
        Verdict::Unknown("refinement stagnated on a repeated blocking clause".into())
    }

    /// Counter-example trace of the last SAT answer.
    pub fn get_trace(&self) -> Option<&BmcTrace> {
        self.trace.as_ref()
    }

    /// Theory model of the counter-example, when the SMT checker produced
    /// one.
    pub fn counterexample(&self) -> Option<&Model> {
        self.cex_model.as_ref()
    }

    /// Whole-program interval invariants, when AI was enabled.
    pub fn invariants(&self) -> Option<&IndexMap<BlockId, AbstractEnv>> {
        self.invariants.as_ref()
    }

    pub fn stats(&self) -> &CoreStats {
        &self.stats
    }
}
