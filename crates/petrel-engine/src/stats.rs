use std::fmt;

use serde::Serialize;

/// Diagnostic counters for one engine run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoreStats {
    /// Symbolic paths enumerated by the Boolean abstraction.
    pub total_paths: u64,
    /// Paths proved infeasible by abstract interpretation.
    pub paths_discharged_by_ai: u64,
    /// Paths proved infeasible by the SMT checker.
    pub paths_discharged_by_smt: u64,
    /// Solver calls spent inside minimal-unsat-core computations.
    pub muc_solver_calls: u64,
    /// Blocking clauses added to the main solver.
    pub blocking_clauses_added: u64,
}

impl fmt::Display for CoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "symbolic paths:        {}", self.total_paths)?;
        writeln!(f, "  discharged by AI:    {}", self.paths_discharged_by_ai)?;
        writeln!(f, "  discharged by SMT:   {}", self.paths_discharged_by_smt)?;
        writeln!(f, "MUC solver calls:      {}", self.muc_solver_calls)?;
        write!(f, "blocking clauses:      {}", self.blocking_clauses_added)
    }
}
