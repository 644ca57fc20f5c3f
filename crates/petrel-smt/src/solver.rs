use std::collections::HashMap;

use petrel_expr::{ExprId, ExprNode, ExprPool};

/// Result of a satisfiability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveResult {
    Sat,
    Unsat,
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bool(bool),
}

/// Variable assignments extracted from a SAT result, keyed by constant
/// name.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub values: HashMap<String, Value>,
}

impl Model {
    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(Value::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Truth value of the Boolean skeleton of `e` under this model.
    ///
    /// Constants resolve through their name; connectives evaluate when all
    /// relevant operands do. Theory atoms evaluate only when their integer
    /// sides do, so an atom over unassigned symbols yields `None`.
    pub fn eval_bool(&self, pool: &ExprPool, e: ExprId) -> Option<bool> {
        use ExprNode::*;
        match pool.node(e) {
            True => Some(true),
            False => Some(false),
            Symbol { .. } | TupleConst { .. } => self.get_bool(&pool.const_name(e)?),
            Not(x) => Some(!self.eval_bool(pool, *x)?),
            And(xs) => {
                let mut all = true;
                for &x in xs {
                    all &= self.eval_bool(pool, x)?;
                }
                Some(all)
            }
            Or(xs) => {
                let mut any = false;
                for &x in xs {
                    any |= self.eval_bool(pool, x)?;
                }
                Some(any)
            }
            Xor(a, b) => Some(self.eval_bool(pool, *a)? ^ self.eval_bool(pool, *b)?),
            Implies(a, b) => Some(!self.eval_bool(pool, *a)? || self.eval_bool(pool, *b)?),
            Iff(a, b) => Some(self.eval_bool(pool, *a)? == self.eval_bool(pool, *b)?),
            Ite(c, t, f) => {
                if self.eval_bool(pool, *c)? {
                    self.eval_bool(pool, *t)
                } else {
                    self.eval_bool(pool, *f)
                }
            }
            Eq(a, b) => match (self.eval_bool(pool, *a), self.eval_bool(pool, *b)) {
                (Some(x), Some(y)) => Some(x == y),
                _ => Some(self.eval_int(pool, *a)? == self.eval_int(pool, *b)?),
            },
            Lt(a, b) => Some(self.eval_int(pool, *a)? < self.eval_int(pool, *b)?),
            Le(a, b) => Some(self.eval_int(pool, *a)? <= self.eval_int(pool, *b)?),
            Gt(a, b) => Some(self.eval_int(pool, *a)? > self.eval_int(pool, *b)?),
            Ge(a, b) => Some(self.eval_int(pool, *a)? >= self.eval_int(pool, *b)?),
            _ => None,
        }
    }

    /// Integer value of `e` under this model, when computable.
    pub fn eval_int(&self, pool: &ExprPool, e: ExprId) -> Option<i64> {
        use ExprNode::*;
        match pool.node(e) {
            IntLit(v) => Some(*v),
            Symbol { .. } => self.get_int(&pool.const_name(e)?),
            Add(a, b) => Some(self.eval_int(pool, *a)? + self.eval_int(pool, *b)?),
            Sub(a, b) => Some(self.eval_int(pool, *a)? - self.eval_int(pool, *b)?),
            Mul(a, b) => Some(self.eval_int(pool, *a)? * self.eval_int(pool, *b)?),
            Neg(x) => Some(-self.eval_int(pool, *x)?),
            Ite(c, t, f) => {
                if self.eval_bool(pool, *c)? {
                    self.eval_int(pool, *t)
                } else {
                    self.eval_int(pool, *f)
                }
            }
            _ => None,
        }
    }
}

/// Capability of a theory solver, swappable behind the engine.
///
/// Assumption-based unsat cores are optional: the default implementation
/// reports no support, and the minimal-unsat-core layer falls back to the
/// naive engine.
pub trait TheorySolver {
    type Error: std::error::Error;

    /// Drop all assertions and state.
    fn reset(&mut self) -> Result<(), Self::Error>;

    /// Assert a Boolean expression.
    fn assert(&mut self, pool: &ExprPool, e: ExprId) -> Result<(), Self::Error>;

    fn solve(&mut self) -> Result<SolveResult, Self::Error>;

    /// Check satisfiability under positive Boolean assumptions.
    fn solve_assuming(
        &mut self,
        pool: &ExprPool,
        assumptions: &[ExprId],
    ) -> Result<SolveResult, Self::Error>;

    /// Evaluate `vars` in the model of the last SAT answer.
    fn model(&mut self, pool: &ExprPool, vars: &[ExprId]) -> Result<Model, Self::Error>;

    /// Whether `unsat_core_assumptions` returns anything useful.
    fn supports_assumption_unsat_core(&self) -> bool {
        false
    }

    /// Assumptions from the last `solve_assuming` that are jointly unsat
    /// with the asserted formulas.
    fn unsat_core_assumptions(&mut self) -> Result<Vec<ExprId>, Self::Error> {
        Ok(Vec::new())
    }
}
