use std::collections::HashMap;

use thiserror::Error;
use z3::SatResult as Z3SatResult;

use petrel_expr::{ExprId, ExprNode, ExprPool, Sort};

use crate::solver::{Model, SolveResult, TheorySolver, Value};

#[derive(Debug, Error)]
pub enum Z3Error {
    #[error("Z3 error: {0}")]
    Internal(String),
    #[error("sort mismatch in {0}")]
    SortMismatch(&'static str),
    #[error("expression has no constant name: {0}")]
    Unnamed(String),
}

/// Z3 backend over the shared expression DAG.
///
/// Constants are created on demand from their pool names, so structurally
/// equal expressions map to the same Z3 term; the per-id translation cache
/// lives until the next `reset`.
pub struct Z3Solver {
    solver: z3::Solver,
    cache: HashMap<ExprId, Z3Ast>,
    last_assumptions: Vec<(ExprId, z3::ast::Bool)>,
    params: Option<z3::Params>,
}

#[derive(Clone)]
enum Z3Ast {
    Bool(z3::ast::Bool),
    Int(z3::ast::Int),
    Bv(z3::ast::BV),
    Arr(z3::ast::Array),
}

impl Z3Ast {
    fn into_bool(self) -> Result<z3::ast::Bool, Z3Error> {
        match self {
            Z3Ast::Bool(b) => Ok(b),
            _ => Err(Z3Error::SortMismatch("expected Bool")),
        }
    }

    fn into_int(self) -> Result<z3::ast::Int, Z3Error> {
        match self {
            Z3Ast::Int(i) => Ok(i),
            _ => Err(Z3Error::SortMismatch("expected Int")),
        }
    }

    fn into_bv(self) -> Result<z3::ast::BV, Z3Error> {
        match self {
            Z3Ast::Bv(b) => Ok(b),
            _ => Err(Z3Error::SortMismatch("expected BitVec")),
        }
    }

    fn into_arr(self) -> Result<z3::ast::Array, Z3Error> {
        match self {
            Z3Ast::Arr(a) => Ok(a),
            _ => Err(Z3Error::SortMismatch("expected Array")),
        }
    }
}

impl Z3Solver {
    pub fn new() -> Self {
        Self {
            solver: z3::Solver::new(),
            cache: HashMap::new(),
            last_assumptions: Vec::new(),
            params: None,
        }
    }

    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        if timeout_secs == 0 {
            return Self::new();
        }
        let solver = z3::Solver::new();
        let mut params = z3::Params::new();
        let timeout_ms = timeout_secs.saturating_mul(1000);
        params.set_u32("timeout", timeout_ms as u32);
        solver.set_params(&params);
        Self {
            solver,
            cache: HashMap::new(),
            last_assumptions: Vec::new(),
            params: Some(params),
        }
    }

    fn const_of(&self, pool: &ExprPool, e: ExprId, sort: Sort) -> Result<Z3Ast, Z3Error> {
        let name = pool
            .const_name(e)
            .ok_or_else(|| Z3Error::Unnamed(pool.display(e).to_string()))?;
        Ok(match sort {
            Sort::Bool => Z3Ast::Bool(z3::ast::Bool::new_const(name)),
            Sort::Int => Z3Ast::Int(z3::ast::Int::new_const(name)),
            Sort::BitVec(w) => Z3Ast::Bv(z3::ast::BV::new_const(name, w)),
            Sort::Array => Z3Ast::Arr(z3::ast::Array::new_const(
                name,
                &z3::Sort::int(),
                &z3::Sort::int(),
            )),
        })
    }

    fn translate(&mut self, pool: &ExprPool, e: ExprId) -> Result<Z3Ast, Z3Error> {
        if let Some(cached) = self.cache.get(&e) {
            return Ok(cached.clone());
        }
        use ExprNode::*;
        let out = match pool.node(e).clone() {
            True => Z3Ast::Bool(z3::ast::Bool::from_bool(true)),
            False => Z3Ast::Bool(z3::ast::Bool::from_bool(false)),
            IntLit(v) => Z3Ast::Int(z3::ast::Int::from_i64(v)),
            BvLit { value, width } => Z3Ast::Bv(z3::ast::BV::from_u64(value, width)),
            Symbol { .. } | TupleConst { .. } => self.const_of(pool, e, pool.sort_of(e))?,
            Not(x) => {
                let b = self.translate(pool, x)?.into_bool()?;
                Z3Ast::Bool(b.not())
            }
            And(xs) => {
                let bools = xs
                    .into_iter()
                    .map(|x| self.translate(pool, x).and_then(Z3Ast::into_bool))
                    .collect::<Result<Vec<_>, _>>()?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Z3Ast::Bool(z3::ast::Bool::and(&refs))
            }
            Or(xs) => {
                let bools = xs
                    .into_iter()
                    .map(|x| self.translate(pool, x).and_then(Z3Ast::into_bool))
                    .collect::<Result<Vec<_>, _>>()?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Z3Ast::Bool(z3::ast::Bool::or(&refs))
            }
            Xor(a, b) => {
                let l = self.translate(pool, a)?.into_bool()?;
                let r = self.translate(pool, b)?.into_bool()?;
                Z3Ast::Bool(l.xor(&r))
            }
            Implies(a, b) => {
                let l = self.translate(pool, a)?.into_bool()?;
                let r = self.translate(pool, b)?.into_bool()?;
                Z3Ast::Bool(l.implies(&r))
            }
            Iff(a, b) => {
                let l = self.translate(pool, a)?.into_bool()?;
                let r = self.translate(pool, b)?.into_bool()?;
                Z3Ast::Bool(l.iff(&r))
            }
            Ite(c, t, f) => {
                let c = self.translate(pool, c)?.into_bool()?;
                match (self.translate(pool, t)?, self.translate(pool, f)?) {
                    (Z3Ast::Int(ti), Z3Ast::Int(fi)) => Z3Ast::Int(c.ite(&ti, &fi)),
                    (Z3Ast::Bool(tb), Z3Ast::Bool(fb)) => Z3Ast::Bool(c.ite(&tb, &fb)),
                    (Z3Ast::Bv(tb), Z3Ast::Bv(fb)) => Z3Ast::Bv(c.ite(&tb, &fb)),
                    _ => return Err(Z3Error::SortMismatch("ite")),
                }
            }
            Eq(a, b) => {
                let l = self.translate(pool, a)?;
                let r = self.translate(pool, b)?;
                match (l, r) {
                    (Z3Ast::Int(li), Z3Ast::Int(ri)) => Z3Ast::Bool(li.eq(&ri)),
                    (Z3Ast::Bool(lb), Z3Ast::Bool(rb)) => Z3Ast::Bool(lb.eq(&rb)),
                    (Z3Ast::Bv(lb), Z3Ast::Bv(rb)) => Z3Ast::Bool(lb.eq(&rb)),
                    (Z3Ast::Arr(la), Z3Ast::Arr(ra)) => Z3Ast::Bool(la.eq(&ra)),
                    _ => return Err(Z3Error::SortMismatch("=")),
                }
            }
            Lt(a, b) => {
                let (l, r) = self.int_pair(pool, a, b)?;
                Z3Ast::Bool(l.lt(&r))
            }
            Le(a, b) => {
                let (l, r) = self.int_pair(pool, a, b)?;
                Z3Ast::Bool(l.le(&r))
            }
            Gt(a, b) => {
                let (l, r) = self.int_pair(pool, a, b)?;
                Z3Ast::Bool(l.gt(&r))
            }
            Ge(a, b) => {
                let (l, r) = self.int_pair(pool, a, b)?;
                Z3Ast::Bool(l.ge(&r))
            }
            Add(a, b) => {
                let (l, r) = self.int_pair(pool, a, b)?;
                Z3Ast::Int(&l + &r)
            }
            Sub(a, b) => {
                let (l, r) = self.int_pair(pool, a, b)?;
                Z3Ast::Int(&l - &r)
            }
            Mul(a, b) => {
                let (l, r) = self.int_pair(pool, a, b)?;
                Z3Ast::Int(&l * &r)
            }
            Div(a, b) => {
                let (l, r) = self.int_pair(pool, a, b)?;
                Z3Ast::Int(&l / &r)
            }
            Rem(a, b) => {
                let (l, r) = self.int_pair(pool, a, b)?;
                Z3Ast::Int(&l % &r)
            }
            Neg(x) => {
                let v = self.translate(pool, x)?.into_int()?;
                let zero = z3::ast::Int::from_i64(0);
                Z3Ast::Int(&zero - &v)
            }
            BvAdd(a, b) => {
                let (l, r) = self.bv_pair(pool, a, b)?;
                Z3Ast::Bv(l.bvadd(&r))
            }
            BvSub(a, b) => {
                let (l, r) = self.bv_pair(pool, a, b)?;
                Z3Ast::Bv(l.bvsub(&r))
            }
            BvMul(a, b) => {
                let (l, r) = self.bv_pair(pool, a, b)?;
                Z3Ast::Bv(l.bvmul(&r))
            }
            BvUlt(a, b) => {
                let (l, r) = self.bv_pair(pool, a, b)?;
                Z3Ast::Bool(l.bvult(&r))
            }
            BvUle(a, b) => {
                let (l, r) = self.bv_pair(pool, a, b)?;
                Z3Ast::Bool(l.bvule(&r))
            }
            Select(a, i) => {
                let arr = self.translate(pool, a)?.into_arr()?;
                let idx = self.translate(pool, i)?.into_int()?;
                let v = arr
                    .select(&idx)
                    .as_int()
                    .ok_or(Z3Error::SortMismatch("select"))?;
                Z3Ast::Int(v)
            }
            Store(a, i, v) => {
                let arr = self.translate(pool, a)?.into_arr()?;
                let idx = self.translate(pool, i)?.into_int()?;
                let val = self.translate(pool, v)?.into_int()?;
                Z3Ast::Arr(arr.store(&idx, &val))
            }
        };
        self.cache.insert(e, out.clone());
        Ok(out)
    }

    fn int_pair(
        &mut self,
        pool: &ExprPool,
        a: ExprId,
        b: ExprId,
    ) -> Result<(z3::ast::Int, z3::ast::Int), Z3Error> {
        let l = self.translate(pool, a)?.into_int()?;
        let r = self.translate(pool, b)?.into_int()?;
        Ok((l, r))
    }

    fn bv_pair(
        &mut self,
        pool: &ExprPool,
        a: ExprId,
        b: ExprId,
    ) -> Result<(z3::ast::BV, z3::ast::BV), Z3Error> {
        let l = self.translate(pool, a)?.into_bv()?;
        let r = self.translate(pool, b)?.into_bv()?;
        Ok((l, r))
    }
}

impl Default for Z3Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl TheorySolver for Z3Solver {
    type Error = Z3Error;

    fn reset(&mut self) -> Result<(), Z3Error> {
        self.solver.reset();
        // Z3 may drop per-solver parameters on reset; reapply the timeout.
        if let Some(params) = &self.params {
            self.solver.set_params(params);
        }
        self.cache.clear();
        self.last_assumptions.clear();
        Ok(())
    }

    fn assert(&mut self, pool: &ExprPool, e: ExprId) -> Result<(), Z3Error> {
        let term = self.translate(pool, e)?.into_bool()?;
        self.solver.assert(&term);
        Ok(())
    }

    fn solve(&mut self) -> Result<SolveResult, Z3Error> {
        Ok(match self.solver.check() {
            Z3SatResult::Sat => SolveResult::Sat,
            Z3SatResult::Unsat => SolveResult::Unsat,
            Z3SatResult::Unknown => SolveResult::Unknown("Z3 returned unknown".into()),
        })
    }

    fn solve_assuming(
        &mut self,
        pool: &ExprPool,
        assumptions: &[ExprId],
    ) -> Result<SolveResult, Z3Error> {
        let mut asts = Vec::with_capacity(assumptions.len());
        self.last_assumptions.clear();
        for &a in assumptions {
            let b = self.translate(pool, a)?.into_bool()?;
            self.last_assumptions.push((a, b.clone()));
            asts.push(b);
        }
        Ok(match self.solver.check_assumptions(&asts) {
            Z3SatResult::Sat => SolveResult::Sat,
            Z3SatResult::Unsat => SolveResult::Unsat,
            Z3SatResult::Unknown => SolveResult::Unknown("Z3 returned unknown".into()),
        })
    }

    fn model(&mut self, pool: &ExprPool, vars: &[ExprId]) -> Result<Model, Z3Error> {
        let z3_model = self
            .solver
            .get_model()
            .ok_or_else(|| Z3Error::Internal("no model available".into()))?;
        let mut values = HashMap::new();
        for &v in vars {
            let Some(name) = pool.const_name(v) else {
                continue;
            };
            match self.translate(pool, v)? {
                Z3Ast::Bool(b) => {
                    if let Some(val) = z3_model.eval::<z3::ast::Bool>(&b, true) {
                        if let Some(b) = val.as_bool() {
                            values.insert(name, Value::Bool(b));
                        }
                    }
                }
                Z3Ast::Int(i) => {
                    if let Some(val) = z3_model.eval::<z3::ast::Int>(&i, true) {
                        if let Some(n) = val.as_i64() {
                            values.insert(name, Value::Int(n));
                        }
                    }
                }
                Z3Ast::Bv(_) | Z3Ast::Arr(_) => {}
            }
        }
        Ok(Model { values })
    }

    fn supports_assumption_unsat_core(&self) -> bool {
        true
    }

    fn unsat_core_assumptions(&mut self) -> Result<Vec<ExprId>, Z3Error> {
        let core = self.solver.get_unsat_core();
        let mut out = Vec::new();
        for core_lit in core {
            if let Some((id, _)) = self
                .last_assumptions
                .iter()
                .find(|(_, lit)| *lit == core_lit)
            {
                out.push(*id);
            }
        }
        Ok(out)
    }
}
