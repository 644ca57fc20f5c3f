//! Brute-force Boolean reference solver.
//!
//! Decides the pure Boolean-constant fragment by enumerating assignments.
//! It exists so the minimal-unsat-core engines and the refinement loop can
//! be exercised without an external solver; anything outside the fragment
//! (or with too many atoms to enumerate) answers `Unknown`. Formulas are
//! lowered to an owned Boolean AST at assert time, like any other backend.

use std::convert::Infallible;

use indexmap::IndexSet;

use petrel_expr::{ExprId, ExprNode, ExprPool};

use crate::solver::{Model, SolveResult, TheorySolver, Value};

const MAX_ATOMS: usize = 18;

#[derive(Debug, Clone)]
enum BExpr {
    Const(bool),
    Atom(String),
    /// A theory atom the Boolean fragment cannot decide.
    Opaque,
    Not(Box<BExpr>),
    And(Vec<BExpr>),
    Or(Vec<BExpr>),
    Xor(Box<BExpr>, Box<BExpr>),
    Implies(Box<BExpr>, Box<BExpr>),
    Iff(Box<BExpr>, Box<BExpr>),
    Ite(Box<BExpr>, Box<BExpr>, Box<BExpr>),
}

impl BExpr {
    fn lower(pool: &ExprPool, e: ExprId) -> BExpr {
        use ExprNode::*;
        if pool.is_bool_const(e) {
            return match pool.const_name(e) {
                Some(name) => BExpr::Atom(name),
                None => BExpr::Opaque,
            };
        }
        let b = |x: &ExprId| Box::new(BExpr::lower(pool, *x));
        match pool.node(e) {
            True => BExpr::Const(true),
            False => BExpr::Const(false),
            Not(x) => BExpr::Not(b(x)),
            And(xs) => BExpr::And(xs.iter().map(|x| BExpr::lower(pool, *x)).collect()),
            Or(xs) => BExpr::Or(xs.iter().map(|x| BExpr::lower(pool, *x)).collect()),
            Xor(x, y) => BExpr::Xor(b(x), b(y)),
            Implies(x, y) => BExpr::Implies(b(x), b(y)),
            Iff(x, y) => BExpr::Iff(b(x), b(y)),
            Ite(c, t, f) => BExpr::Ite(b(c), b(t), b(f)),
            Eq(x, y) => {
                let (lx, ly) = (BExpr::lower(pool, *x), BExpr::lower(pool, *y));
                if lx.is_opaque() || ly.is_opaque() {
                    BExpr::Opaque
                } else {
                    BExpr::Iff(Box::new(lx), Box::new(ly))
                }
            }
            _ => BExpr::Opaque,
        }
    }

    fn is_opaque(&self) -> bool {
        matches!(self, BExpr::Opaque)
    }

    fn atoms(&self, out: &mut IndexSet<String>) {
        match self {
            BExpr::Atom(name) => {
                out.insert(name.clone());
            }
            BExpr::Const(_) | BExpr::Opaque => {}
            BExpr::Not(x) => x.atoms(out),
            BExpr::And(xs) | BExpr::Or(xs) => xs.iter().for_each(|x| x.atoms(out)),
            BExpr::Xor(a, b) | BExpr::Implies(a, b) | BExpr::Iff(a, b) => {
                a.atoms(out);
                b.atoms(out);
            }
            BExpr::Ite(c, t, f) => {
                c.atoms(out);
                t.atoms(out);
                f.atoms(out);
            }
        }
    }

    fn eval(&self, model: &Model) -> Option<bool> {
        match self {
            BExpr::Const(v) => Some(*v),
            BExpr::Atom(name) => model.get_bool(name),
            BExpr::Opaque => None,
            BExpr::Not(x) => Some(!x.eval(model)?),
            BExpr::And(xs) => {
                let mut all = true;
                for x in xs {
                    all &= x.eval(model)?;
                }
                Some(all)
            }
            BExpr::Or(xs) => {
                let mut any = false;
                for x in xs {
                    any |= x.eval(model)?;
                }
                Some(any)
            }
            BExpr::Xor(a, b) => Some(a.eval(model)? ^ b.eval(model)?),
            BExpr::Implies(a, b) => Some(!a.eval(model)? || b.eval(model)?),
            BExpr::Iff(a, b) => Some(a.eval(model)? == b.eval(model)?),
            BExpr::Ite(c, t, f) => {
                if c.eval(model)? {
                    t.eval(model)
                } else {
                    f.eval(model)
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct EnumSolver {
    assertions: Vec<BExpr>,
    last_assumptions: Vec<(ExprId, BExpr)>,
    last_model: Option<Model>,
}

impl EnumSolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn enumerate(formulas: &[&BExpr]) -> (SolveResult, Option<Model>) {
        let mut names = IndexSet::new();
        for f in formulas {
            f.atoms(&mut names);
        }
        let names: Vec<String> = names.into_iter().collect();
        if names.len() > MAX_ATOMS {
            return (
                SolveResult::Unknown(format!(
                    "enumeration solver supports at most {MAX_ATOMS} Boolean atoms, got {}",
                    names.len()
                )),
                None,
            );
        }
        for mask in 0u32..(1u32 << names.len()) {
            let model = Model {
                values: names
                    .iter()
                    .enumerate()
                    .map(|(i, n)| (n.clone(), Value::Bool(mask >> i & 1 == 1)))
                    .collect(),
            };
            let mut ok = true;
            for f in formulas {
                match f.eval(&model) {
                    Some(true) => {}
                    Some(false) => {
                        ok = false;
                        break;
                    }
                    None => {
                        return (
                            SolveResult::Unknown(
                                "formula outside the Boolean-constant fragment".into(),
                            ),
                            None,
                        );
                    }
                }
            }
            if ok {
                return (SolveResult::Sat, Some(model));
            }
        }
        (SolveResult::Unsat, None)
    }

    fn run(&mut self, with_assumptions: bool) -> SolveResult {
        let mut formulas: Vec<&BExpr> = self.assertions.iter().collect();
        if with_assumptions {
            formulas.extend(self.last_assumptions.iter().map(|(_, b)| b));
        }
        let (result, model) = Self::enumerate(&formulas);
        self.last_model = model;
        result
    }
}

impl TheorySolver for EnumSolver {
    type Error = Infallible;

    fn reset(&mut self) -> Result<(), Infallible> {
        self.assertions.clear();
        self.last_assumptions.clear();
        self.last_model = None;
        Ok(())
    }

    fn assert(&mut self, pool: &ExprPool, e: ExprId) -> Result<(), Infallible> {
        self.assertions.push(BExpr::lower(pool, e));
        Ok(())
    }

    fn solve(&mut self) -> Result<SolveResult, Infallible> {
        self.last_assumptions.clear();
        Ok(self.run(false))
    }

    fn solve_assuming(
        &mut self,
        pool: &ExprPool,
        assumptions: &[ExprId],
    ) -> Result<SolveResult, Infallible> {
        self.last_assumptions = assumptions
            .iter()
            .map(|&a| (a, BExpr::lower(pool, a)))
            .collect();
        Ok(self.run(true))
    }

    fn model(&mut self, _pool: &ExprPool, _vars: &[ExprId]) -> Result<Model, Infallible> {
        Ok(self.last_model.clone().unwrap_or_default())
    }

    fn supports_assumption_unsat_core(&self) -> bool {
        true
    }

    /// Greedily minimized core over the last assumption set, so the
    /// assumptions-based engine is held to the same 1-minimality bar as the
    /// others in tests.
    fn unsat_core_assumptions(&mut self) -> Result<Vec<ExprId>, Infallible> {
        let mut core: Vec<(ExprId, BExpr)> = self.last_assumptions.clone();
        let mut i = 0;
        while i < core.len() {
            let mut formulas: Vec<&BExpr> = self.assertions.iter().collect();
            for (j, (_, b)) in core.iter().enumerate() {
                if j != i {
                    formulas.push(b);
                }
            }
            if Self::enumerate(&formulas).0 == SolveResult::Unsat {
                core.remove(i);
            } else {
                i += 1;
            }
        }
        Ok(core.into_iter().map(|(e, _)| e).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decides_simple_boolean_queries() {
        let mut pool = ExprPool::new();
        let a = pool.mk_bool_symbol("a");
        let na = pool.mk_not(a);

        let mut s = EnumSolver::new();
        s.assert(&pool, a).unwrap();
        assert_eq!(s.solve().unwrap(), SolveResult::Sat);
        let m = s.model(&pool, &[]).unwrap();
        assert_eq!(m.get_bool("a"), Some(true));

        s.assert(&pool, na).unwrap();
        assert_eq!(s.solve().unwrap(), SolveResult::Unsat);
    }

    #[test]
    fn assumption_core_is_minimized() {
        let mut pool = ExprPool::new();
        let a = pool.mk_bool_symbol("a");
        let b = pool.mk_bool_symbol("b");
        let na = pool.mk_not(a);

        let mut s = EnumSolver::new();
        s.assert(&pool, na).unwrap();
        assert_eq!(
            s.solve_assuming(&pool, &[a, b]).unwrap(),
            SolveResult::Unsat
        );
        assert_eq!(s.unsat_core_assumptions().unwrap(), vec![a]);
    }

    #[test]
    fn theory_atoms_yield_unknown() {
        let mut pool = ExprPool::new();
        let x = pool.mk_symbol("x", petrel_expr::Sort::Int);
        let zero = pool.mk_int(0);
        let cmp = pool.mk_ge(x, zero);

        let mut s = EnumSolver::new();
        s.assert(&pool, cmp).unwrap();
        assert!(matches!(s.solve().unwrap(), SolveResult::Unknown(_)));
    }
}
