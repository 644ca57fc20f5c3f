//! Boolean abstraction of a precise verification condition.
//!
//! The abstraction keeps block/edge constants, their negations, `and`/`or`
//! over them, and equalities between Boolean literals (the encoding of
//! edge-guard conditions). Every other atom is erased to `true`, so the
//! abstraction over-approximates: if it is unsat, so is the precise side.

use std::collections::HashMap;

use thiserror::Error;

use crate::nnf::{nnf, pre_nnf};
use crate::pool::{ExprId, ExprNode, ExprPool};

/// Rewrite failures that must abort the run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbstractionError {
    #[error("unsupported operator in pre-NNF rewrite: {0}")]
    Unsupported(&'static str),
}

/// `true`, `false`, or a Boolean constant.
pub fn is_pos_bool_lit(pool: &ExprPool, e: ExprId) -> bool {
    matches!(pool.node(e), ExprNode::True | ExprNode::False) || pool.is_bool_const(e)
}

/// Negation of a positive Boolean literal.
pub fn is_neg_bool_lit(pool: &ExprPool, e: ExprId) -> bool {
    match pool.node(e) {
        ExprNode::Not(x) => is_pos_bool_lit(pool, *x),
        _ => false,
    }
}

pub fn is_bool_lit(pool: &ExprPool, e: ExprId) -> bool {
    is_pos_bool_lit(pool, e) || is_neg_bool_lit(pool, e)
}

/// Abstract one formula: pre-NNF, NNF, then the erasure visit.
pub fn bool_abstraction(pool: &mut ExprPool, e: ExprId) -> Result<ExprId, AbstractionError> {
    let e = pre_nnf(pool, e)?;
    let e = nnf(pool, e);
    let mut memo = HashMap::new();
    Ok(ba(pool, e, &mut memo))
}

// Pre: e is in NNF.
fn ba(pool: &mut ExprPool, e: ExprId, memo: &mut HashMap<ExprId, ExprId>) -> ExprId {
    if let Some(&cached) = memo.get(&e) {
        return cached;
    }
    use ExprNode::*;
    let out = if is_pos_bool_lit(pool, e) {
        e
    } else {
        match pool.node(e).clone() {
            Not(x) => {
                if is_pos_bool_lit(pool, x) {
                    e
                } else {
                    pool.mk_true()
                }
            }
            And(xs) => {
                let xs = xs.into_iter().map(|x| ba(pool, x, memo)).collect();
                pool.mk_and(xs)
            }
            Or(xs) => {
                let xs = xs.into_iter().map(|x| ba(pool, x, memo)).collect();
                pool.mk_or(xs)
            }
            Eq(a, b) if is_bool_lit(pool, a) && is_bool_lit(pool, b) => e,
            // everything else is abstracted to true
            _ => pool.mk_true(),
        }
    };
    memo.insert(e, out);
    out
}

/// Abstract each formula of the VC and drop the ones that reduced to `true`.
pub fn bool_abstraction_side(
    pool: &mut ExprPool,
    side: &[ExprId],
) -> Result<Vec<ExprId>, AbstractionError> {
    let t = pool.mk_true();
    let mut abs_side = Vec::with_capacity(side.len());
    for &e in side {
        let b = bool_abstraction(pool, e)?;
        if b != t {
            abs_side.push(b);
        }
    }
    Ok(abs_side)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Sort;

    /// Invariant: only Boolean-constant atoms, `and`/`or`/`not`, and
    /// equalities between Boolean literals.
    fn abstraction_shape_ok(pool: &ExprPool, e: ExprId) -> bool {
        use ExprNode::*;
        if is_bool_lit(pool, e) {
            return true;
        }
        match pool.node(e) {
            And(xs) | Or(xs) => xs.iter().all(|&x| abstraction_shape_ok(pool, x)),
            Eq(a, b) => is_bool_lit(pool, *a) && is_bool_lit(pool, *b),
            _ => false,
        }
    }

    #[test]
    fn theory_atoms_are_erased_to_true() {
        let mut pool = ExprPool::new();
        let x = pool.mk_symbol("x", Sort::Int);
        let zero = pool.mk_int(0);
        let gt = pool.mk_gt(x, zero);
        let out = bool_abstraction(&mut pool, gt).unwrap();
        assert_eq!(out, pool.mk_true());
    }

    #[test]
    fn block_literals_and_connectives_survive() {
        let mut pool = ExprPool::new();
        let a = pool.mk_bool_symbol("b!A");
        let b = pool.mk_bool_symbol("b!B");
        let x = pool.mk_symbol("x", Sort::Int);
        let zero = pool.mk_int(0);
        let gt = pool.mk_gt(x, zero);
        let nb = pool.mk_not(b);
        let mix = pool.mk_and(vec![a, gt, nb]);
        let out = bool_abstraction(&mut pool, mix).unwrap();

        let t = pool.mk_true();
        assert_eq!(out, pool.mk_and(vec![a, t, nb]));
        assert!(abstraction_shape_ok(&pool, out));
    }

    #[test]
    fn implication_from_edge_literal_keeps_skeleton() {
        let mut pool = ExprPool::new();
        let bu = pool.mk_bool_symbol("b!u");
        let bv = pool.mk_bool_symbol("b!v");
        let edge = pool.mk_and(vec![bu, bv]);
        let x = pool.mk_symbol("x", Sort::Int);
        let zero = pool.mk_int(0);
        let guard = pool.mk_lt(x, zero);
        let imp = pool.mk_implies(edge, guard);

        // !(bu /\ bv) \/ true, i.e. !bu \/ !bv \/ true after NNF
        let out = bool_abstraction(&mut pool, imp).unwrap();
        assert!(abstraction_shape_ok(&pool, out));
    }

    #[test]
    fn equality_of_bool_literals_survives() {
        let mut pool = ExprPool::new();
        let c = pool.mk_bool_symbol("c");
        let d = pool.mk_bool_symbol("d");
        let nd = pool.mk_not(d);
        let eq = pool.mk_eq(c, nd);
        let out = bool_abstraction(&mut pool, eq).unwrap();
        assert_eq!(out, eq);
    }

    #[test]
    fn equality_with_theory_side_is_erased() {
        let mut pool = ExprPool::new();
        let c = pool.mk_bool_symbol("c");
        let x = pool.mk_symbol("x", Sort::Int);
        let zero = pool.mk_int(0);
        let cmp = pool.mk_ge(x, zero);
        let eq = pool.mk_eq(c, cmp);
        let out = bool_abstraction(&mut pool, eq).unwrap();
        assert_eq!(out, pool.mk_true());
    }

    #[test]
    fn tuple_constants_are_positive_literals() {
        let mut pool = ExprPool::new();
        let a = pool.mk_bool_symbol("b!A");
        let b = pool.mk_bool_symbol("b!B");
        let tup = pool.mk_tuple_const(a, b);
        let ntup = pool.mk_not(tup);
        assert!(is_pos_bool_lit(&pool, tup));
        assert!(is_neg_bool_lit(&pool, ntup));
        let out = bool_abstraction(&mut pool, ntup).unwrap();
        assert_eq!(out, ntup);
    }

    #[test]
    fn side_driver_drops_trivial_formulas() {
        let mut pool = ExprPool::new();
        let a = pool.mk_bool_symbol("b!A");
        let x = pool.mk_symbol("x", Sort::Int);
        let zero = pool.mk_int(0);
        let gt = pool.mk_gt(x, zero);
        let side = vec![a, gt];
        let abs = bool_abstraction_side(&mut pool, &side).unwrap();
        assert_eq!(abs, vec![a]);
    }

    #[test]
    fn xor_aborts_the_side_driver() {
        let mut pool = ExprPool::new();
        let a = pool.mk_bool_symbol("a");
        let b = pool.mk_bool_symbol("b");
        let x = pool.mk_xor(a, b);
        let side = vec![a, x];
        assert!(bool_abstraction_side(&mut pool, &side).is_err());
    }
}
