//! Pre-NNF rewriting and negation normal form.
//!
//! `pre_nnf` eliminates `=>`, `<=>` and Boolean `ite` in favour of
//! `and`/`or`/`not`; `xor` has no rewrite and is rejected. `nnf` then pushes
//! negations down to literals. Both are memoized DAG visits keyed by arena
//! id.

use std::collections::HashMap;

use crate::abstraction::AbstractionError;
use crate::pool::{ExprId, ExprNode, ExprPool, Sort};

/// Replace higher-order Boolean connectives by `and`/`or`/`not`.
///
/// - `a => b`      becomes `!a \/ b`
/// - `ite(c,x,y)`  (Boolean-sorted) becomes `(c /\ x) \/ (!c /\ y)`
/// - `a <=> b`     becomes `(!a \/ b) /\ (!b \/ a)`
/// - `xor`         is unsupported and fails loudly
pub fn pre_nnf(pool: &mut ExprPool, e: ExprId) -> Result<ExprId, AbstractionError> {
    let mut memo = HashMap::new();
    pre_nnf_rec(pool, e, &mut memo)
}

fn pre_nnf_rec(
    pool: &mut ExprPool,
    e: ExprId,
    memo: &mut HashMap<ExprId, ExprId>,
) -> Result<ExprId, AbstractionError> {
    if let Some(&cached) = memo.get(&e) {
        return Ok(cached);
    }
    use ExprNode::*;
    let out = match pool.node(e).clone() {
        True | False | IntLit(_) | BvLit { .. } | Symbol { .. } | TupleConst { .. } => e,
        Xor(..) => return Err(AbstractionError::Unsupported("xor")),
        Implies(a, b) => {
            let a = pre_nnf_rec(pool, a, memo)?;
            let b = pre_nnf_rec(pool, b, memo)?;
            let na = pool.mk_not(a);
            pool.mk_or(vec![na, b])
        }
        Iff(a, b) => {
            let a = pre_nnf_rec(pool, a, memo)?;
            let b = pre_nnf_rec(pool, b, memo)?;
            let na = pool.mk_not(a);
            let nb = pool.mk_not(b);
            let l = pool.mk_or(vec![na, b]);
            let r = pool.mk_or(vec![nb, a]);
            pool.mk_and(vec![l, r])
        }
        Ite(c, t, f) if pool.sort_of(e) == Sort::Bool => {
            let c = pre_nnf_rec(pool, c, memo)?;
            let t = pre_nnf_rec(pool, t, memo)?;
            let f = pre_nnf_rec(pool, f, memo)?;
            let nc = pool.mk_not(c);
            let l = pool.mk_and(vec![c, t]);
            let r = pool.mk_and(vec![nc, f]);
            pool.mk_or(vec![l, r])
        }
        Ite(c, t, f) => {
            let c = pre_nnf_rec(pool, c, memo)?;
            let t = pre_nnf_rec(pool, t, memo)?;
            let f = pre_nnf_rec(pool, f, memo)?;
            pool.mk_ite(c, t, f)
        }
        Not(x) => {
            let x = pre_nnf_rec(pool, x, memo)?;
            pool.mk_not(x)
        }
        And(xs) => {
            let xs = xs
                .into_iter()
                .map(|x| pre_nnf_rec(pool, x, memo))
                .collect::<Result<Vec<_>, _>>()?;
            pool.mk_and(xs)
        }
        Or(xs) => {
            let xs = xs
                .into_iter()
                .map(|x| pre_nnf_rec(pool, x, memo))
                .collect::<Result<Vec<_>, _>>()?;
            pool.mk_or(xs)
        }
        Eq(a, b) => rebuild2(pool, memo, a, b, Eq)?,
        Lt(a, b) => rebuild2(pool, memo, a, b, Lt)?,
        Le(a, b) => rebuild2(pool, memo, a, b, Le)?,
        Gt(a, b) => rebuild2(pool, memo, a, b, Gt)?,
        Ge(a, b) => rebuild2(pool, memo, a, b, Ge)?,
        Add(a, b) => rebuild2(pool, memo, a, b, Add)?,
        Sub(a, b) => rebuild2(pool, memo, a, b, Sub)?,
        Mul(a, b) => rebuild2(pool, memo, a, b, Mul)?,
        Div(a, b) => rebuild2(pool, memo, a, b, Div)?,
        Rem(a, b) => rebuild2(pool, memo, a, b, Rem)?,
        BvAdd(a, b) => rebuild2(pool, memo, a, b, BvAdd)?,
        BvSub(a, b) => rebuild2(pool, memo, a, b, BvSub)?,
        BvMul(a, b) => rebuild2(pool, memo, a, b, BvMul)?,
        BvUlt(a, b) => rebuild2(pool, memo, a, b, BvUlt)?,
        BvUle(a, b) => rebuild2(pool, memo, a, b, BvUle)?,
        Select(a, b) => rebuild2(pool, memo, a, b, Select)?,
        Neg(x) => {
            let x = pre_nnf_rec(pool, x, memo)?;
            pool.mk_neg(x)
        }
        Store(a, i, v) => {
            let a = pre_nnf_rec(pool, a, memo)?;
            let i = pre_nnf_rec(pool, i, memo)?;
            let v = pre_nnf_rec(pool, v, memo)?;
            pool.mk_store(a, i, v)
        }
    };
    memo.insert(e, out);
    Ok(out)
}

fn rebuild2(
    pool: &mut ExprPool,
    memo: &mut HashMap<ExprId, ExprId>,
    a: ExprId,
    b: ExprId,
    mk: fn(ExprId, ExprId) -> ExprNode,
) -> Result<ExprId, AbstractionError> {
    let a = pre_nnf_rec(pool, a, memo)?;
    let b = pre_nnf_rec(pool, b, memo)?;
    Ok(pool.intern(mk(a, b)))
}

/// Push negations down to literals. Expects `pre_nnf` output; anything that
/// is not `and`/`or`/`not` is treated as an atom.
pub fn nnf(pool: &mut ExprPool, e: ExprId) -> ExprId {
    let mut memo = HashMap::new();
    push_neg(pool, e, true, &mut memo)
}

fn push_neg(
    pool: &mut ExprPool,
    e: ExprId,
    positive: bool,
    memo: &mut HashMap<(ExprId, bool), ExprId>,
) -> ExprId {
    if let Some(&cached) = memo.get(&(e, positive)) {
        return cached;
    }
    use ExprNode::*;
    let out = match pool.node(e).clone() {
        Not(x) => push_neg(pool, x, !positive, memo),
        And(xs) => {
            let xs = xs
                .into_iter()
                .map(|x| push_neg(pool, x, positive, memo))
                .collect();
            if positive {
                pool.mk_and(xs)
            } else {
                pool.mk_or(xs)
            }
        }
        Or(xs) => {
            let xs = xs
                .into_iter()
                .map(|x| push_neg(pool, x, positive, memo))
                .collect();
            if positive {
                pool.mk_or(xs)
            } else {
                pool.mk_and(xs)
            }
        }
        True => {
            if positive {
                e
            } else {
                pool.mk_false()
            }
        }
        False => {
            if positive {
                e
            } else {
                pool.mk_true()
            }
        }
        _ => {
            if positive {
                e
            } else {
                pool.mk_not(e)
            }
        }
    };
    memo.insert((e, positive), out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// No `=>`, `<=>` or Boolean `ite` anywhere in the DAG.
    fn pre_nnf_shape_ok(pool: &ExprPool, e: ExprId) -> bool {
        let mut stack = vec![e];
        let mut seen = std::collections::HashSet::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            match pool.node(id) {
                ExprNode::Implies(..) | ExprNode::Iff(..) => return false,
                ExprNode::Ite(..) if pool.sort_of(id) == Sort::Bool => return false,
                _ => {}
            }
            stack.extend(pool.children(id));
        }
        true
    }

    #[test]
    fn implication_becomes_disjunction() {
        let mut pool = ExprPool::new();
        let a = pool.mk_bool_symbol("a");
        let b = pool.mk_bool_symbol("b");
        let imp = pool.mk_implies(a, b);
        let out = pre_nnf(&mut pool, imp).unwrap();
        let na = pool.mk_not(a);
        assert_eq!(out, pool.mk_or(vec![na, b]));
        assert!(pre_nnf_shape_ok(&pool, out));
    }

    #[test]
    fn iff_and_bool_ite_are_eliminated() {
        let mut pool = ExprPool::new();
        let a = pool.mk_bool_symbol("a");
        let b = pool.mk_bool_symbol("b");
        let c = pool.mk_bool_symbol("c");
        let iff = pool.mk_iff(a, b);
        let ite = pool.mk_ite(c, a, b);
        let nested = pool.mk_and(vec![iff, ite]);
        let out = pre_nnf(&mut pool, nested).unwrap();
        assert!(pre_nnf_shape_ok(&pool, out));
    }

    #[test]
    fn integer_ite_survives() {
        let mut pool = ExprPool::new();
        let c = pool.mk_bool_symbol("c");
        let one = pool.mk_int(1);
        let two = pool.mk_int(2);
        let x = pool.mk_symbol("x", Sort::Int);
        let ite = pool.mk_ite(c, one, two);
        let eq = pool.mk_eq(x, ite);
        let out = pre_nnf(&mut pool, eq).unwrap();
        assert!(pre_nnf_shape_ok(&pool, out));
        assert!(matches!(pool.node(out), ExprNode::Eq(..)));
    }

    #[test]
    fn xor_is_rejected() {
        let mut pool = ExprPool::new();
        let a = pool.mk_bool_symbol("a");
        let b = pool.mk_bool_symbol("b");
        let x = pool.mk_xor(a, b);
        assert!(matches!(
            pre_nnf(&mut pool, x),
            Err(AbstractionError::Unsupported("xor"))
        ));
    }

    #[test]
    fn negation_is_pushed_to_literals() {
        let mut pool = ExprPool::new();
        let a = pool.mk_bool_symbol("a");
        let b = pool.mk_bool_symbol("b");
        let conj = pool.mk_and(vec![a, b]);
        let neg = pool.mk_not(conj);
        let out = nnf(&mut pool, neg);
        let na = pool.mk_not(a);
        let nb = pool.mk_not(b);
        assert_eq!(out, pool.mk_or(vec![na, nb]));
    }

    #[test]
    fn double_negation_cancels() {
        let mut pool = ExprPool::new();
        let a = pool.mk_bool_symbol("a");
        let n = pool.mk_not(a);
        let nn = pool.mk_not(n);
        assert_eq!(nnf(&mut pool, nn), a);
    }
}
