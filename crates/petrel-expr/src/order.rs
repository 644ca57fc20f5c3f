//! Tuple recognizers and the total expression ordering.
//!
//! Unsat cores and active-literal sets are kept sorted so that blocking
//! clauses come out the same regardless of enumeration order. The ordering
//! puts plain expressions before tuple-named edge constants; within each
//! class the arena id decides.

use std::cmp::Ordering;

use crate::pool::{ExprId, ExprNode, ExprPool};

/// True iff `e` is a Boolean constant named by an edge tuple.
pub fn is_tuple(pool: &ExprPool, e: ExprId) -> bool {
    matches!(pool.node(e), ExprNode::TupleConst { .. })
}

/// The `(src, dst)` pair carried by a tuple constant.
pub fn get_tuple(pool: &ExprPool, e: ExprId) -> Option<(ExprId, ExprId)> {
    match pool.node(e) {
        ExprNode::TupleConst { src, dst } => Some((*src, *dst)),
        _ => None,
    }
}

/// Total order with non-tuple expressions strictly before tuple ones.
pub fn cmp_expr(pool: &ExprPool, a: ExprId, b: ExprId) -> Ordering {
    match (is_tuple(pool, a), is_tuple(pool, b)) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        _ => a.cmp(&b),
    }
}

/// Strict `<` on [`cmp_expr`].
pub fn less_expr(pool: &ExprPool, a: ExprId, b: ExprId) -> bool {
    cmp_expr(pool, a, b) == Ordering::Less
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Sort;
    use proptest::prelude::*;

    fn small_pool() -> (ExprPool, Vec<ExprId>) {
        let mut pool = ExprPool::new();
        let a = pool.mk_bool_symbol("b!A");
        let b = pool.mk_bool_symbol("b!B");
        let c = pool.mk_bool_symbol("b!C");
        let x = pool.mk_symbol("x", Sort::Int);
        let zero = pool.mk_int(0);
        let cmp = pool.mk_lt(x, zero);
        let conj = pool.mk_and(vec![a, b]);
        let t1 = pool.mk_tuple_const(a, b);
        let t2 = pool.mk_tuple_const(b, c);
        (pool, vec![a, b, c, cmp, conj, t1, t2])
    }

    #[test]
    fn tuple_round_trip() {
        let mut pool = ExprPool::new();
        let x = pool.mk_bool_symbol("x");
        let y = pool.mk_bool_symbol("y");
        let t = pool.mk_tuple_const(x, y);
        assert!(is_tuple(&pool, t));
        assert_eq!(get_tuple(&pool, t), Some((x, y)));
        assert!(!is_tuple(&pool, x));
        assert_eq!(get_tuple(&pool, x), None);
    }

    #[test]
    fn non_tuples_sort_before_tuples() {
        let (pool, es) = small_pool();
        let mut sorted = es.clone();
        sorted.sort_by(|&a, &b| cmp_expr(&pool, a, b));
        let first_tuple = sorted.iter().position(|&e| is_tuple(&pool, e)).unwrap();
        assert!(sorted[..first_tuple].iter().all(|&e| !is_tuple(&pool, e)));
        assert!(sorted[first_tuple..].iter().all(|&e| is_tuple(&pool, e)));
    }

    proptest! {
        #[test]
        fn ordering_is_strict_and_total(i in 0usize..7, j in 0usize..7) {
            let (pool, es) = small_pool();
            let (a, b) = (es[i], es[j]);
            // irreflexive
            prop_assert!(!less_expr(&pool, a, a));
            // antisymmetric
            prop_assert!(!(less_expr(&pool, a, b) && less_expr(&pool, b, a)));
            // total
            if a != b {
                prop_assert!(less_expr(&pool, a, b) || less_expr(&pool, b, a));
            }
        }

        #[test]
        fn ordering_is_transitive(i in 0usize..7, j in 0usize..7, k in 0usize..7) {
            let (pool, es) = small_pool();
            let (a, b, c) = (es[i], es[j], es[k]);
            if less_expr(&pool, a, b) && less_expr(&pool, b, c) {
                prop_assert!(less_expr(&pool, a, c));
            }
        }
    }
}
