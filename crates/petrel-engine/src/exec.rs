//! The symbolic-executor seam and per-cut-point symbolic stores.

use std::collections::HashMap;

use indexmap::IndexMap;

use petrel_expr::{ExprId, ExprPool};
use petrel_ir::{BlockId, BmcTrace};
use petrel_smt::Model;

/// Binding of bare block symbols to their path-position-specific versions
/// within one cut-point segment.
#[derive(Debug, Clone, Default)]
pub struct SymStore {
    map: IndexMap<ExprId, ExprId>,
}

impl SymStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// First definition wins within a store.
    pub fn define(&mut self, sym: ExprId, concrete: ExprId) {
        self.map.entry(sym).or_insert(concrete);
    }

    pub fn is_defined(&self, sym: ExprId) -> bool {
        self.map.contains_key(&sym)
    }

    /// Rewrite defined symbols inside `e`. Tuple constants are opaque to
    /// substitution; the caller rebinds them explicitly.
    pub fn eval(&self, pool: &mut ExprPool, e: ExprId) -> ExprId {
        let map = &self.map;
        pool.substitute(&|x| map.get(&x).copied(), e)
    }
}

/// Path formula extracted from a model, with provenance.
#[derive(Debug, Clone, Default)]
pub struct Implicant {
    /// Precise atoms whose truth justifies the VC under the model.
    pub path_formula: Vec<ExprId>,
    /// Atom to originating block/edge literal.
    pub active_map: HashMap<ExprId, ExprId>,
}

/// What the engine needs from a symbolic executor.
///
/// Block and edge literals handed out here are the *bare* ones over the
/// original CFG; the VC produced by `encode` speaks about their
/// SSA-renamed versions, and `stores` carries the bindings between the
/// two.
pub trait SymbolicExecutor {
    /// Emit the precise VC as an ordered formula sequence.
    fn encode(&mut self, pool: &mut ExprPool) -> Vec<ExprId>;

    /// Bare Boolean symbol of an original block.
    fn block_symbol(&mut self, pool: &mut ExprPool, block: BlockId) -> ExprId;

    /// Bare edge literal: endpoint conjunction, or a tuple constant when
    /// the edge is critical.
    fn edge_literal(&mut self, pool: &mut ExprPool, src: BlockId, dst: BlockId) -> ExprId;

    /// Implicant of the VC under a model of the Boolean abstraction.
    fn model_implicant(&self, pool: &ExprPool, vc: &[ExprId], model: &Model) -> Implicant;

    /// Per-cut-point symbolic stores, in path order.
    fn stores(&self) -> &[SymStore];

    /// Boolean constants the engine should ask the main model for.
    fn model_vars(&self) -> &[ExprId];

    /// Theory constants worth reporting in a counter-example model.
    fn theory_vars(&self) -> &[ExprId];

    /// The original-program path pinned by a model of the abstraction.
    fn trace_of_model(&self, pool: &ExprPool, model: &Model) -> BmcTrace;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_eval_rewrites_defined_symbols_only() {
        let mut pool = ExprPool::new();
        let a = pool.mk_bool_symbol("b!A");
        let b = pool.mk_bool_symbol("b!B");
        let a0 = pool.mk_bool_symbol("b!A!0");
        let conj = pool.mk_and(vec![a, b]);

        let mut store = SymStore::new();
        store.define(a, a0);

        let out = store.eval(&mut pool, conj);
        let expected = pool.mk_and(vec![a0, b]);
        assert_eq!(out, expected);
        assert!(store.is_defined(a));
        assert!(!store.is_defined(b));
    }

    #[test]
    fn first_definition_wins() {
        let mut pool = ExprPool::new();
        let a = pool.mk_bool_symbol("b!A");
        let a0 = pool.mk_bool_symbol("b!A!0");
        let a1 = pool.mk_bool_symbol("b!A!1");

        let mut store = SymStore::new();
        store.define(a, a0);
        store.define(a, a1);
        assert_eq!(store.eval(&mut pool, a), a0);
    }

    #[test]
    fn tuple_constants_are_opaque_to_eval() {
        let mut pool = ExprPool::new();
        let a = pool.mk_bool_symbol("b!A");
        let b = pool.mk_bool_symbol("b!B");
        let a0 = pool.mk_bool_symbol("b!A!0");
        let tup = pool.mk_tuple_const(a, b);

        let mut store = SymStore::new();
        store.define(a, a0);
        assert_eq!(store.eval(&mut pool, tup), tup);
    }
}
