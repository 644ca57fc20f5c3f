//! Reference symbolic executor over a bounded loop unrolling.
//!
//! Produces the precise VC for an unrolled program. Control flow is encoded
//! through Boolean block and edge literals: every non-entry block is the
//! disjunction of its in-edge literals, edge literals imply their guards,
//! and block literals imply the data constraints of their statements. The
//! same executor extracts model implicants with provenance and keeps the
//! per-cut-point symbolic stores that rebind bare literals to their
//! unrolled versions.

use std::collections::HashMap;

use indexmap::IndexMap;

use petrel_expr::{is_tuple, ExprId, ExprNode, ExprPool, Sort};
use petrel_ir::{
    topo_order, unroll, BinOp, BlockId, BmcTrace, BoolOp, CmpOp, Cond, Operand, Program, Stmt,
    Terminator, UnrollError, UnrolledProgram, VarId, VarSort,
};
use petrel_smt::Model;

use crate::exec::{Implicant, SymStore, SymbolicExecutor};

pub struct UnrollingExec {
    original: Program,
    unrolled: UnrolledProgram,
    topo: Vec<BlockId>,
    bare_syms: IndexMap<BlockId, ExprId>,
    block_syms: IndexMap<BlockId, ExprId>,
    edge_lits: IndexMap<(BlockId, BlockId), ExprId>,
    var_syms: IndexMap<VarId, ExprId>,
    stores: Vec<SymStore>,
    model_vars: Vec<ExprId>,
    theory_vars: Vec<ExprId>,
}

impl UnrollingExec {
    /// Unwind `original` and prepare the executor. Variable names must be
    /// unique within the program; they become the solver-level constant
    /// names.
    pub fn new(original: Program, bound: usize) -> Result<Self, UnrollError> {
        let unrolled = unroll(&original, bound)?;
        let topo =
            topo_order(&unrolled.program).expect("unroll always returns an acyclic program");
        Ok(Self {
            original,
            unrolled,
            topo,
            bare_syms: IndexMap::new(),
            block_syms: IndexMap::new(),
            edge_lits: IndexMap::new(),
            var_syms: IndexMap::new(),
            stores: Vec::new(),
            model_vars: Vec::new(),
            theory_vars: Vec::new(),
        })
    }

    pub fn original(&self) -> &Program {
        &self.original
    }

    pub fn unrolled(&self) -> &UnrolledProgram {
        &self.unrolled
    }

    fn operand_expr(&mut self, pool: &mut ExprPool, op: Operand) -> ExprId {
        match op {
            Operand::Var(v) => self.var_syms[&v],
            Operand::Int(c) => pool.mk_int(c),
            Operand::Bool(true) => pool.mk_true(),
            Operand::Bool(false) => pool.mk_false(),
        }
    }

    fn cmp_expr(
        &mut self,
        pool: &mut ExprPool,
        op: CmpOp,
        lhs: Operand,
        rhs: Operand,
    ) -> ExprId {
        let l = self.operand_expr(pool, lhs);
        let r = self.operand_expr(pool, rhs);
        match op {
            CmpOp::Eq => pool.mk_eq(l, r),
            CmpOp::Ne => {
                let eq = pool.mk_eq(l, r);
                pool.mk_not(eq)
            }
            CmpOp::Lt => pool.mk_lt(l, r),
            CmpOp::Le => pool.mk_le(l, r),
            CmpOp::Gt => pool.mk_gt(l, r),
            CmpOp::Ge => pool.mk_ge(l, r),
        }
    }

    fn cond_expr(&mut self, pool: &mut ExprPool, cond: &Cond) -> ExprId {
        match *cond {
            Cond::Var(v) => self.var_syms[&v],
            Cond::NotVar(v) => {
                let s = self.var_syms[&v];
                pool.mk_not(s)
            }
            Cond::Cmp { op, lhs, rhs } => self.cmp_expr(pool, op, lhs, rhs),
        }
    }

    fn stmt_constraint(&mut self, pool: &mut ExprPool, stmt: &Stmt) -> ExprId {
        match stmt {
            Stmt::BinOp { dst, op, lhs, rhs } => {
                let d = self.var_syms[dst];
                let l = self.operand_expr(pool, *lhs);
                let r = self.operand_expr(pool, *rhs);
                let rhs = match op {
                    BinOp::Add => pool.mk_add(l, r),
                    BinOp::Sub => pool.mk_sub(l, r),
                    BinOp::Mul => pool.mk_mul(l, r),
                    BinOp::Div => pool.mk_div(l, r),
                    BinOp::Rem => pool.mk_rem(l, r),
                };
                pool.mk_eq(d, rhs)
            }
            Stmt::Cast { dst, src } | Stmt::Assign { dst, src } => {
                let d = self.var_syms[dst];
                let s = self.operand_expr(pool, *src);
                pool.mk_eq(d, s)
            }
            Stmt::Select {
                dst,
                cond,
                on_true,
                on_false,
            } => {
                let d = self.var_syms[dst];
                let c = self.var_syms[cond];
                let t = self.operand_expr(pool, *on_true);
                let f = self.operand_expr(pool, *on_false);
                let ite = pool.mk_ite(c, t, f);
                pool.mk_eq(d, ite)
            }
            Stmt::BoolBin { dst, op, lhs, rhs } => {
                let d = self.var_syms[dst];
                let l = self.var_syms[lhs];
                let r = self.var_syms[rhs];
                let rhs = match op {
                    BoolOp::And => pool.mk_and(vec![l, r]),
                    BoolOp::Or => pool.mk_or(vec![l, r]),
                    BoolOp::Xor => pool.mk_xor(l, r),
                };
                pool.mk_eq(d, rhs)
            }
            Stmt::AssignCmp { dst, op, lhs, rhs } => {
                let d = self.var_syms[dst];
                let c = self.cmp_expr(pool, *op, *lhs, *rhs);
                pool.mk_eq(d, c)
            }
            Stmt::ArrRead { dst, arr, idx } => {
                let d = self.var_syms[dst];
                let a = self.var_syms[arr];
                let i = self.operand_expr(pool, *idx);
                let sel = pool.mk_select(a, i);
                pool.mk_eq(d, sel)
            }
            Stmt::ArrWrite {
                arr_out,
                arr_in,
                idx,
                val,
            } => {
                let d = self.var_syms[arr_out];
                let a = self.var_syms[arr_in];
                let i = self.operand_expr(pool, *idx);
                let v = self.operand_expr(pool, *val);
                let st = pool.mk_store(a, i, v);
                pool.mk_eq(d, st)
            }
            Stmt::ArrAssign { dst, src } => {
                let d = self.var_syms[dst];
                let s = self.var_syms[src];
                pool.mk_eq(d, s)
            }
            Stmt::Assume(cond) => self.cond_expr(pool, cond),
        }
    }
}

impl SymbolicExecutor for UnrollingExec {
    fn encode(&mut self, pool: &mut ExprPool) -> Vec<ExprId> {
        let prog = self.unrolled.program.clone();
        let topo = self.topo.clone();

        // One Boolean constant per reachable block copy, named by the
        // original block and the copy ordinal.
        let mut copies: HashMap<BlockId, usize> = HashMap::new();
        for &b in &topo {
            let origin = self.unrolled.origin[b];
            let n = copies.entry(origin).or_insert(0);
            let sym = pool.mk_bool_symbol(format!(
                "b!{}!{}",
                self.original.block_name(origin),
                *n
            ));
            *n += 1;
            self.block_syms.insert(b, sym);
        }

        for (v, info) in prog.vars.iter().enumerate() {
            let sort = match info.sort {
                VarSort::Bool => Sort::Bool,
                VarSort::Int => Sort::Int,
                VarSort::Array => Sort::Array,
            };
            self.var_syms.insert(v, pool.mk_symbol(info.name.clone(), sort));
        }

        // Cut-point stores: a new segment opens at the entry and at every
        // loop-header copy; bare block symbols bind to the copy of their
        // segment, first definition winning.
        for &b in &topo {
            if self.unrolled.sink[b] {
                continue;
            }
            if self.unrolled.cutpoint[b] {
                self.stores.push(SymStore::new());
            }
            let origin = self.unrolled.origin[b];
            let bare = self.block_symbol(pool, origin);
            let concrete = self.block_syms[&b];
            if let Some(store) = self.stores.last_mut() {
                store.define(bare, concrete);
            }
        }

        // Edge literals. Criticality is judged on the original CFG so that
        // the literals the AI checker rebuilds through the stores coincide
        // with the ones asserted here.
        for &u in &topo {
            for v in prog.succs(u) {
                let bu = self.block_syms[&u];
                let bv = self.block_syms[&v];
                let ou = self.unrolled.origin[u];
                let ov = self.unrolled.origin[v];
                let lit = if self.original.is_critical_edge(ou, ov) {
                    pool.mk_tuple_const(bu, bv)
                } else {
                    pool.mk_and(vec![bu, bv])
                };
                self.edge_lits.insert((u, v), lit);
            }
        }

        self.model_vars = self.block_syms.values().copied().collect();
        self.model_vars
            .extend(self.edge_lits.values().copied().filter(|&l| is_tuple(pool, l)));
        for (v, info) in prog.vars.iter().enumerate() {
            match info.sort {
                VarSort::Bool => self.model_vars.push(self.var_syms[&v]),
                VarSort::Int => self.theory_vars.push(self.var_syms[&v]),
                VarSort::Array => {}
            }
        }

        let mut side = Vec::new();

        // Control skeleton.
        side.push(self.block_syms[&prog.entry]);
        for &v in &topo {
            if v == prog.entry {
                continue;
            }
            let ins: Vec<ExprId> = prog
                .preds(v)
                .into_iter()
                .filter_map(|u| self.edge_lits.get(&(u, v)).copied())
                .collect();
            let rhs = pool.mk_or(ins);
            let bv = self.block_syms[&v];
            side.push(pool.mk_iff(bv, rhs));
        }

        // A tuple literal must imply both endpoints; conjunction literals
        // carry that by construction.
        let tuple_edges: Vec<((BlockId, BlockId), ExprId)> = self
            .edge_lits
            .iter()
            .filter(|(_, &l)| is_tuple(pool, l))
            .map(|(&e, &l)| (e, l))
            .collect();
        for ((u, v), lit) in tuple_edges {
            let bu = self.block_syms[&u];
            let bv = self.block_syms[&v];
            let both = pool.mk_and(vec![bu, bv]);
            side.push(pool.mk_implies(lit, both));
        }

        // Guards.
        for &u in &topo {
            if !matches!(prog.blocks[u].term, Terminator::Br { .. }) {
                continue;
            }
            for v in prog.succs(u) {
                if let Some(cond) = prog.blocks[u].term.edge_cond(v) {
                    let guard = self.cond_expr(pool, &cond);
                    let lit = self.edge_lits[&(u, v)];
                    side.push(pool.mk_implies(lit, guard));
                }
            }
        }

        // Phi copies, under the in-edge literal.
        for &v in &topo {
            for phi in &prog.blocks[v].phis {
                for &(u, op) in &phi.incoming {
                    let Some(&lit) = self.edge_lits.get(&(u, v)) else {
                        continue;
                    };
                    let dst = self.var_syms[&phi.dst];
                    let rhs = self.operand_expr(pool, op);
                    let eq = pool.mk_eq(dst, rhs);
                    side.push(pool.mk_implies(lit, eq));
                }
            }
        }

        // Data constraints, under the block literal.
        for &b in &topo {
            let bsym = self.block_syms[&b];
            for stmt in &prog.blocks[b].stmts {
                let c = self.stmt_constraint(pool, stmt);
                side.push(pool.mk_implies(bsym, c));
            }
        }

        // The property: some copy of the failure block executes.
        let errs: Vec<ExprId> = topo
            .iter()
            .filter(|&&b| {
                self.unrolled.origin[b] == self.original.error && !self.unrolled.sink[b]
            })
            .map(|b| self.block_syms[b])
            .collect();
        side.push(pool.mk_or(errs));

        side
    }

    fn block_symbol(&mut self, pool: &mut ExprPool, block: BlockId) -> ExprId {
        if let Some(&sym) = self.bare_syms.get(&block) {
            return sym;
        }
        let sym = pool.mk_bool_symbol(format!("b!{}", self.original.block_name(block)));
        self.bare_syms.insert(block, sym);
        sym
    }

    fn edge_literal(&mut self, pool: &mut ExprPool, src: BlockId, dst: BlockId) -> ExprId {
        let bs = self.block_symbol(pool, src);
        let bd = self.block_symbol(pool, dst);
        if self.original.is_critical_edge(src, dst) {
            pool.mk_tuple_const(bs, bd)
        } else {
            pool.mk_and(vec![bs, bd])
        }
    }

    fn model_implicant(&self, pool: &ExprPool, vc: &[ExprId], model: &Model) -> Implicant {
        let mut imp = Implicant::default();
        for &item in vc {
            match pool.node(item) {
                ExprNode::Implies(a, b) => {
                    if model.eval_bool(pool, *a) == Some(true) {
                        imp.path_formula.push(*a);
                        imp.active_map.entry(*a).or_insert(*a);
                        collect_implicant(pool, model, *b, *a, &mut imp);
                    }
                }
                ExprNode::Iff(l, r) => {
                    if model.eval_bool(pool, *l) == Some(true) {
                        imp.path_formula.push(*l);
                        imp.active_map.entry(*l).or_insert(*l);
                        collect_implicant(pool, model, *r, *l, &mut imp);
                    }
                }
                _ => {
                    if model.eval_bool(pool, item) == Some(true) {
                        collect_implicant(pool, model, item, item, &mut imp);
                    }
                }
            }
        }
        imp
    }

    fn stores(&self) -> &[SymStore] {
        &self.stores
    }

    fn model_vars(&self) -> &[ExprId] {
        &self.model_vars
    }

    fn theory_vars(&self) -> &[ExprId] {
        &self.theory_vars
    }

    fn trace_of_model(&self, pool: &ExprPool, model: &Model) -> BmcTrace {
        let prog = &self.unrolled.program;
        let mut blocks = Vec::new();
        let mut cur = prog.entry;
        if model.eval_bool(pool, self.block_syms[&cur]) != Some(true) {
            return BmcTrace::new(blocks);
        }
        loop {
            blocks.push(self.unrolled.origin[cur]);
            let mut next = None;
            for s in prog.succs(cur) {
                if self.unrolled.sink[s] {
                    continue;
                }
                let lit = self.edge_lits[&(cur, s)];
                if model.eval_bool(pool, lit) == Some(true)
                    && model.eval_bool(pool, self.block_syms[&s]) == Some(true)
                {
                    next = Some(s);
                    break;
                }
            }
            match next {
                Some(s) => cur = s,
                None => break,
            }
        }
        BmcTrace::new(blocks)
    }
}

/// Decompose a satisfied formula into the atoms that make it true under the
/// model, tagging each with its block/edge provenance.
fn collect_implicant(
    pool: &ExprPool,
    model: &Model,
    e: ExprId,
    provenance: ExprId,
    imp: &mut Implicant,
) {
    match pool.node(e) {
        ExprNode::True => {}
        ExprNode::And(xs) => {
            for &x in xs {
                collect_implicant(pool, model, x, provenance, imp);
            }
        }
        ExprNode::Or(xs) => {
            // A Boolean-evaluable true disjunct pins the choice; a pure
            // theory disjunction is kept whole.
            if let Some(&x) = xs
                .iter()
                .find(|&&x| model.eval_bool(pool, x) == Some(true))
            {
                collect_implicant(pool, model, x, provenance, imp);
            } else {
                imp.path_formula.push(e);
                imp.active_map.entry(e).or_insert(provenance);
            }
        }
        _ => {
            imp.path_formula.push(e);
            // Only the provenance of a theory atom regenerates it in a
            // future implicant; a Boolean literal regenerates itself.
            let tag = if petrel_expr::abstraction::is_bool_lit(pool, e) {
                e
            } else {
                provenance
            };
            imp.active_map.entry(e).or_insert(tag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petrel_smt::Value;

    /// entry -(c)-> then -> join, entry -(!c)-> join; the skip edge is
    /// critical.
    fn skip_program() -> Program {
        let mut p = Program::new();
        let c = p.add_var("c", VarSort::Bool);
        let entry = p.add_block("entry");
        let then = p.add_block("then");
        let join = p.add_block("join");
        p.entry = entry;
        p.error = join;
        p.blocks[entry].term = Terminator::Br {
            cond: Cond::Var(c),
            then_bb: then,
            else_bb: join,
        };
        p.blocks[then].term = Terminator::Jump(join);
        p
    }

    fn encoded(p: Program) -> (ExprPool, UnrollingExec, Vec<ExprId>) {
        let mut pool = ExprPool::new();
        let mut exec = UnrollingExec::new(p, 3).unwrap();
        let side = exec.encode(&mut pool);
        (pool, exec, side)
    }

    #[test]
    fn vc_opens_with_the_entry_literal_and_closes_with_the_property() {
        let (pool, exec, side) = encoded(skip_program());
        assert_eq!(side[0], exec.model_vars()[0]);
        // Last item asserts the failure block.
        let last = *side.last().unwrap();
        assert!(
            pool.is_bool_const(last) || matches!(pool.node(last), ExprNode::Or(_)),
            "{}",
            pool.display(last)
        );
    }

    #[test]
    fn critical_edges_get_tuple_literals_with_endpoint_implications() {
        let (pool, exec, side) = encoded(skip_program());
        let tuples: Vec<ExprId> = exec
            .edge_lits
            .values()
            .copied()
            .filter(|&l| is_tuple(&pool, l))
            .collect();
        assert_eq!(tuples.len(), 1, "only entry->join is critical");
        let tup = tuples[0];
        assert!(side.iter().any(|&item| {
            matches!(pool.node(item), ExprNode::Implies(a, _) if *a == tup)
        }));
    }

    #[test]
    fn loop_free_program_has_a_single_store() {
        let (_, exec, _) = encoded(skip_program());
        assert_eq!(exec.stores().len(), 1);
    }

    #[test]
    fn implicant_collects_guards_with_edge_provenance() {
        let (pool, exec, side) = encoded(skip_program());
        // Model: entry and join execute, the skip edge is taken, c false.
        let mut values = std::collections::HashMap::new();
        for (name, val) in [
            ("b!entry!0", true),
            ("b!then!0", false),
            ("b!join!0", true),
            ("c", false),
        ] {
            values.insert(name.to_string(), Value::Bool(val));
        }
        // The skip edge tuple.
        let tup = exec
            .edge_lits
            .values()
            .copied()
            .find(|&l| is_tuple(&pool, l))
            .unwrap();
        values.insert(pool.const_name(tup).unwrap(), Value::Bool(true));
        let model = Model { values };

        let imp = exec.model_implicant(&pool, &side, &model);
        // The taken skip edge pins the path, and the negated guard literal
        // rides along as a self-mapped Boolean literal.
        assert!(imp.path_formula.contains(&tup));
        assert_eq!(imp.active_map.get(&tup), Some(&tup));
        let c_sym = exec.var_syms[&0];
        let not_c = imp
            .path_formula
            .iter()
            .copied()
            .find(|&e| matches!(pool.node(e), ExprNode::Not(x) if *x == c_sym))
            .expect("negated guard should be in the path formula");
        assert_eq!(imp.active_map.get(&not_c), Some(&not_c));
    }

    #[test]
    fn trace_follows_the_true_edges() {
        let (pool, exec, _) = encoded(skip_program());
        let mut values = std::collections::HashMap::new();
        for (name, val) in [
            ("b!entry!0", true),
            ("b!then!0", true),
            ("b!join!0", true),
            ("c", true),
        ] {
            values.insert(name.to_string(), Value::Bool(val));
        }
        let tup = exec
            .edge_lits
            .values()
            .copied()
            .find(|&l| is_tuple(&pool, l))
            .unwrap();
        values.insert(pool.const_name(tup).unwrap(), Value::Bool(false));
        let model = Model { values };

        let trace = exec.trace_of_model(&pool, &model);
        assert_eq!(trace.blocks, vec![0, 1, 2]);
    }
}
