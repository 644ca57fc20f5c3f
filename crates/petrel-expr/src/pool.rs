use std::collections::HashMap;
use std::fmt;

/// Sort of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sort {
    Bool,
    Int,
    BitVec(u32),
    /// Int-indexed, int-valued arrays.
    Array,
}

/// A handle into an [`ExprPool`].
///
/// Ids are dense and stable for the lifetime of the pool; structurally equal
/// expressions always receive the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One node of the expression DAG.
///
/// `TupleConst` is the distinguished Boolean constant used for critical CFG
/// edges: its two operands are part of the constant's *name*, not children in
/// the operational sense, which is why [`ExprPool::substitute`] does not
/// descend into it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprNode {
    True,
    False,
    IntLit(i64),
    BvLit { value: u64, width: u32 },
    Symbol { name: String, sort: Sort },
    TupleConst { src: ExprId, dst: ExprId },

    Not(ExprId),
    And(Vec<ExprId>),
    Or(Vec<ExprId>),
    Xor(ExprId, ExprId),
    Implies(ExprId, ExprId),
    Iff(ExprId, ExprId),
    Ite(ExprId, ExprId, ExprId),
    Eq(ExprId, ExprId),

    Lt(ExprId, ExprId),
    Le(ExprId, ExprId),
    Gt(ExprId, ExprId),
    Ge(ExprId, ExprId),

    Add(ExprId, ExprId),
    Sub(ExprId, ExprId),
    Mul(ExprId, ExprId),
    Div(ExprId, ExprId),
    Rem(ExprId, ExprId),
    Neg(ExprId),

    BvAdd(ExprId, ExprId),
    BvSub(ExprId, ExprId),
    BvMul(ExprId, ExprId),
    BvUlt(ExprId, ExprId),
    BvUle(ExprId, ExprId),

    Select(ExprId, ExprId),
    Store(ExprId, ExprId, ExprId),
}

/// Arena of hash-consed expressions.
#[derive(Debug, Default)]
pub struct ExprPool {
    nodes: Vec<ExprNode>,
    index: HashMap<ExprNode, ExprId>,
}

impl ExprPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Intern a node, returning the id of the structurally equal existing
    /// node if there is one.
    pub fn intern(&mut self, node: ExprNode) -> ExprId {
        if let Some(&id) = self.index.get(&node) {
            return id;
        }
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(node.clone());
        self.index.insert(node, id);
        id
    }

    pub fn node(&self, id: ExprId) -> &ExprNode {
        &self.nodes[id.index()]
    }

    // --- leaf builders ---

    pub fn mk_true(&mut self) -> ExprId {
        self.intern(ExprNode::True)
    }

    pub fn mk_false(&mut self) -> ExprId {
        self.intern(ExprNode::False)
    }

    pub fn mk_int(&mut self, value: i64) -> ExprId {
        self.intern(ExprNode::IntLit(value))
    }

    pub fn mk_bv(&mut self, value: u64, width: u32) -> ExprId {
        self.intern(ExprNode::BvLit { value, width })
    }

    pub fn mk_symbol(&mut self, name: impl Into<String>, sort: Sort) -> ExprId {
        self.intern(ExprNode::Symbol {
            name: name.into(),
            sort,
        })
    }

    pub fn mk_bool_symbol(&mut self, name: impl Into<String>) -> ExprId {
        self.mk_symbol(name, Sort::Bool)
    }

    pub fn mk_tuple_const(&mut self, src: ExprId, dst: ExprId) -> ExprId {
        self.intern(ExprNode::TupleConst { src, dst })
    }

    // --- Boolean builders ---

    pub fn mk_not(&mut self, e: ExprId) -> ExprId {
        self.intern(ExprNode::Not(e))
    }

    /// N-ary conjunction. Empty input is `true`, a singleton is returned
    /// as-is.
    pub fn mk_and(&mut self, mut es: Vec<ExprId>) -> ExprId {
        match es.len() {
            0 => self.mk_true(),
            1 => es.pop().unwrap(),
            _ => self.intern(ExprNode::And(es)),
        }
    }

    pub fn mk_or(&mut self, mut es: Vec<ExprId>) -> ExprId {
        match es.len() {
            0 => self.mk_false(),
            1 => es.pop().unwrap(),
            _ => self.intern(ExprNode::Or(es)),
        }
    }

    pub fn mk_xor(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.intern(ExprNode::Xor(a, b))
    }

    pub fn mk_implies(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.intern(ExprNode::Implies(a, b))
    }

    pub fn mk_iff(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.intern(ExprNode::Iff(a, b))
    }

    pub fn mk_ite(&mut self, c: ExprId, t: ExprId, e: ExprId) -> ExprId {
        self.intern(ExprNode::Ite(c, t, e))
    }

    pub fn mk_eq(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.intern(ExprNode::Eq(a, b))
    }

    // --- arithmetic and comparisons ---

    pub fn mk_lt(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.intern(ExprNode::Lt(a, b))
    }

    pub fn mk_le(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.intern(ExprNode::Le(a, b))
    }

    pub fn mk_gt(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.intern(ExprNode::Gt(a, b))
    }

    pub fn mk_ge(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.intern(ExprNode::Ge(a, b))
    }

    pub fn mk_add(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.intern(ExprNode::Add(a, b))
    }

    pub fn mk_sub(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.intern(ExprNode::Sub(a, b))
    }

    pub fn mk_mul(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.intern(ExprNode::Mul(a, b))
    }

    pub fn mk_div(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.intern(ExprNode::Div(a, b))
    }

    pub fn mk_rem(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.intern(ExprNode::Rem(a, b))
    }

    pub fn mk_neg(&mut self, e: ExprId) -> ExprId {
        self.intern(ExprNode::Neg(e))
    }

    pub fn mk_select(&mut self, arr: ExprId, idx: ExprId) -> ExprId {
        self.intern(ExprNode::Select(arr, idx))
    }

    pub fn mk_store(&mut self, arr: ExprId, idx: ExprId, val: ExprId) -> ExprId {
        self.intern(ExprNode::Store(arr, idx, val))
    }

    // --- queries ---

    /// Sort of an expression. Mixed-sort `Ite`/`Eq` report the sort of their
    /// first relevant operand; well-sortedness is the builder's business.
    pub fn sort_of(&self, id: ExprId) -> Sort {
        use ExprNode::*;
        match self.node(id) {
            True | False | TupleConst { .. } => Sort::Bool,
            Not(_) | And(_) | Or(_) | Xor(..) | Implies(..) | Iff(..) => Sort::Bool,
            Eq(..) | Lt(..) | Le(..) | Gt(..) | Ge(..) | BvUlt(..) | BvUle(..) => Sort::Bool,
            IntLit(_) => Sort::Int,
            Add(..) | Sub(..) | Mul(..) | Div(..) | Rem(..) | Neg(_) => Sort::Int,
            BvLit { width, .. } => Sort::BitVec(*width),
            BvAdd(a, _) | BvSub(a, _) | BvMul(a, _) => self.sort_of(*a),
            Symbol { sort, .. } => *sort,
            Ite(_, t, _) => self.sort_of(*t),
            Select(..) => Sort::Int,
            Store(..) => Sort::Array,
        }
    }

    /// A Boolean constant: a Boolean-sorted symbol or a tuple constant.
    pub fn is_bool_const(&self, id: ExprId) -> bool {
        matches!(
            self.node(id),
            ExprNode::Symbol {
                sort: Sort::Bool,
                ..
            } | ExprNode::TupleConst { .. }
        )
    }

    /// Name of a constant, for model lookups. Tuple constants have a
    /// structural name derived from their operands.
    pub fn const_name(&self, id: ExprId) -> Option<String> {
        match self.node(id) {
            ExprNode::Symbol { name, .. } => Some(name.clone()),
            ExprNode::TupleConst { src, dst } => {
                let s = self.const_name(*src)?;
                let d = self.const_name(*dst)?;
                Some(format!("tup!{s}!{d}"))
            }
            _ => None,
        }
    }

    /// Operational children of a node. `TupleConst` is a leaf here: its
    /// operands are part of the constant's name.
    pub fn children(&self, id: ExprId) -> Vec<ExprId> {
        use ExprNode::*;
        match self.node(id) {
            True | False | IntLit(_) | BvLit { .. } | Symbol { .. } | TupleConst { .. } => {
                Vec::new()
            }
            Not(x) | Neg(x) => vec![*x],
            And(xs) | Or(xs) => xs.clone(),
            Xor(a, b) | Implies(a, b) | Iff(a, b) | Eq(a, b) | Lt(a, b) | Le(a, b) | Gt(a, b)
            | Ge(a, b) | Add(a, b) | Sub(a, b) | Mul(a, b) | Div(a, b) | Rem(a, b)
            | BvAdd(a, b) | BvSub(a, b) | BvMul(a, b) | BvUlt(a, b) | BvUle(a, b)
            | Select(a, b) => vec![*a, *b],
            Ite(a, b, c) | Store(a, b, c) => vec![*a, *b, *c],
        }
    }

    /// Memoized structural substitution.
    ///
    /// `lookup` is consulted on every node before recursion. `TupleConst` is
    /// treated as a leaf: its operands name the constant, so a store rebinds
    /// tuples explicitly rather than through substitution.
    pub fn substitute<F>(&mut self, lookup: &F, e: ExprId) -> ExprId
    where
        F: Fn(ExprId) -> Option<ExprId>,
    {
        let mut memo = HashMap::new();
        self.substitute_rec(lookup, e, &mut memo)
    }

    fn substitute_rec<F>(
        &mut self,
        lookup: &F,
        e: ExprId,
        memo: &mut HashMap<ExprId, ExprId>,
    ) -> ExprId
    where
        F: Fn(ExprId) -> Option<ExprId>,
    {
        if let Some(&cached) = memo.get(&e) {
            return cached;
        }
        if let Some(mapped) = lookup(e) {
            memo.insert(e, mapped);
            return mapped;
        }
        use ExprNode::*;
        let out = match self.node(e).clone() {
            True | False | IntLit(_) | BvLit { .. } | Symbol { .. } | TupleConst { .. } => e,
            Not(x) => {
                let x = self.substitute_rec(lookup, x, memo);
                self.mk_not(x)
            }
            And(xs) => {
                let xs = xs
                    .into_iter()
                    .map(|x| self.substitute_rec(lookup, x, memo))
                    .collect();
                self.intern(And(xs))
            }
            Or(xs) => {
                let xs = xs
                    .into_iter()
                    .map(|x| self.substitute_rec(lookup, x, memo))
                    .collect();
                self.intern(Or(xs))
            }
            Xor(a, b) => self.subst2(lookup, memo, a, b, Xor),
            Implies(a, b) => self.subst2(lookup, memo, a, b, Implies),
            Iff(a, b) => self.subst2(lookup, memo, a, b, Iff),
            Eq(a, b) => self.subst2(lookup, memo, a, b, Eq),
            Lt(a, b) => self.subst2(lookup, memo, a, b, Lt),
            Le(a, b) => self.subst2(lookup, memo, a, b, Le),
            Gt(a, b) => self.subst2(lookup, memo, a, b, Gt),
            Ge(a, b) => self.subst2(lookup, memo, a, b, Ge),
            Add(a, b) => self.subst2(lookup, memo, a, b, Add),
            Sub(a, b) => self.subst2(lookup, memo, a, b, Sub),
            Mul(a, b) => self.subst2(lookup, memo, a, b, Mul),
            Div(a, b) => self.subst2(lookup, memo, a, b, Div),
            Rem(a, b) => self.subst2(lookup, memo, a, b, Rem),
            BvAdd(a, b) => self.subst2(lookup, memo, a, b, BvAdd),
            BvSub(a, b) => self.subst2(lookup, memo, a, b, BvSub),
            BvMul(a, b) => self.subst2(lookup, memo, a, b, BvMul),
            BvUlt(a, b) => self.subst2(lookup, memo, a, b, BvUlt),
            BvUle(a, b) => self.subst2(lookup, memo, a, b, BvUle),
            Select(a, b) => self.subst2(lookup, memo, a, b, Select),
            Neg(x) => {
                let x = self.substitute_rec(lookup, x, memo);
                self.mk_neg(x)
            }
            Ite(c, t, f) => {
                let c = self.substitute_rec(lookup, c, memo);
                let t = self.substitute_rec(lookup, t, memo);
                let f = self.substitute_rec(lookup, f, memo);
                self.mk_ite(c, t, f)
            }
            Store(a, i, v) => {
                let a = self.substitute_rec(lookup, a, memo);
                let i = self.substitute_rec(lookup, i, memo);
                let v = self.substitute_rec(lookup, v, memo);
                self.mk_store(a, i, v)
            }
        };
        memo.insert(e, out);
        out
    }

    fn subst2<F>(
        &mut self,
        lookup: &F,
        memo: &mut HashMap<ExprId, ExprId>,
        a: ExprId,
        b: ExprId,
        mk: fn(ExprId, ExprId) -> ExprNode,
    ) -> ExprId
    where
        F: Fn(ExprId) -> Option<ExprId>,
    {
        let a = self.substitute_rec(lookup, a, memo);
        let b = self.substitute_rec(lookup, b, memo);
        self.intern(mk(a, b))
    }

    /// Printable view of an expression, for diagnostics.
    pub fn display(&self, id: ExprId) -> DisplayExpr<'_> {
        DisplayExpr { pool: self, id }
    }
}

/// S-expression rendering of a pool entry.
pub struct DisplayExpr<'a> {
    pool: &'a ExprPool,
    id: ExprId,
}

impl fmt::Display for DisplayExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(self.pool, self.id, f)
    }
}

fn write_nary(
    pool: &ExprPool,
    op: &str,
    args: &[ExprId],
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    write!(f, "({op}")?;
    for a in args {
        write!(f, " ")?;
        write_expr(pool, *a, f)?;
    }
    write!(f, ")")
}

fn write_expr(pool: &ExprPool, id: ExprId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    use ExprNode::*;
    match pool.node(id) {
        True => write!(f, "true"),
        False => write!(f, "false"),
        IntLit(v) => write!(f, "{v}"),
        BvLit { value, width } => write!(f, "#b{value}:{width}"),
        Symbol { name, .. } => write!(f, "{name}"),
        TupleConst { src, dst } => write_nary(pool, "tuple", &[*src, *dst], f),
        Not(x) => write_nary(pool, "not", &[*x], f),
        And(xs) => write_nary(pool, "and", xs, f),
        Or(xs) => write_nary(pool, "or", xs, f),
        Xor(a, b) => write_nary(pool, "xor", &[*a, *b], f),
        Implies(a, b) => write_nary(pool, "=>", &[*a, *b], f),
        Iff(a, b) => write_nary(pool, "<=>", &[*a, *b], f),
        Ite(c, t, e) => write_nary(pool, "ite", &[*c, *t, *e], f),
        Eq(a, b) => write_nary(pool, "=", &[*a, *b], f),
        Lt(a, b) => write_nary(pool, "<", &[*a, *b], f),
        Le(a, b) => write_nary(pool, "<=", &[*a, *b], f),
        Gt(a, b) => write_nary(pool, ">", &[*a, *b], f),
        Ge(a, b) => write_nary(pool, ">=", &[*a, *b], f),
        Add(a, b) => write_nary(pool, "+", &[*a, *b], f),
        Sub(a, b) => write_nary(pool, "-", &[*a, *b], f),
        Mul(a, b) => write_nary(pool, "*", &[*a, *b], f),
        Div(a, b) => write_nary(pool, "div", &[*a, *b], f),
        Rem(a, b) => write_nary(pool, "mod", &[*a, *b], f),
        Neg(x) => write_nary(pool, "-", &[*x], f),
        BvAdd(a, b) => write_nary(pool, "bvadd", &[*a, *b], f),
        BvSub(a, b) => write_nary(pool, "bvsub", &[*a, *b], f),
        BvMul(a, b) => write_nary(pool, "bvmul", &[*a, *b], f),
        BvUlt(a, b) => write_nary(pool, "bvult", &[*a, *b], f),
        BvUle(a, b) => write_nary(pool, "bvule", &[*a, *b], f),
        Select(a, i) => write_nary(pool, "select", &[*a, *i], f),
        Store(a, i, v) => write_nary(pool, "store", &[*a, *i, *v], f),
    }
}
