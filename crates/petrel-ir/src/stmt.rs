use std::collections::HashMap;

use crate::cfg::{BlockId, VarId};

/// Right-hand-side value: an SSA variable or a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Var(VarId),
    Int(i64),
    Bool(bool),
}

impl Operand {
    pub fn renamed(self, map: &HashMap<VarId, VarId>) -> Operand {
        match self {
            Operand::Var(v) => Operand::Var(*map.get(&v).unwrap_or(&v)),
            other => other,
        }
    }

    pub fn as_var(self) -> Option<VarId> {
        match self {
            Operand::Var(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn negated(self) -> CmpOp {
        match self {
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
    /// Accepted by the IR, rejected by the Boolean abstraction.
    Xor,
}

/// A branch or assume condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Var(VarId),
    NotVar(VarId),
    Cmp { op: CmpOp, lhs: Operand, rhs: Operand },
}

impl Cond {
    /// The same condition, logically negated.
    pub fn negated(self) -> Cond {
        match self {
            Cond::Var(v) => Cond::NotVar(v),
            Cond::NotVar(v) => Cond::Var(v),
            Cond::Cmp { op, lhs, rhs } => Cond::Cmp {
                op: op.negated(),
                lhs,
                rhs,
            },
        }
    }

    pub fn renamed(self, map: &HashMap<VarId, VarId>) -> Cond {
        match self {
            Cond::Var(v) => Cond::Var(*map.get(&v).unwrap_or(&v)),
            Cond::NotVar(v) => Cond::NotVar(*map.get(&v).unwrap_or(&v)),
            Cond::Cmp { op, lhs, rhs } => Cond::Cmp {
                op,
                lhs: lhs.renamed(map),
                rhs: rhs.renamed(map),
            },
        }
    }

    pub fn vars(&self) -> Vec<VarId> {
        match self {
            Cond::Var(v) | Cond::NotVar(v) => vec![*v],
            Cond::Cmp { lhs, rhs, .. } => {
                let mut out = Vec::new();
                if let Some(v) = lhs.as_var() {
                    out.push(v);
                }
                if let Some(v) = rhs.as_var() {
                    out.push(v);
                }
                out
            }
        }
    }
}

/// Straight-line statements. The set mirrors what the abstract-interpretation
/// path checker knows how to classify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    BinOp {
        dst: VarId,
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
    },
    Cast {
        dst: VarId,
        src: Operand,
    },
    Select {
        dst: VarId,
        cond: VarId,
        on_true: Operand,
        on_false: Operand,
    },
    BoolBin {
        dst: VarId,
        op: BoolOp,
        lhs: VarId,
        rhs: VarId,
    },
    /// Reified comparison: `dst := lhs op rhs` with a Boolean destination.
    AssignCmp {
        dst: VarId,
        op: CmpOp,
        lhs: Operand,
        rhs: Operand,
    },
    /// Plain copy. Outside of phi lowering the path checker cannot classify
    /// these and falls back to the SMT checker.
    Assign {
        dst: VarId,
        src: Operand,
    },
    ArrRead {
        dst: VarId,
        arr: VarId,
        idx: Operand,
    },
    /// SSA array update: `arr_out := store(arr_in, idx, val)`.
    ArrWrite {
        arr_out: VarId,
        arr_in: VarId,
        idx: Operand,
        val: Operand,
    },
    ArrAssign {
        dst: VarId,
        src: VarId,
    },
    Assume(Cond),
}

impl Stmt {
    /// Destination variable, if the statement defines one.
    pub fn def(&self) -> Option<VarId> {
        match self {
            Stmt::BinOp { dst, .. }
            | Stmt::Cast { dst, .. }
            | Stmt::Select { dst, .. }
            | Stmt::BoolBin { dst, .. }
            | Stmt::AssignCmp { dst, .. }
            | Stmt::Assign { dst, .. }
            | Stmt::ArrRead { dst, .. }
            | Stmt::ArrAssign { dst, .. } => Some(*dst),
            Stmt::ArrWrite { arr_out, .. } => Some(*arr_out),
            Stmt::Assume(_) => None,
        }
    }

    /// Variables read by the statement.
    pub fn uses(&self) -> Vec<VarId> {
        let operand = |op: &Operand| op.as_var();
        match self {
            Stmt::BinOp { lhs, rhs, .. } | Stmt::AssignCmp { lhs, rhs, .. } => {
                [operand(lhs), operand(rhs)].into_iter().flatten().collect()
            }
            Stmt::Cast { src, .. } | Stmt::Assign { src, .. } => {
                operand(src).into_iter().collect()
            }
            Stmt::Select {
                cond,
                on_true,
                on_false,
                ..
            } => {
                let mut out = vec![*cond];
                out.extend(operand(on_true));
                out.extend(operand(on_false));
                out
            }
            Stmt::BoolBin { lhs, rhs, .. } => vec![*lhs, *rhs],
            Stmt::ArrRead { arr, idx, .. } => {
                let mut out = vec![*arr];
                out.extend(operand(idx));
                out
            }
            Stmt::ArrWrite {
                arr_in, idx, val, ..
            } => {
                let mut out = vec![*arr_in];
                out.extend(operand(idx));
                out.extend(operand(val));
                out
            }
            Stmt::ArrAssign { src, .. } => vec![*src],
            Stmt::Assume(c) => c.vars(),
        }
    }

    /// Rename both definitions and uses through `map`; variables outside the
    /// map are untouched.
    pub fn renamed(&self, map: &HashMap<VarId, VarId>) -> Stmt {
        let m = |v: &VarId| *map.get(v).unwrap_or(v);
        match self {
            Stmt::BinOp { dst, op, lhs, rhs } => Stmt::BinOp {
                dst: m(dst),
                op: *op,
                lhs: lhs.renamed(map),
                rhs: rhs.renamed(map),
            },
            Stmt::Cast { dst, src } => Stmt::Cast {
                dst: m(dst),
                src: src.renamed(map),
            },
            Stmt::Select {
                dst,
                cond,
                on_true,
                on_false,
            } => Stmt::Select {
                dst: m(dst),
                cond: m(cond),
                on_true: on_true.renamed(map),
                on_false: on_false.renamed(map),
            },
            Stmt::BoolBin { dst, op, lhs, rhs } => Stmt::BoolBin {
                dst: m(dst),
                op: *op,
                lhs: m(lhs),
                rhs: m(rhs),
            },
            Stmt::AssignCmp { dst, op, lhs, rhs } => Stmt::AssignCmp {
                dst: m(dst),
                op: *op,
                lhs: lhs.renamed(map),
                rhs: rhs.renamed(map),
            },
            Stmt::Assign { dst, src } => Stmt::Assign {
                dst: m(dst),
                src: src.renamed(map),
            },
            Stmt::ArrRead { dst, arr, idx } => Stmt::ArrRead {
                dst: m(dst),
                arr: m(arr),
                idx: idx.renamed(map),
            },
            Stmt::ArrWrite {
                arr_out,
                arr_in,
                idx,
                val,
            } => Stmt::ArrWrite {
                arr_out: m(arr_out),
                arr_in: m(arr_in),
                idx: idx.renamed(map),
                val: val.renamed(map),
            },
            Stmt::ArrAssign { dst, src } => Stmt::ArrAssign {
                dst: m(dst),
                src: m(src),
            },
            Stmt::Assume(c) => Stmt::Assume(c.renamed(map)),
        }
    }
}

/// Phi node at a block head: `dst := phi (pred -> value)...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phi {
    pub dst: VarId,
    pub incoming: Vec<(BlockId, Operand)>,
}

/// Block terminator. `Br` guards both outgoing edges with `cond` and its
/// negation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Jump(BlockId),
    Br {
        cond: Cond,
        then_bb: BlockId,
        else_bb: BlockId,
    },
    Halt,
}

impl Terminator {
    pub fn targets(&self) -> Vec<BlockId> {
        match self {
            Terminator::Jump(b) => vec![*b],
            Terminator::Br {
                then_bb, else_bb, ..
            } => vec![*then_bb, *else_bb],
            Terminator::Halt => Vec::new(),
        }
    }

    /// Guard of the edge to `target`, if the terminator is conditional.
    pub fn edge_cond(&self, target: BlockId) -> Option<Cond> {
        match self {
            Terminator::Br {
                cond,
                then_bb,
                else_bb,
            } => {
                if *then_bb == target {
                    Some(*cond)
                } else if *else_bb == target {
                    Some(cond.negated())
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn retarget(&mut self, from: BlockId, to: BlockId) {
        match self {
            Terminator::Jump(b) => {
                if *b == from {
                    *b = to;
                }
            }
            Terminator::Br {
                then_bb, else_bb, ..
            } => {
                if *then_bb == from {
                    *then_bb = to;
                }
                if *else_bb == from {
                    *else_bb = to;
                }
            }
            Terminator::Halt => {}
        }
    }
}
