//! Abstract environment and forward transfer for the IR statement set.

use indexmap::IndexMap;

use petrel_ir::{BinOp, BoolOp, CmpOp, Cond, Operand, Stmt, VarId};

use crate::lattice::{AbsBool, Bound, Interval, Lattice};

/// Per-point abstract state: intervals for integer variables, a flat
/// Boolean domain for flags, and the comparison each flag reifies (so that
/// `b := x < y; assume b` narrows `x` and `y`). Absent variables are top.
#[derive(Debug, Clone, PartialEq)]
pub struct AbstractEnv {
    bottom: bool,
    ints: IndexMap<VarId, Interval>,
    bools: IndexMap<VarId, AbsBool>,
    reified: IndexMap<VarId, (CmpOp, Operand, Operand)>,
}

impl AbstractEnv {
    pub fn top() -> Self {
        Self {
            bottom: false,
            ints: IndexMap::new(),
            bools: IndexMap::new(),
            reified: IndexMap::new(),
        }
    }

    pub fn is_bottom(&self) -> bool {
        self.bottom
    }

    pub fn set_bottom(&mut self) {
        self.bottom = true;
        self.ints.clear();
        self.bools.clear();
        self.reified.clear();
    }

    pub fn int_of(&self, op: Operand) -> Interval {
        match op {
            Operand::Int(c) => Interval::singleton(c),
            Operand::Var(v) => self.ints.get(&v).copied().unwrap_or_else(Interval::top),
            Operand::Bool(_) => Interval::top(),
        }
    }

    pub fn bool_of(&self, op: Operand) -> AbsBool {
        match op {
            Operand::Bool(b) => AbsBool::known(b),
            Operand::Var(v) => self.bools.get(&v).copied().unwrap_or(AbsBool::Top),
            Operand::Int(_) => AbsBool::Top,
        }
    }

    pub fn int_var(&self, v: VarId) -> Interval {
        self.ints.get(&v).copied().unwrap_or_else(Interval::top)
    }

    pub fn bool_var(&self, v: VarId) -> AbsBool {
        self.bools.get(&v).copied().unwrap_or(AbsBool::Top)
    }

    fn forget(&mut self, dst: VarId) {
        self.ints.shift_remove(&dst);
        self.bools.shift_remove(&dst);
        self.reified.shift_remove(&dst);
        // Reified comparisons over the clobbered variable no longer hold.
        self.reified.retain(|_, (_, lhs, rhs)| {
            lhs.as_var() != Some(dst) && rhs.as_var() != Some(dst)
        });
    }

    fn assign_int(&mut self, dst: VarId, value: Interval) {
        if value.is_bottom() {
            self.set_bottom();
            return;
        }
        self.forget(dst);
        if value != Interval::top() {
            self.ints.insert(dst, value);
        }
    }

    fn assign_bool(&mut self, dst: VarId, value: AbsBool) {
        if value.is_bottom() {
            self.set_bottom();
            return;
        }
        self.forget(dst);
        if value != AbsBool::Top {
            self.bools.insert(dst, value);
        }
    }

    /// One statement forward. Arrays are not tracked.
    pub fn transfer(&mut self, stmt: &Stmt) {
        if self.bottom {
            return;
        }
        match stmt {
            Stmt::BinOp { dst, op, lhs, rhs } => {
                let l = self.int_of(*lhs);
                let r = self.int_of(*rhs);
                let value = match op {
                    BinOp::Add => l.add(&r),
                    BinOp::Sub => l.sub(&r),
                    BinOp::Mul => l.mul(&r),
                    BinOp::Div | BinOp::Rem => Interval::top(),
                };
                self.assign_int(*dst, value);
            }
            Stmt::Cast { dst, src } => {
                let value = self.int_of(*src);
                self.assign_int(*dst, value);
            }
            Stmt::Select {
                dst,
                cond,
                on_true,
                on_false,
            } => {
                let value = match self.bool_var(*cond) {
                    AbsBool::True => self.int_of(*on_true),
                    AbsBool::False => self.int_of(*on_false),
                    _ => self.int_of(*on_true).join(&self.int_of(*on_false)),
                };
                self.assign_int(*dst, value);
            }
            Stmt::BoolBin { dst, op, lhs, rhs } => {
                let l = self.bool_var(*lhs);
                let r = self.bool_var(*rhs);
                let value = match op {
                    BoolOp::And => l.and(r),
                    BoolOp::Or => l.or(r),
                    BoolOp::Xor => l.xor(r),
                };
                self.assign_bool(*dst, value);
            }
            Stmt::AssignCmp { dst, op, lhs, rhs } => {
                let value = self.eval_cmp(*op, *lhs, *rhs);
                self.assign_bool(*dst, value);
                if !self.bottom {
                    self.reified.insert(*dst, (*op, *lhs, *rhs));
                }
            }
            Stmt::Assign { dst, src } => match src {
                Operand::Int(c) => self.assign_int(*dst, Interval::singleton(*c)),
                Operand::Bool(b) => self.assign_bool(*dst, AbsBool::known(*b)),
                Operand::Var(s) => {
                    let iv = self.ints.get(s).copied();
                    let bv = self.bools.get(s).copied();
                    let rv = self.reified.get(s).copied();
                    self.forget(*dst);
                    if let Some(iv) = iv {
                        self.ints.insert(*dst, iv);
                    }
                    if let Some(bv) = bv {
                        self.bools.insert(*dst, bv);
                    }
                    if let Some(rv) = rv {
                        self.reified.insert(*dst, rv);
                    }
                }
            },
            Stmt::ArrRead { dst, .. } => {
                self.forget(*dst);
            }
            Stmt::ArrWrite { .. } | Stmt::ArrAssign { .. } => {}
            Stmt::Assume(cond) => self.refine(*cond),
        }
    }

    /// Constrain the state with `cond`.
    pub fn refine(&mut self, cond: Cond) {
        if self.bottom {
            return;
        }
        match cond {
            Cond::Var(v) => {
                let met = self.bool_var(v).meet(&AbsBool::True);
                if met.is_bottom() {
                    self.set_bottom();
                    return;
                }
                self.bools.insert(v, met);
                if let Some((op, lhs, rhs)) = self.reified.get(&v).copied() {
                    self.refine_cmp(op, lhs, rhs);
                }
            }
            Cond::NotVar(v) => {
                let met = self.bool_var(v).meet(&AbsBool::False);
                if met.is_bottom() {
                    self.set_bottom();
                    return;
                }
                self.bools.insert(v, met);
                if let Some((op, lhs, rhs)) = self.reified.get(&v).copied() {
                    self.refine_cmp(op.negated(), lhs, rhs);
                }
            }
            Cond::Cmp { op, lhs, rhs } => self.refine_cmp(op, lhs, rhs),
        }
    }

    fn refine_cmp(&mut self, op: CmpOp, lhs: Operand, rhs: Operand) {
        let li = self.int_of(lhs);
        let ri = self.int_of(rhs);
        let (Some((llo, lhi)), Some((rlo, rhi))) = (li.bounds(), ri.bounds()) else {
            self.set_bottom();
            return;
        };
        let (nl, nr) = match op {
            CmpOp::Lt => (
                li.meet(&Interval::below(rhi.pred())),
                ri.meet(&Interval::above(llo.succ())),
            ),
            CmpOp::Le => (li.meet(&Interval::below(rhi)), ri.meet(&Interval::above(llo))),
            CmpOp::Gt => (
                li.meet(&Interval::above(rlo.succ())),
                ri.meet(&Interval::below(lhi.pred())),
            ),
            CmpOp::Ge => (li.meet(&Interval::above(rlo)), ri.meet(&Interval::below(lhi))),
            CmpOp::Eq => {
                let m = li.meet(&ri);
                (m, m)
            }
            CmpOp::Ne => (shave(li, &ri), shave(ri, &li)),
        };
        if nl.is_bottom() || nr.is_bottom() {
            self.set_bottom();
            return;
        }
        if let Some(v) = lhs.as_var() {
            self.ints.insert(v, nl);
        }
        if let Some(v) = rhs.as_var() {
            self.ints.insert(v, nr);
        }
    }

    fn eval_cmp(&self, op: CmpOp, lhs: Operand, rhs: Operand) -> AbsBool {
        let li = self.int_of(lhs);
        let ri = self.int_of(rhs);
        let (Some((llo, lhi)), Some((rlo, rhi))) = (li.bounds(), ri.bounds()) else {
            return AbsBool::Bot;
        };
        match op {
            CmpOp::Lt => cmp_verdict(lhi < rlo, llo >= rhi),
            CmpOp::Le => cmp_verdict(lhi <= rlo, llo > rhi),
            CmpOp::Gt => cmp_verdict(llo > rhi, lhi <= rlo),
            CmpOp::Ge => cmp_verdict(llo >= rhi, lhi < rlo),
            CmpOp::Eq => match (li.as_singleton(), ri.as_singleton()) {
                (Some(a), Some(b)) => AbsBool::known(a == b),
                _ => {
                    if li.meet(&ri).is_bottom() {
                        AbsBool::False
                    } else {
                        AbsBool::Top
                    }
                }
            },
            CmpOp::Ne => self.eval_cmp(CmpOp::Eq, lhs, rhs).not(),
        }
    }

    pub fn join(&self, other: &Self) -> Self {
        if self.bottom {
            return other.clone();
        }
        if other.bottom {
            return self.clone();
        }
        let mut out = AbstractEnv::top();
        for (v, a) in &self.ints {
            if let Some(b) = other.ints.get(v) {
                let j = a.join(b);
                if j != Interval::top() {
                    out.ints.insert(*v, j);
                }
            }
        }
        for (v, a) in &self.bools {
            if let Some(b) = other.bools.get(v) {
                let j = a.join(b);
                if j != AbsBool::Top {
                    out.bools.insert(*v, j);
                }
            }
        }
        for (v, r) in &self.reified {
            if other.reified.get(v) == Some(r) {
                out.reified.insert(*v, *r);
            }
        }
        out
    }

    pub fn widen(&self, other: &Self) -> Self {
        if self.bottom {
            return other.clone();
        }
        if other.bottom {
            return self.clone();
        }
        let mut out = self.join(other);
        out.ints = self
            .ints
            .iter()
            .filter_map(|(v, a)| {
                let b = other.ints.get(v)?;
                let w = a.widen(b);
                (w != Interval::top()).then_some((*v, w))
            })
            .collect();
        out
    }

    pub fn leq(&self, other: &Self) -> bool {
        if self.bottom {
            return true;
        }
        if other.bottom {
            return false;
        }
        other.ints.iter().all(|(v, b)| self.int_var(*v).leq(b))
            && other.bools.iter().all(|(v, b)| self.bool_var(*v).leq(b))
            && other
                .reified
                .iter()
                .all(|(v, r)| self.reified.get(v) == Some(r))
    }

    /// Bounds of every constrained integer variable, for diagnostics.
    pub fn int_entries(&self) -> impl Iterator<Item = (VarId, Interval)> + '_ {
        self.ints.iter().map(|(v, i)| (*v, *i))
    }
}

fn cmp_verdict(definitely: bool, definitely_not: bool) -> AbsBool {
    if definitely {
        AbsBool::True
    } else if definitely_not {
        AbsBool::False
    } else {
        AbsBool::Top
    }
}

/// Remove `other` from the edges of `iv` when it is a singleton boundary.
fn shave(iv: Interval, other: &Interval) -> Interval {
    let Some(c) = other.as_singleton() else {
        return iv;
    };
    let Some((lo, hi)) = iv.bounds() else {
        return iv;
    };
    let lo = if lo == Bound::Finite(c) { lo.succ() } else { lo };
    let hi = if hi == Bound::Finite(c) { hi.pred() } else { hi };
    Interval::range(lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contradictory_assumes_reach_bottom() {
        let mut env = AbstractEnv::top();
        let x = 0;
        env.transfer(&Stmt::Assume(Cond::Cmp {
            op: CmpOp::Ge,
            lhs: Operand::Var(x),
            rhs: Operand::Int(0),
        }));
        assert!(!env.is_bottom());
        env.transfer(&Stmt::Assume(Cond::Cmp {
            op: CmpOp::Lt,
            lhs: Operand::Var(x),
            rhs: Operand::Int(0),
        }));
        assert!(env.is_bottom());
    }

    #[test]
    fn reified_guard_narrows_operands() {
        let mut env = AbstractEnv::top();
        let (x, b) = (0, 1);
        env.transfer(&Stmt::AssignCmp {
            dst: b,
            op: CmpOp::Lt,
            lhs: Operand::Var(x),
            rhs: Operand::Int(10),
        });
        env.transfer(&Stmt::Assume(Cond::Var(b)));
        assert_eq!(
            env.int_var(x),
            Interval::below(Bound::Finite(9))
        );

        // The negated polarity narrows the other way.
        let mut env2 = AbstractEnv::top();
        env2.transfer(&Stmt::AssignCmp {
            dst: b,
            op: CmpOp::Lt,
            lhs: Operand::Var(x),
            rhs: Operand::Int(10),
        });
        env2.transfer(&Stmt::Assume(Cond::NotVar(b)));
        assert_eq!(env2.int_var(x), Interval::above(Bound::Finite(10)));
    }

    #[test]
    fn arithmetic_flows_through_assignments() {
        let mut env = AbstractEnv::top();
        let (x, y) = (0, 1);
        env.transfer(&Stmt::Assume(Cond::Cmp {
            op: CmpOp::Ge,
            lhs: Operand::Var(x),
            rhs: Operand::Int(1),
        }));
        env.transfer(&Stmt::Assume(Cond::Cmp {
            op: CmpOp::Le,
            lhs: Operand::Var(x),
            rhs: Operand::Int(3),
        }));
        env.transfer(&Stmt::BinOp {
            dst: y,
            op: BinOp::Add,
            lhs: Operand::Var(x),
            rhs: Operand::Int(1),
        });
        assert_eq!(
            env.int_var(y),
            Interval::range(Bound::Finite(2), Bound::Finite(4))
        );
    }

    #[test]
    fn clobbering_a_variable_drops_its_reified_guards() {
        let mut env = AbstractEnv::top();
        let (x, b) = (0, 1);
        env.transfer(&Stmt::AssignCmp {
            dst: b,
            op: CmpOp::Lt,
            lhs: Operand::Var(x),
            rhs: Operand::Int(0),
        });
        env.transfer(&Stmt::Assign {
            dst: x,
            src: Operand::Int(5),
        });
        // b no longer constrains the new value of x.
        env.transfer(&Stmt::Assume(Cond::Var(b)));
        assert!(!env.is_bottom());
        assert_eq!(env.int_var(x), Interval::singleton(5));
    }

    #[test]
    fn join_keeps_common_information_only() {
        let mut a = AbstractEnv::top();
        let x = 0;
        a.refine(Cond::Cmp {
            op: CmpOp::Ge,
            lhs: Operand::Var(x),
            rhs: Operand::Int(0),
        });
        let mut b = AbstractEnv::top();
        b.refine(Cond::Cmp {
            op: CmpOp::Ge,
            lhs: Operand::Var(x),
            rhs: Operand::Int(5),
        });
        let j = a.join(&b);
        assert_eq!(j.int_var(x), Interval::above(Bound::Finite(0)));
        assert!(b.leq(&a));
        assert!(!a.leq(&b));
    }

    #[test]
    fn select_uses_the_known_branch() {
        let mut env = AbstractEnv::top();
        let (d, c) = (0, 1);
        env.assign_bool(c, AbsBool::True);
        env.transfer(&Stmt::Select {
            dst: d,
            cond: c,
            on_true: Operand::Int(1),
            on_false: Operand::Int(9),
        });
        assert_eq!(env.int_var(d), Interval::singleton(1));
    }
}
