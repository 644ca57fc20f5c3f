//! Whole-program interval invariants.
//!
//! Chaotic iteration over the CFG with widening once a block has been
//! revisited enough times. The computed map gives, per block, the abstract
//! state on entry (after phi binding); the engine logs it and keeps it as a
//! hook for future blocking-clause strengthening.

use indexmap::IndexMap;

use petrel_ir::{BlockId, Program};

use crate::env::AbstractEnv;

#[derive(Debug, Clone)]
pub struct FixpointConfig {
    /// Hard cap on worklist iterations.
    pub max_iterations: usize,
    /// Joins tolerated per block before widening kicks in.
    pub widen_delay: usize,
}

impl Default for FixpointConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            widen_delay: 3,
        }
    }
}

/// Forward fixpoint with the default configuration.
pub fn analyze(program: &Program) -> IndexMap<BlockId, AbstractEnv> {
    analyze_with(program, &FixpointConfig::default())
}

pub fn analyze_with(
    program: &Program,
    config: &FixpointConfig,
) -> IndexMap<BlockId, AbstractEnv> {
    let mut states: IndexMap<BlockId, AbstractEnv> = IndexMap::new();
    let mut visits = vec![0usize; program.blocks.len()];

    states.insert(program.entry, AbstractEnv::top());
    let mut worklist = vec![program.entry];
    let mut iterations = 0;

    while let Some(b) = worklist.pop() {
        iterations += 1;
        if iterations > config.max_iterations {
            break;
        }
        let Some(in_state) = states.get(&b).cloned() else {
            continue;
        };

        // Post-state of the block body.
        let mut out = in_state;
        for stmt in &program.blocks[b].stmts {
            out.transfer(stmt);
        }
        if out.is_bottom() {
            continue;
        }

        for s in program.succs(b) {
            // Per-edge state: guard refinement, then phi binding.
            let mut edge = out.clone();
            if let Some(cond) = program.blocks[b].term.edge_cond(s) {
                edge.refine(cond);
            }
            if edge.is_bottom() {
                continue;
            }
            for phi in &program.blocks[s].phis {
                if let Some((_, op)) = phi.incoming.iter().find(|(pb, _)| *pb == b) {
                    edge.transfer(&petrel_ir::Stmt::Assign {
                        dst: phi.dst,
                        src: *op,
                    });
                }
            }

            let merged = match states.get(&s) {
                None => edge,
                Some(old) => {
                    if edge.leq(old) {
                        continue;
                    }
                    visits[s] += 1;
                    if visits[s] > config.widen_delay {
                        old.widen(&edge)
                    } else {
                        old.join(&edge)
                    }
                }
            };
            states.insert(s, merged);
            if !worklist.contains(&s) {
                worklist.push(s);
            }
        }
    }

    states
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{Bound, Interval};
    use petrel_ir::{BinOp, CmpOp, Cond, Operand, Phi, Stmt, Terminator, VarSort};

    #[test]
    fn straight_line_constraints_propagate() {
        let mut p = Program::new();
        let x = p.add_var("x", VarSort::Int);
        let a = p.add_block("a");
        let b = p.add_block("b");
        p.entry = a;
        p.blocks[a].stmts.push(Stmt::Assume(Cond::Cmp {
            op: CmpOp::Ge,
            lhs: Operand::Var(x),
            rhs: Operand::Int(0),
        }));
        p.blocks[a].term = Terminator::Jump(b);

        let inv = analyze(&p);
        let at_b = &inv[&b];
        assert_eq!(at_b.int_var(x), Interval::above(Bound::Finite(0)));
    }

    #[test]
    fn counting_loop_converges_with_widening() {
        // i starts at 0 and increments while i < 10; the exit block must see
        // a lower bound of 0 and, thanks to the exit guard, i >= 10.
        let mut p = Program::new();
        let i1 = p.add_var("i1", VarSort::Int);
        let i2 = p.add_var("i2", VarSort::Int);
        let entry = p.add_block("entry");
        let head = p.add_block("head");
        let body = p.add_block("body");
        let exit = p.add_block("exit");
        p.entry = entry;
        p.blocks[entry].term = Terminator::Jump(head);
        p.blocks[head].phis.push(Phi {
            dst: i1,
            incoming: vec![(entry, Operand::Int(0)), (body, Operand::Var(i2))],
        });
        p.blocks[head].term = Terminator::Br {
            cond: Cond::Cmp {
                op: CmpOp::Lt,
                lhs: Operand::Var(i1),
                rhs: Operand::Int(10),
            },
            then_bb: body,
            else_bb: exit,
        };
        p.blocks[body].stmts.push(Stmt::BinOp {
            dst: i2,
            op: BinOp::Add,
            lhs: Operand::Var(i1),
            rhs: Operand::Int(1),
        });
        p.blocks[body].term = Terminator::Jump(head);

        let inv = analyze(&p);

        let at_exit = &inv[&exit];
        let (lo, _) = at_exit.int_var(i1).bounds().unwrap();
        assert!(lo >= Bound::Finite(10), "exit guard must refine i1: {lo:?}");

        let at_body = &inv[&body];
        let (blo, bhi) = at_body.int_var(i1).bounds().unwrap();
        assert_eq!(blo, Bound::Finite(0));
        assert!(bhi <= Bound::Finite(9));
    }

    #[test]
    fn unreachable_branch_gets_no_state() {
        let mut p = Program::new();
        let x = p.add_var("x", VarSort::Int);
        let entry = p.add_block("entry");
        let dead = p.add_block("dead");
        let live = p.add_block("live");
        p.entry = entry;
        p.blocks[entry].stmts.push(Stmt::Assign {
            dst: x,
            src: Operand::Int(1),
        });
        p.blocks[entry].term = Terminator::Br {
            cond: Cond::Cmp {
                op: CmpOp::Lt,
                lhs: Operand::Var(x),
                rhs: Operand::Int(0),
            },
            then_bb: dead,
            else_bb: live,
        };

        let inv = analyze(&p);
        assert!(!inv.contains_key(&dead));
        assert!(inv.contains_key(&live));
    }
}
