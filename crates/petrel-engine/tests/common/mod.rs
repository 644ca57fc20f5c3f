#![allow(dead_code)]

//! Scenario programs shared by the engine test suites.

use petrel_ir::{BinOp, CmpOp, Cond, Operand, Phi, Program, Stmt, Terminator, VarSort};

/// Both assert branches are guarded by the same reified comparison, so the
/// initial Boolean abstraction alone refutes every path to the failure
/// block: `if (x > 0) assert(x > 0); else assert(x <= 0);`.
pub fn shared_guard_program() -> Program {
    let mut p = Program::new();
    let x = p.add_var("x", VarSort::Int);
    let c = p.add_var("c", VarSort::Bool);

    let entry = p.add_block("entry");
    let then = p.add_block("then");
    let els = p.add_block("else");
    let exit = p.add_block("exit");
    let err = p.add_block("err");
    p.entry = entry;
    p.error = err;

    p.blocks[entry].stmts.push(Stmt::AssignCmp {
        dst: c,
        op: CmpOp::Gt,
        lhs: Operand::Var(x),
        rhs: Operand::Int(0),
    });
    p.blocks[entry].term = Terminator::Br {
        cond: Cond::Var(c),
        then_bb: then,
        else_bb: els,
    };
    // assert(x > 0): fail when the guard is false.
    p.blocks[then].term = Terminator::Br {
        cond: Cond::Var(c),
        then_bb: exit,
        else_bb: err,
    };
    // assert(x <= 0): fail when the guard is true.
    p.blocks[els].term = Terminator::Br {
        cond: Cond::Var(c),
        then_bb: err,
        else_bb: exit,
    };
    p
}

/// Triangle with a critical skip edge and `assert(false)` at the join:
/// every path into `join` falls through to the failure block.
pub fn assert_false_diamond() -> Program {
    let mut p = Program::new();
    let c = p.add_var("c", VarSort::Bool);

    let entry = p.add_block("entry");
    let then = p.add_block("then");
    let join = p.add_block("join");
    let err = p.add_block("err");
    p.entry = entry;
    p.error = err;

    p.blocks[entry].term = Terminator::Br {
        cond: Cond::Var(c),
        then_bb: then,
        else_bb: join,
    };
    p.blocks[then].term = Terminator::Jump(join);
    p.blocks[join].term = Terminator::Jump(err);
    p
}

/// A single path whose assumes contradict over intervals: `x >= 0` then
/// `x < 0`.
pub fn interval_contradiction_program() -> Program {
    let mut p = Program::new();
    let x = p.add_var("x", VarSort::Int);

    let entry = p.add_block("entry");
    let err = p.add_block("err");
    p.entry = entry;
    p.error = err;

    p.blocks[entry].stmts.push(Stmt::Assume(Cond::Cmp {
        op: CmpOp::Ge,
        lhs: Operand::Var(x),
        rhs: Operand::Int(0),
    }));
    p.blocks[entry].stmts.push(Stmt::Assume(Cond::Cmp {
        op: CmpOp::Lt,
        lhs: Operand::Var(x),
        rhs: Operand::Int(0),
    }));
    p.blocks[entry].term = Terminator::Jump(err);
    p
}

/// `i = 0; while (i < 10) i++; assert(i <= 10);` in loop-closed SSA form.
pub fn counting_loop_program() -> Program {
    let mut p = Program::new();
    let i1 = p.add_var("i1", VarSort::Int);
    let i2 = p.add_var("i2", VarSort::Int);
    let ix = p.add_var("ix", VarSort::Int);
    let c = p.add_var("c", VarSort::Bool);
    let a = p.add_var("a", VarSort::Bool);

    let entry = p.add_block("entry");
    let head = p.add_block("head");
    let body = p.add_block("body");
    let exit = p.add_block("exit");
    let end = p.add_block("end");
    let err = p.add_block("err");
    p.entry = entry;
    p.error = err;

    p.blocks[entry].term = Terminator::Jump(head);

    p.blocks[head].phis.push(Phi {
        dst: i1,
        incoming: vec![(entry, Operand::Int(0)), (body, Operand::Var(i2))],
    });
    p.blocks[head].stmts.push(Stmt::AssignCmp {
        dst: c,
        op: CmpOp::Lt,
        lhs: Operand::Var(i1),
        rhs: Operand::Int(10),
    });
    p.blocks[head].term = Terminator::Br {
        cond: Cond::Var(c),
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

    p.blocks[exit].phis.push(Phi {
        dst: ix,
        incoming: vec![(head, Operand::Var(i1))],
    });
    p.blocks[exit].stmts.push(Stmt::AssignCmp {
        dst: a,
        op: CmpOp::Le,
        lhs: Operand::Var(ix),
        rhs: Operand::Int(10),
    });
    p.blocks[exit].term = Terminator::Br {
        cond: Cond::Var(a),
        then_bb: end,
        else_bb: err,
    };
    p
}

/// `assert(x * x >= 0)` over the integers.
pub fn square_nonnegative_program() -> Program {
    let mut p = Program::new();
    let x = p.add_var("x", VarSort::Int);
    let y = p.add_var("y", VarSort::Int);
    let a = p.add_var("a", VarSort::Bool);

    let entry = p.add_block("entry");
    let end = p.add_block("end");
    let err = p.add_block("err");
    p.entry = entry;
    p.error = err;

    p.blocks[entry].stmts.push(Stmt::BinOp {
        dst: y,
        op: BinOp::Mul,
        lhs: Operand::Var(x),
        rhs: Operand::Var(x),
    });
    p.blocks[entry].stmts.push(Stmt::AssignCmp {
        dst: a,
        op: CmpOp::Ge,
        lhs: Operand::Var(y),
        rhs: Operand::Int(0),
    });
    p.blocks[entry].term = Terminator::Br {
        cond: Cond::Var(a),
        then_bb: end,
        else_bb: err,
    };
    p
}

/// Two infeasible paths into the failure block; the second one crosses a
/// critical edge.
pub fn two_infeasible_paths_program() -> Program {
    let mut p = Program::new();
    let x = p.add_var("x", VarSort::Int);
    let c1 = p.add_var("c1", VarSort::Bool);
    let c2 = p.add_var("c2", VarSort::Bool);

    let entry = p.add_block("entry");
    let b = p.add_block("b");
    let e = p.add_block("e");
    let exit = p.add_block("exit");
    let err = p.add_block("err");
    p.entry = entry;
    p.error = err;

    p.blocks[entry].stmts.push(Stmt::AssignCmp {
        dst: c1,
        op: CmpOp::Gt,
        lhs: Operand::Var(x),
        rhs: Operand::Int(0),
    });
    p.blocks[entry].term = Terminator::Br {
        cond: Cond::Var(c1),
        then_bb: b,
        else_bb: e,
    };

    // x > 0 and x < 0: infeasible.
    p.blocks[b].stmts.push(Stmt::Assume(Cond::Cmp {
        op: CmpOp::Lt,
        lhs: Operand::Var(x),
        rhs: Operand::Int(0),
    }));
    p.blocks[b].term = Terminator::Jump(err);

    // x <= 0 and x > 5: infeasible, over the critical e -> err edge.
    p.blocks[e].stmts.push(Stmt::AssignCmp {
        dst: c2,
        op: CmpOp::Gt,
        lhs: Operand::Var(x),
        rhs: Operand::Int(5),
    });
    p.blocks[e].term = Terminator::Br {
        cond: Cond::Var(c2),
        then_bb: err,
        else_bb: exit,
    };
    p
}

/// Two interval-infeasible paths into the failure block, one across a
/// critical edge, so the AI checker must rebind a tuple literal through
/// the symbolic stores.
pub fn critical_edge_contradiction_program() -> Program {
    let mut p = Program::new();
    let x = p.add_var("x", VarSort::Int);

    let entry = p.add_block("entry");
    let join = p.add_block("join");
    let mid = p.add_block("mid");
    let err = p.add_block("err");
    p.entry = entry;
    p.error = err;

    p.blocks[entry].stmts.push(Stmt::Assume(Cond::Cmp {
        op: CmpOp::Le,
        lhs: Operand::Var(x),
        rhs: Operand::Int(0),
    }));
    // entry -> join is critical: entry also branches to mid, and join is
    // also entered from mid.
    p.blocks[entry].term = Terminator::Br {
        cond: Cond::Cmp {
            op: CmpOp::Gt,
            lhs: Operand::Var(x),
            rhs: Operand::Int(5),
        },
        then_bb: join,
        else_bb: mid,
    };
    p.blocks[mid].stmts.push(Stmt::Assume(Cond::Cmp {
        op: CmpOp::Gt,
        lhs: Operand::Var(x),
        rhs: Operand::Int(3),
    }));
    p.blocks[mid].term = Terminator::Jump(join);
    p.blocks[join].term = Terminator::Jump(err);
    p
}

/// The infeasibility witness needs a plain copy, which the AI checker has
/// no block/edge reading for; the path must fall back to the SMT checker.
pub fn copy_then_contradiction_program() -> Program {
    let mut p = Program::new();
    let y = p.add_var("y", VarSort::Int);

    let entry = p.add_block("entry");
    let err = p.add_block("err");
    p.entry = entry;
    p.error = err;

    p.blocks[entry].stmts.push(Stmt::Assign {
        dst: y,
        src: Operand::Int(7),
    });
    p.blocks[entry].stmts.push(Stmt::Assume(Cond::Cmp {
        op: CmpOp::Lt,
        lhs: Operand::Var(y),
        rhs: Operand::Int(0),
    }));
    p.blocks[entry].term = Terminator::Jump(err);
    p
}

/// Boolean xor flows into the abstraction, which has no rewrite for it.
pub fn xor_program() -> Program {
    let mut p = Program::new();
    let a = p.add_var("a", VarSort::Bool);
    let b = p.add_var("b", VarSort::Bool);
    let d = p.add_var("d", VarSort::Bool);

    let entry = p.add_block("entry");
    let exit = p.add_block("exit");
    let err = p.add_block("err");
    p.entry = entry;
    p.error = err;

    p.blocks[entry].stmts.push(Stmt::BoolBin {
        dst: d,
        op: petrel_ir::BoolOp::Xor,
        lhs: a,
        rhs: b,
    });
    p.blocks[entry].term = Terminator::Br {
        cond: Cond::Var(d),
        then_bb: err,
        else_bb: exit,
    };
    p
}
