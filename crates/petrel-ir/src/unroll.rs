//! Bounded unwinding of natural loops.
//!
//! Each back edge is unrolled by cloning the loop body a fixed number of
//! times and chaining the copies; the final back edge is cut and redirected
//! to a halting sink, which bounds the exploration (paths needing more
//! iterations simply cannot reach the failure block). The result records,
//! per block, its originating block and whether it opens a new cut-point
//! segment (the entry and every loop-header copy).

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use thiserror::Error;

use crate::cfg::{BlockId, Program, VarId};
use crate::stmt::{Operand, Terminator};

const MAX_BLOCKS: usize = 4096;

#[derive(Debug, Error)]
pub enum UnrollError {
    #[error("loop header '{0}' has more than one back edge")]
    MultipleBackEdges(String),
    #[error("variable '{0}' defined in a loop is used outside it without a loop-closing phi")]
    NotLoopClosed(String),
    #[error("unrolling exceeded {0} blocks")]
    TooLarge(usize),
    #[error("control-flow graph has an irreducible cycle")]
    Irreducible,
}

/// An acyclic program produced by [`unroll`], with provenance back to the
/// original CFG.
#[derive(Debug, Clone)]
pub struct UnrolledProgram {
    pub program: Program,
    /// Original block behind each block of `program`.
    pub origin: Vec<BlockId>,
    /// True for blocks that open a cut-point segment.
    pub cutpoint: Vec<bool>,
    /// True for the halting sinks that replace cut back edges.
    pub sink: Vec<bool>,
}

/// Unwind every natural loop `bound` times.
pub fn unroll(p: &Program, bound: usize) -> Result<UnrolledProgram, UnrollError> {
    let mut prog = p.clone();
    let mut origin: Vec<BlockId> = (0..prog.blocks.len()).collect();
    let mut cutpoint = vec![false; prog.blocks.len()];
    let mut sink = vec![false; prog.blocks.len()];
    cutpoint[prog.entry] = true;
    let mut next_tag = 0usize;

    loop {
        if prog.blocks.len() > MAX_BLOCKS {
            return Err(UnrollError::TooLarge(MAX_BLOCKS));
        }
        let dom = dominators(&prog);
        let reach = reachable(&prog);
        let Some((latch, header)) = back_edges(&prog, &dom, &reach).into_iter().next() else {
            break;
        };
        for (u, h) in back_edges(&prog, &dom, &reach) {
            if h == header && u != latch {
                return Err(UnrollError::MultipleBackEdges(
                    prog.blocks[header].name.clone(),
                ));
            }
        }
        cutpoint[header] = true;

        let body = natural_loop_body(&prog, latch, header);
        let body_defs = loop_defs(&prog, &body);
        check_loop_closed(&prog, &body, &body_defs)?;

        let len_before = prog.blocks.len();
        let snapshot: Vec<(BlockId, crate::cfg::Block)> = body
            .iter()
            .map(|&b| (b, prog.blocks[b].clone()))
            .collect();

        // The original header keeps only its loop-external incomings; the
        // back-edge value flows into the first clone instead.
        for phi in &mut prog.blocks[header].phis {
            phi.incoming.retain(|(pb, _)| *pb != latch);
        }

        let mut prev_latch = latch;
        let mut prev_vmap: HashMap<VarId, VarId> = HashMap::new();
        let mut bmaps: Vec<HashMap<BlockId, BlockId>> = Vec::new();
        let mut vmaps: Vec<HashMap<VarId, VarId>> = Vec::new();

        for _ in 0..bound {
            next_tag += 1;
            let tag = next_tag;

            let mut vmap = HashMap::new();
            let mut defs_sorted: Vec<VarId> = body_defs.iter().copied().collect();
            defs_sorted.sort_unstable();
            for v in defs_sorted {
                let info = prog.vars[v].clone();
                let nv = prog.add_var(format!("{}@{}", info.name, tag), info.sort);
                vmap.insert(v, nv);
            }

            let mut bmap = HashMap::new();
            for (ob, oblock) in &snapshot {
                let nb = prog.add_block(format!("{}@{}", oblock.name, tag));
                bmap.insert(*ob, nb);
                origin.push(origin[*ob]);
                cutpoint.push(*ob == header);
                sink.push(false);
            }

            for (ob, oblock) in &snapshot {
                let nb = bmap[ob];
                let mut nblock = oblock.clone();
                nblock.name = prog.blocks[nb].name.clone();

                if *ob == header {
                    // Only the loop-carried value survives in a clone; it is
                    // fed by the previous copy's latch.
                    nblock.phis.retain(|phi| {
                        phi.incoming.iter().any(|(pb, _)| *pb == latch)
                    });
                    for phi in &mut nblock.phis {
                        phi.incoming.retain(|(pb, _)| *pb == latch);
                        for (pb, op) in &mut phi.incoming {
                            *pb = prev_latch;
                            *op = op.renamed(&prev_vmap);
                        }
                        phi.dst = vmap[&phi.dst];
                    }
                } else {
                    for phi in &mut nblock.phis {
                        phi.dst = vmap[&phi.dst];
                        for (pb, op) in &mut phi.incoming {
                            if let Some(&nb) = bmap.get(pb) {
                                *pb = nb;
                            }
                            *op = op.renamed(&vmap);
                        }
                    }
                }

                for stmt in &mut nblock.stmts {
                    *stmt = stmt.renamed(&vmap);
                }
                nblock.term = rename_term(&nblock.term, &vmap);
                // Retarget intra-body edges, leaving the clone's own back
                // edge dangling at the original header; the next copy (or
                // the sink) claims it below.
                retarget_body_edges(&mut nblock.term, &bmap, *ob == latch, header);
                prog.blocks[nb] = nblock;
            }

            // Chain the previous copy into this one.
            prog.blocks[prev_latch].term.retarget(header, bmap[&header]);

            prev_latch = bmap[&latch];
            prev_vmap = vmap.clone();
            bmaps.push(bmap);
            vmaps.push(vmap);
        }

        // Cut the final back edge.
        let header_name = prog.blocks[header].name.clone();
        let unwind = prog.add_block(format!("{header_name}.unwind"));
        origin.push(origin[header]);
        cutpoint.push(false);
        sink.push(true);
        prog.blocks[prev_latch].term.retarget(header, unwind);

        // Loop-closing phis outside the body gain one incoming per copy.
        for b in 0..len_before {
            if body.contains(&b) {
                continue;
            }
            let mut extra: Vec<(usize, Vec<(BlockId, Operand)>)> = Vec::new();
            for (pi, phi) in prog.blocks[b].phis.iter().enumerate() {
                let mut adds = Vec::new();
                for (pb, op) in &phi.incoming {
                    if !body.contains(pb) {
                        continue;
                    }
                    for (bmap, vmap) in bmaps.iter().zip(&vmaps) {
                        adds.push((bmap[pb], op.renamed(vmap)));
                    }
                }
                if !adds.is_empty() {
                    extra.push((pi, adds));
                }
            }
            for (pi, adds) in extra {
                prog.blocks[b].phis[pi].incoming.extend(adds);
            }
        }
    }

    if topo_order(&prog).is_none() {
        return Err(UnrollError::Irreducible);
    }

    Ok(UnrolledProgram {
        program: prog,
        origin,
        cutpoint,
        sink,
    })
}

fn rename_term(term: &Terminator, vmap: &HashMap<VarId, VarId>) -> Terminator {
    match term {
        Terminator::Br {
            cond,
            then_bb,
            else_bb,
        } => Terminator::Br {
            cond: cond.renamed(vmap),
            then_bb: *then_bb,
            else_bb: *else_bb,
        },
        other => other.clone(),
    }
}

fn retarget_body_edges(
    term: &mut Terminator,
    bmap: &HashMap<BlockId, BlockId>,
    is_latch: bool,
    header: BlockId,
) {
    let remap = |t: &mut BlockId| {
        if is_latch && *t == header {
            return;
        }
        if let Some(&nb) = bmap.get(t) {
            *t = nb;
        }
    };
    match term {
        Terminator::Jump(b) => remap(b),
        Terminator::Br {
            then_bb, else_bb, ..
        } => {
            remap(then_bb);
            remap(else_bb);
        }
        Terminator::Halt => {}
    }
}

/// Iterative dominator computation.
fn dominators(p: &Program) -> Vec<HashSet<BlockId>> {
    let n = p.blocks.len();
    let all: HashSet<BlockId> = (0..n).collect();
    let mut dom: Vec<HashSet<BlockId>> = vec![all; n];
    dom[p.entry] = HashSet::from([p.entry]);

    let preds: Vec<Vec<BlockId>> = (0..n).map(|b| p.preds(b)).collect();
    let mut changed = true;
    while changed {
        changed = false;
        for b in 0..n {
            if b == p.entry {
                continue;
            }
            let mut new: Option<HashSet<BlockId>> = None;
            for &pr in &preds[b] {
                new = Some(match new {
                    None => dom[pr].clone(),
                    Some(acc) => acc.intersection(&dom[pr]).copied().collect(),
                });
            }
            let mut new = new.unwrap_or_default();
            new.insert(b);
            if new != dom[b] {
                dom[b] = new;
                changed = true;
            }
        }
    }
    dom
}

fn reachable(p: &Program) -> HashSet<BlockId> {
    let mut seen = HashSet::from([p.entry]);
    let mut stack = vec![p.entry];
    while let Some(b) = stack.pop() {
        for s in p.succs(b) {
            if seen.insert(s) {
                stack.push(s);
            }
        }
    }
    seen
}

fn back_edges(
    p: &Program,
    dom: &[HashSet<BlockId>],
    reach: &HashSet<BlockId>,
) -> Vec<(BlockId, BlockId)> {
    let mut out = Vec::new();
    for u in 0..p.blocks.len() {
        if !reach.contains(&u) {
            continue;
        }
        for h in p.succs(u) {
            if dom[u].contains(&h) {
                out.push((u, h));
            }
        }
    }
    out
}

/// Blocks of the natural loop with back edge `latch -> header`.
fn natural_loop_body(p: &Program, latch: BlockId, header: BlockId) -> IndexSet<BlockId> {
    let mut body = IndexSet::new();
    body.insert(header);
    body.insert(latch);
    let mut stack = vec![latch];
    while let Some(n) = stack.pop() {
        if n == header {
            continue;
        }
        for pr in p.preds(n) {
            if body.insert(pr) {
                stack.push(pr);
            }
        }
    }
    body
}

fn loop_defs(p: &Program, body: &IndexSet<BlockId>) -> HashSet<VarId> {
    let mut defs = HashSet::new();
    for &b in body {
        for phi in &p.blocks[b].phis {
            defs.insert(phi.dst);
        }
        for stmt in &p.blocks[b].stmts {
            if let Some(d) = stmt.def() {
                defs.insert(d);
            }
        }
    }
    defs
}

fn check_loop_closed(
    p: &Program,
    body: &IndexSet<BlockId>,
    body_defs: &HashSet<VarId>,
) -> Result<(), UnrollError> {
    for b in 0..p.blocks.len() {
        if body.contains(&b) {
            continue;
        }
        let block = &p.blocks[b];
        let mut used: Vec<VarId> = Vec::new();
        for stmt in &block.stmts {
            used.extend(stmt.uses());
        }
        if let Terminator::Br { cond, .. } = &block.term {
            used.extend(cond.vars());
        }
        // Phi operands from body predecessors are the loop-closing uses and
        // are rewired during cloning; anything else is an escape.
        for phi in &block.phis {
            for (pb, op) in &phi.incoming {
                if body.contains(pb) {
                    continue;
                }
                if let Some(v) = op.as_var() {
                    used.push(v);
                }
            }
        }
        for v in used {
            if body_defs.contains(&v) {
                return Err(UnrollError::NotLoopClosed(p.vars[v].name.clone()));
            }
        }
    }
    Ok(())
}

/// Topological order of the blocks reachable from entry, or `None` if a
/// cycle remains.
pub fn topo_order(p: &Program) -> Option<Vec<BlockId>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        White,
        Grey,
        Black,
    }
    let mut mark = vec![Mark::White; p.blocks.len()];
    let mut order = Vec::new();

    // Iterative DFS with an explicit phase per frame.
    let mut stack = vec![(p.entry, false)];
    while let Some((b, expanded)) = stack.pop() {
        if expanded {
            mark[b] = Mark::Black;
            order.push(b);
            continue;
        }
        match mark[b] {
            Mark::Black => continue,
            Mark::Grey => return None,
            Mark::White => {}
        }
        mark[b] = Mark::Grey;
        stack.push((b, true));
        for s in p.succs(b) {
            match mark[s] {
                Mark::Grey => return None,
                Mark::White => stack.push((s, false)),
                Mark::Black => {}
            }
        }
    }
    order.reverse();
    Some(order)
}
