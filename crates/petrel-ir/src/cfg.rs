use crate::stmt::{Phi, Stmt, Terminator};

/// Index of a basic block within its program.
pub type BlockId = usize;
/// Index of an SSA variable within its program.
pub type VarId = usize;

/// Variable sorts tracked by the IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarSort {
    Bool,
    Int,
    Array,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarInfo {
    pub name: String,
    pub sort: VarSort,
}

/// A basic block: phi nodes, straight-line statements, one terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub name: String,
    pub phis: Vec<Phi>,
    pub stmts: Vec<Stmt>,
    pub term: Terminator,
}

/// An SSA program with a designated entry and failure block.
///
/// Reaching `error` is the property violation: the engine decides whether
/// any bounded execution gets there. Programs with loops must be in
/// loop-closed SSA form (values defined in a loop are used outside it only
/// through phis at the loop exits) so that bounded unwinding can rewire
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub vars: Vec<VarInfo>,
    pub blocks: Vec<Block>,
    pub entry: BlockId,
    pub error: BlockId,
}

impl Program {
    pub fn new() -> Self {
        Self {
            vars: Vec::new(),
            blocks: Vec::new(),
            entry: 0,
            error: 0,
        }
    }

    pub fn add_var(&mut self, name: impl Into<String>, sort: VarSort) -> VarId {
        self.vars.push(VarInfo {
            name: name.into(),
            sort,
        });
        self.vars.len() - 1
    }

    pub fn add_block(&mut self, name: impl Into<String>) -> BlockId {
        self.blocks.push(Block {
            name: name.into(),
            phis: Vec::new(),
            stmts: Vec::new(),
            term: Terminator::Halt,
        });
        self.blocks.len() - 1
    }

    pub fn succs(&self, b: BlockId) -> Vec<BlockId> {
        self.blocks[b].term.targets()
    }

    pub fn preds(&self, b: BlockId) -> Vec<BlockId> {
        (0..self.blocks.len())
            .filter(|&p| self.succs(p).contains(&b))
            .collect()
    }

    /// A CFG edge is critical if it is not the only one leaving its source
    /// block and not the only one entering its destination block.
    pub fn is_critical_edge(&self, src: BlockId, dst: BlockId) -> bool {
        let mut not_only_leaving = false;
        let mut not_only_entering = false;

        for s in self.succs(src) {
            if s != dst {
                not_only_leaving = true;
                break;
            }
        }

        for p in self.preds(dst) {
            if p != src {
                not_only_entering = true;
                break;
            }
        }

        not_only_leaving && not_only_entering
    }

    /// The block owning a phi that defines `v`, if any.
    pub fn phi_block_of(&self, v: VarId) -> Option<BlockId> {
        self.blocks
            .iter()
            .position(|b| b.phis.iter().any(|phi| phi.dst == v))
    }

    pub fn var_name(&self, v: VarId) -> &str {
        &self.vars[v].name
    }

    pub fn block_name(&self, b: BlockId) -> &str {
        &self.blocks[b].name
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}
