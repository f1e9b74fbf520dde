//! Control-flow graph for decision programs.
//!
//! Structured lowering: blocks split at `if`/merge points, no loops by
//! construction. Block ids are allocated so that every edge goes from a
//! lower id to a higher one, so iterating blocks in id order visits them in
//! reverse post-order.

use crate::program::{Cond, IntExpr, Program, Stmt};

pub type BlockId = usize;

/// A basic block: assignments to the result variable plus a terminator.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    /// Right-hand sides of assignments to the result variable, in order.
    pub assigns: Vec<IntExpr>,
    pub term: Terminator,
    pub preds: Vec<BlockId>,
}

/// How a basic block ends.
#[derive(Debug, Clone)]
pub enum Terminator {
    Goto(BlockId),
    Branch {
        cond: Cond,
        then_target: BlockId,
        else_target: BlockId,
    },
    Return,
}

#[derive(Debug)]
pub struct Cfg {
    pub blocks: Vec<BasicBlock>,
    pub entry: BlockId,
}

impl Cfg {
    /// Lowers a decision program to its control-flow graph.
    pub fn build(program: &Program) -> Cfg {
        let mut builder = Builder { blocks: Vec::new() };
        let entry = builder.new_block();
        let last = builder.lower_stmts(&program.body, entry);
        builder.blocks[last].term = Terminator::Return;

        let mut cfg = Cfg {
            blocks: builder.blocks,
            entry,
        };
        cfg.compute_preds();
        cfg
    }

    fn compute_preds(&mut self) {
        let mut preds: Vec<Vec<BlockId>> = vec![Vec::new(); self.blocks.len()];
        for (id, block) in self.blocks.iter().enumerate() {
            match &block.term {
                Terminator::Goto(target) => preds[*target].push(id),
                Terminator::Branch {
                    then_target,
                    else_target,
                    ..
                } => {
                    preds[*then_target].push(id);
                    preds[*else_target].push(id);
                }
                Terminator::Return => {}
            }
        }
        for (block, p) in self.blocks.iter_mut().zip(preds) {
            block.preds = p;
        }
    }

    /// Successor edges of a block: target plus the branch condition and the
    /// polarity under which it is taken, when the edge is conditional.
    pub fn successors(&self, id: BlockId) -> Vec<(BlockId, Option<(&Cond, bool)>)> {
        match &self.blocks[id].term {
            Terminator::Goto(target) => vec![(*target, None)],
            Terminator::Branch {
                cond,
                then_target,
                else_target,
            } => vec![
                (*then_target, Some((cond, true))),
                (*else_target, Some((cond, false))),
            ],
            Terminator::Return => Vec::new(),
        }
    }
}

struct Builder {
    blocks: Vec<BasicBlock>,
}

impl Builder {
    fn new_block(&mut self) -> BlockId {
        let id = self.blocks.len();
        self.blocks.push(BasicBlock {
            assigns: Vec::new(),
            term: Terminator::Return,
            preds: Vec::new(),
        });
        id
    }

    /// Lowers a statement sequence starting in `cur`; returns the block that
    /// is open after the sequence.
    fn lower_stmts(&mut self, stmts: &[Stmt], mut cur: BlockId) -> BlockId {
        for stmt in stmts {
            match stmt {
                Stmt::Assign(expr) => {
                    self.blocks[cur].assigns.push(expr.clone());
                }
                Stmt::If {
                    cond,
                    then_body,
                    else_body,
                } => {
                    let then_start = self.new_block();
                    let then_end = self.lower_stmts(then_body, then_start);

                    let (else_target, else_end) = if else_body.is_empty() {
                        (None, None)
                    } else {
                        let else_start = self.new_block();
                        let else_end = self.lower_stmts(else_body, else_start);
                        (Some(else_start), Some(else_end))
                    };

                    // The join block is allocated after both arms, keeping
                    // block ids topologically ordered.
                    let join = self.new_block();
                    self.blocks[cur].term = Terminator::Branch {
                        cond: cond.clone(),
                        then_target: then_start,
                        else_target: else_target.unwrap_or(join),
                    };
                    self.blocks[then_end].term = Terminator::Goto(join);
                    if let Some(else_end) = else_end {
                        self.blocks[else_end].term = Terminator::Goto(join);
                    }
                    cur = join;
                }
            }
        }
        cur
    }
}
