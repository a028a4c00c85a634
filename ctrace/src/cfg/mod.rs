//! Control-flow graph
//!
//! All nodes of all functions live in one [`Cfg`] arena and refer to each
//! other by [`NodeId`]. `successors` own the control structure: for a branch
//! node index 0 is the true target and index 1 the false target.
//! `predecessors` are bookkeeping for analyses and never drive execution.

mod build;

pub use build::{CfgBuilder, Subgraph};

use crate::ast::{Expr, TempId, VarDecl};
use serde::Serialize;
use std::fmt;

/// Index of a node in the [`Cfg`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Straight-line statement inside a node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instr {
    pub line: u32,
    pub kind: InstrKind,
    /// Continues a source line started by an earlier instruction (the part
    /// of a statement left after a hoisted call). Executes in the same step
    /// as whatever reaches it.
    pub resumes: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InstrKind {
    /// Local declaration, one cell per declarator
    Declare(Vec<VarDecl>),
    /// Expression evaluated for its effect
    Eval(Expr),
    /// Side-effecting remainder of an eliminated store
    Effects(Vec<Expr>),
    Print {
        format: String,
        value: Option<Expr>,
    },
    Return(Option<Expr>),
    /// Transfer into `callee`; its result lands in temporary `dest`.
    /// Always the last instruction of its node.
    Call {
        callee: String,
        args: Vec<Expr>,
        dest: Option<TempId>,
    },
    /// Statement removed by optimization; still occupies its line
    Nop,
}

impl fmt::Display for InstrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrKind::Declare(vars) => {
                for (i, var) in vars.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{var}")?;
                }
                Ok(())
            }
            InstrKind::Eval(expr) => write!(f, "{expr}"),
            InstrKind::Effects(exprs) => {
                write!(f, "effects(")?;
                for (i, expr) in exprs.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{expr}")?;
                }
                write!(f, ")")
            }
            InstrKind::Print { format, value } => match value {
                Some(v) => write!(f, "printf({format:?}, {v})"),
                None => write!(f, "printf({format:?})"),
            },
            InstrKind::Return(Some(v)) => write!(f, "return {v}"),
            InstrKind::Return(None) => write!(f, "return"),
            InstrKind::Call { callee, args, dest } => {
                write!(f, "call {}", Expr::call(callee, args.clone()))?;
                if let Some(dest) = dest {
                    write!(f, " -> %t{dest}")?;
                }
                Ok(())
            }
            InstrKind::Nop => write!(f, "nop"),
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.resumes { "+" } else { "" };
        write!(f, "{}{marker}: {}", self.line, self.kind)
    }
}

/// Branch condition evaluated when a node's block is exhausted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    pub expr: Expr,
    pub line: u32,
}

/// Basic block
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub block: Vec<Instr>,
    pub predicate: Option<Predicate>,
    pub successors: Vec<NodeId>,
    pub predecessors: Vec<NodeId>,
}

impl Node {
    fn new(id: NodeId) -> Self {
        Node {
            id,
            block: Vec::new(),
            predicate: None,
            successors: Vec::new(),
            predecessors: Vec::new(),
        }
    }

    pub fn is_branch(&self) -> bool {
        self.predicate.is_some()
    }

    /// Function entered from this node, if it ends in a call
    pub fn call_target(&self) -> Option<&str> {
        match self.block.last() {
            Some(Instr {
                kind: InstrKind::Call { callee, .. },
                ..
            }) => Some(callee),
            _ => None,
        }
    }

    pub fn true_successor(&self) -> Option<NodeId> {
        self.successors.first().copied()
    }

    pub fn false_successor(&self) -> Option<NodeId> {
        self.successors.get(1).copied()
    }
}

/// Position of the next statement to execute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramCounter {
    pub node: NodeId,
    /// Index into the node's block. Kept here rather than on the node so
    /// that concurrent activations of one function do not share it.
    pub cursor: usize,
    /// Line of a synthetic no-op that runs before the instruction at `cursor`
    pub pending_nop: Option<u32>,
}

impl ProgramCounter {
    pub fn at(node: NodeId) -> Self {
        ProgramCounter {
            node,
            cursor: 0,
            pending_nop: None,
        }
    }

    pub fn advanced(self) -> Self {
        ProgramCounter {
            node: self.node,
            cursor: self.cursor + 1,
            pending_nop: None,
        }
    }
}

/// Arena owning every node
#[derive(Debug, Clone, Default, Serialize)]
pub struct Cfg {
    nodes: Vec<Node>,
}

impl Cfg {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id));
        id
    }

    /// Append `to` to the successors of `from`. Order matters for branches.
    pub fn link(&mut self, from: NodeId, to: NodeId) {
        self.nodes[from.0].successors.push(to);
        self.nodes[to.0].predecessors.push(from);
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Instruction a program counter points at, if any
    pub fn instr_at(&self, pc: ProgramCounter) -> Option<&Instr> {
        self.nodes.get(pc.node.0)?.block.get(pc.cursor)
    }

    /// Nodes reachable from `entry` in depth-first preorder
    pub fn reachable(&self, entry: NodeId) -> Vec<NodeId> {
        let mut seen = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        let mut worklist = vec![entry];
        while let Some(id) = worklist.pop() {
            if seen[id.0] {
                continue;
            }
            seen[id.0] = true;
            order.push(id);
            for &succ in self.node(id).successors.iter().rev() {
                if !seen[succ.0] {
                    worklist.push(succ);
                }
            }
        }
        order
    }

    /// Check the branch invariant on every node reachable from `entry`:
    /// a predicate iff two successors, otherwise at most one.
    pub fn is_well_formed(&self, entry: NodeId) -> bool {
        self.reachable(entry).into_iter().all(|id| {
            let node = self.node(id);
            match node.predicate {
                Some(_) => node.successors.len() == 2,
                None => node.successors.len() <= 1,
            }
        })
    }

    /// Text listing of the subgraph reachable from `entry`
    pub fn render(&self, entry: NodeId) -> String {
        let mut out = String::new();
        for id in self.reachable(entry) {
            let node = self.node(id);
            out.push_str(&format!("{id}:"));
            if node.block.is_empty() {
                out.push_str(" (empty)");
            }
            out.push('\n');
            for instr in &node.block {
                out.push_str(&format!("    {instr}\n"));
            }
            let targets: Vec<String> = node.successors.iter().map(|s| s.to_string()).collect();
            match &node.predicate {
                Some(pred) => out.push_str(&format!(
                    "    {}: if {} -> {}\n",
                    pred.line,
                    pred.expr,
                    targets.join(" | ")
                )),
                None if targets.is_empty() => out.push_str("    end\n"),
                None => out.push_str(&format!("    -> {}\n", targets.join(""))),
            }
        }
        out
    }
}

impl std::ops::Index<NodeId> for Cfg {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        self.node(id)
    }
}

impl std::ops::IndexMut<NodeId> for Cfg {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        self.node_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_records_both_directions() {
        let mut cfg = Cfg::new();
        let a = cfg.add_node();
        let b = cfg.add_node();
        cfg.link(a, b);
        assert_eq!(cfg[a].successors, vec![b]);
        assert_eq!(cfg[b].predecessors, vec![a]);
    }

    #[test]
    fn test_reachable_skips_detached_nodes() {
        let mut cfg = Cfg::new();
        let a = cfg.add_node();
        let b = cfg.add_node();
        let detached = cfg.add_node();
        cfg.link(a, b);
        cfg.link(b, a);
        let reached = cfg.reachable(a);
        assert_eq!(reached, vec![a, b]);
        assert!(!reached.contains(&detached));
    }

    #[test]
    fn test_branch_without_two_successors_is_malformed() {
        let mut cfg = Cfg::new();
        let a = cfg.add_node();
        let b = cfg.add_node();
        cfg.link(a, b);
        assert!(cfg.is_well_formed(a));
        cfg[a].predicate = Some(Predicate {
            expr: Expr::ident("x"),
            line: 1,
        });
        assert!(!cfg.is_well_formed(a));
    }

    #[test]
    fn test_program_counter_advance_clears_nop() {
        let pc = ProgramCounter {
            node: NodeId(2),
            cursor: 1,
            pending_nop: Some(4),
        };
        let next = pc.advanced();
        assert_eq!(next.cursor, 2);
        assert_eq!(next.pending_nop, None);
    }
}
