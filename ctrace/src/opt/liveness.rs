//! Backward liveness over a function graph

use crate::ast::{AssignOp, Expr, UnOp};
use crate::cfg::{Cfg, InstrKind, Node, NodeId};
use std::collections::{HashMap, HashSet, VecDeque};

/// Names an expression or statement reads and writes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UseDef {
    pub used: HashSet<String>,
    pub defined: HashSet<String>,
}

impl UseDef {
    pub fn of_expr(expr: &Expr) -> Self {
        let mut ud = UseDef::default();
        ud.visit(expr);
        ud
    }

    pub fn of_instr(kind: &InstrKind) -> Self {
        let mut ud = UseDef::default();
        match kind {
            // A bare scalar redeclaration keeps the cell's value; arrays
            // are reset to all-uninitialized.
            InstrKind::Declare(vars) => {
                for var in vars {
                    match &var.init {
                        Some(init) => ud.visit(init),
                        None if !var.ty.is_array() => continue,
                        None => {}
                    }
                    ud.defined.insert(var.name.clone());
                }
            }
            InstrKind::Eval(expr) => ud.visit(expr),
            InstrKind::Effects(exprs) | InstrKind::Call { args: exprs, .. } => {
                exprs.iter().for_each(|e| ud.visit(e))
            }
            InstrKind::Print { value, .. } | InstrKind::Return(value) => {
                if let Some(expr) = value {
                    ud.visit(expr);
                }
            }
            InstrKind::Nop => {}
        }
        ud
    }

    fn visit(&mut self, expr: &Expr) {
        match expr {
            Expr::Identifier(name) => {
                self.used.insert(name.clone());
            }
            Expr::Constant(_) | Expr::Temp(_) => {}
            Expr::Binary { lhs, rhs, .. } => {
                self.visit(lhs);
                self.visit(rhs);
            }
            Expr::Unary {
                op: UnOp::Incr | UnOp::Decr,
                operand,
            } => self.visit_update(operand),
            Expr::Unary { operand, .. } => self.visit(operand),
            Expr::Assign { op, target, value } => {
                self.visit(value);
                match op {
                    AssignOp::Assign => self.visit_target(target),
                    AssignOp::AddAssign | AssignOp::SubAssign => self.visit_update(target),
                }
            }
            Expr::Index { array, index } => {
                self.visit(array);
                self.visit(index);
            }
            Expr::Call { args, .. } => args.iter().for_each(|a| self.visit(a)),
        }
    }

    /// Write without reading the old value
    fn visit_target(&mut self, target: &Expr) {
        match target {
            Expr::Identifier(name) => {
                self.defined.insert(name.clone());
            }
            // an element store rewrites the whole array cell
            Expr::Index { array, index } => {
                self.visit(index);
                if let Expr::Identifier(name) = array.as_ref() {
                    self.used.insert(name.clone());
                    self.defined.insert(name.clone());
                } else {
                    self.visit(array);
                }
            }
            Expr::Unary {
                op: UnOp::Deref,
                operand,
            } => self.visit(operand),
            other => self.visit(other),
        }
    }

    /// Read-modify-write
    fn visit_update(&mut self, target: &Expr) {
        if let Expr::Identifier(name) = target {
            self.used.insert(name.clone());
        }
        self.visit_target(target);
    }
}

/// Per-node liveness sets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockLiveness {
    /// Read before any write in this node
    pub used: HashSet<String>,
    pub defined: HashSet<String>,
    /// Node leaves the function; nothing after it is live
    pub returns: bool,
    pub live_in: HashSet<String>,
    pub live_out: HashSet<String>,
}

impl BlockLiveness {
    fn local(node: &Node) -> Self {
        let mut block = BlockLiveness::default();
        for instr in &node.block {
            block.add(UseDef::of_instr(&instr.kind));
            if matches!(instr.kind, InstrKind::Return(_)) {
                block.returns = true;
                return block;
            }
        }
        if let Some(pred) = &node.predicate {
            block.add(UseDef::of_expr(&pred.expr));
        }
        block
    }

    fn add(&mut self, ud: UseDef) {
        for name in ud.used {
            if !self.defined.contains(&name) {
                self.used.insert(name);
            }
        }
        self.defined.extend(ud.defined);
    }
}

/// Liveness solution for one function
#[derive(Debug, Clone, Default)]
pub struct Liveness {
    blocks: HashMap<NodeId, BlockLiveness>,
}

impl Liveness {
    /// Iterate `live_in = used ∪ (live_out − defined)` and
    /// `live_out = ∪ live_in(successors)` to a fixed point over every node
    /// reachable from `entry`.
    pub fn compute(cfg: &Cfg, entry: NodeId) -> Self {
        let nodes = cfg.reachable(entry);
        let mut blocks: HashMap<NodeId, BlockLiveness> = nodes
            .iter()
            .map(|&id| (id, BlockLiveness::local(&cfg[id])))
            .collect();

        let mut queued = vec![false; cfg.len()];
        let mut worklist: VecDeque<NodeId> = nodes.iter().rev().copied().collect();
        for id in &worklist {
            queued[id.0] = true;
        }

        while let Some(id) = worklist.pop_front() {
            queued[id.0] = false;
            let live_out: HashSet<String> = cfg[id]
                .successors
                .iter()
                .filter_map(|succ| blocks.get(succ))
                .flat_map(|b| b.live_in.iter().cloned())
                .collect();

            let Some(block) = blocks.get_mut(&id) else {
                continue;
            };
            let mut live_in = block.used.clone();
            if !block.returns {
                live_in.extend(live_out.difference(&block.defined).cloned());
            }
            block.live_out = live_out;

            if live_in != block.live_in {
                block.live_in = live_in;
                for &pred in &cfg[id].predecessors {
                    if blocks.contains_key(&pred) && !queued[pred.0] {
                        queued[pred.0] = true;
                        worklist.push_back(pred);
                    }
                }
            }
        }

        Liveness { blocks }
    }

    pub fn block(&self, id: NodeId) -> Option<&BlockLiveness> {
        self.blocks.get(&id)
    }

    pub fn live_in(&self, id: NodeId) -> Option<&HashSet<String>> {
        self.blocks.get(&id).map(|b| &b.live_in)
    }

    pub fn live_out(&self, id: NodeId) -> Option<&HashSet<String>> {
        self.blocks.get(&id).map(|b| &b.live_out)
    }
}

/// Names whose address is taken with `&` anywhere in `nodes`. Stores to
/// them may be read through a pointer, so they are never dead.
pub fn address_taken(cfg: &Cfg, nodes: &[NodeId]) -> HashSet<String> {
    fn walk(expr: &Expr, out: &mut HashSet<String>) {
        match expr {
            Expr::Unary {
                op: UnOp::AddrOf,
                operand,
            } => {
                if let Expr::Identifier(name) = operand.as_ref() {
                    out.insert(name.clone());
                }
                walk(operand, out);
            }
            Expr::Unary { operand, .. } => walk(operand, out),
            Expr::Binary { lhs, rhs, .. } => {
                walk(lhs, out);
                walk(rhs, out);
            }
            Expr::Assign { target, value, .. } => {
                walk(target, out);
                walk(value, out);
            }
            Expr::Index { array, index } => {
                walk(array, out);
                walk(index, out);
            }
            Expr::Call { args, .. } => args.iter().for_each(|a| walk(a, out)),
            Expr::Identifier(_) | Expr::Constant(_) | Expr::Temp(_) => {}
        }
    }

    let mut out = HashSet::new();
    for &id in nodes {
        let node = &cfg[id];
        for instr in &node.block {
            match &instr.kind {
                InstrKind::Declare(vars) => vars
                    .iter()
                    .filter_map(|v| v.init.as_ref())
                    .for_each(|e| walk(e, &mut out)),
                InstrKind::Eval(expr) => walk(expr, &mut out),
                InstrKind::Effects(exprs) | InstrKind::Call { args: exprs, .. } => {
                    exprs.iter().for_each(|e| walk(e, &mut out))
                }
                InstrKind::Print { value: Some(expr), .. } | InstrKind::Return(Some(expr)) => {
                    walk(expr, &mut out)
                }
                InstrKind::Print { value: None, .. } | InstrKind::Return(None) | InstrKind::Nop => {}
            }
        }
        if let Some(pred) = &node.predicate {
            walk(&pred.expr, &mut out);
        }
    }
    out
}
