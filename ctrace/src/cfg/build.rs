//! Lowering of function bodies into graph nodes
//!
//! Straight-line statements accumulate in the current open node. Branches
//! and loops close it with a predicate and continue in a fresh join node.
//! Calls are hoisted out of expressions in evaluation order: each becomes a
//! `Call` instruction that ends its node, and the call's value is read back
//! through a temporary.

use super::{Cfg, Instr, InstrKind, NodeId, Predicate};
use crate::ast::{Expr, Loop, Stmt, StmtKind, TempId, VarDecl};
use tracing::trace;

/// Entry and terminal nodes of a lowered body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subgraph {
    pub entry: NodeId,
    pub exits: Vec<NodeId>,
}

/// Source line of the statement being lowered, and whether an instruction
/// for it has been emitted yet
struct Statement {
    line: u32,
    started: bool,
}

impl Statement {
    fn new(line: u32) -> Self {
        Statement {
            line,
            started: false,
        }
    }
}

/// Lowers one function body into the shared arena
pub struct CfgBuilder<'a> {
    cfg: &'a mut Cfg,
    next_temp: TempId,
}

impl<'a> CfgBuilder<'a> {
    pub fn new(cfg: &'a mut Cfg) -> Self {
        CfgBuilder { cfg, next_temp: 0 }
    }

    /// Lower a function body. A trailing empty node is always appended so
    /// the body has a single terminal node.
    pub fn build(mut self, body: &[Stmt]) -> Subgraph {
        let entry = self.cfg.add_node();
        let last = self.lower_block(body, entry);
        let exit = self.cfg.add_node();
        self.cfg.link(last, exit);
        Subgraph {
            entry,
            exits: vec![exit],
        }
    }

    fn lower_block(&mut self, stmts: &[Stmt], mut current: NodeId) -> NodeId {
        for stmt in stmts {
            current = self.lower_stmt(stmt, current);
        }
        current
    }

    fn lower_stmt(&mut self, stmt: &Stmt, mut current: NodeId) -> NodeId {
        let mut st = Statement::new(stmt.line);
        match &stmt.kind {
            StmtKind::Body(stmts) => return self.lower_block(stmts, current),
            StmtKind::Selection {
                cond,
                then_body,
                else_body,
            } => {
                return self.lower_selection(
                    stmt.line,
                    cond,
                    then_body,
                    else_body.as_deref(),
                    current,
                );
            }
            StmtKind::Iteration(lp) => return self.lower_loop(stmt.line, lp, current),
            StmtKind::Declaration(vars) => {
                let mut lowered = Vec::with_capacity(vars.len());
                for var in vars {
                    let init = match &var.init {
                        Some(init) => Some(self.hoist_calls(init, &mut current, &mut st)),
                        None => None,
                    };
                    lowered.push(VarDecl {
                        name: var.name.clone(),
                        ty: var.ty.clone(),
                        init,
                    });
                }
                self.emit(current, &mut st, InstrKind::Declare(lowered));
            }
            StmtKind::Expr(expr) => self.lower_expr_stmt(expr, &mut current, &mut st),
            StmtKind::Print { format, value } => {
                let value = match value {
                    Some(v) => Some(self.hoist_calls(v, &mut current, &mut st)),
                    None => None,
                };
                let kind = InstrKind::Print {
                    format: format.clone(),
                    value,
                };
                self.emit(current, &mut st, kind);
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(v) => Some(self.hoist_calls(v, &mut current, &mut st)),
                    None => None,
                };
                self.emit(current, &mut st, InstrKind::Return(value));
            }
        }
        current
    }

    /// if/else: the open node takes the predicate; both arms meet in a new
    /// join node. Without an else arm the false edge goes straight to the join.
    fn lower_selection(
        &mut self,
        line: u32,
        cond: &Expr,
        then_body: &[Stmt],
        else_body: Option<&[Stmt]>,
        mut current: NodeId,
    ) -> NodeId {
        let mut st = Statement::new(line);
        let expr = self.hoist_calls(cond, &mut current, &mut st);
        self.cfg[current].predicate = Some(Predicate { expr, line });

        let then_entry = self.cfg.add_node();
        self.cfg.link(current, then_entry);
        let then_last = self.lower_block(then_body, then_entry);

        let join = match else_body {
            Some(else_body) => {
                let else_entry = self.cfg.add_node();
                self.cfg.link(current, else_entry);
                let else_last = self.lower_block(else_body, else_entry);
                let join = self.cfg.add_node();
                self.cfg.link(then_last, join);
                self.cfg.link(else_last, join);
                join
            }
            None => {
                let join = self.cfg.add_node();
                self.cfg.link(current, join);
                self.cfg.link(then_last, join);
                join
            }
        };
        trace!(line, branch = %current, %join, "lowered selection");
        join
    }

    /// while/for: the open node (after the for-initializer) becomes the loop
    /// head. The body ends in an empty loop-end node carrying a copy of the
    /// predicate, which branches back to the body or out of the loop.
    fn lower_loop(&mut self, line: u32, lp: &Loop, mut current: NodeId) -> NodeId {
        let (init, cond, step, body) = match lp {
            Loop::While { cond, body } => (None, cond, None, body),
            Loop::For {
                init,
                cond,
                step,
                body,
            } => (init.as_ref(), cond, step.as_ref(), body),
        };

        let mut st = Statement::new(line);
        if let Some(init) = init {
            self.lower_expr_stmt(init, &mut current, &mut st);
        }
        let expr = self.hoist_calls(cond, &mut current, &mut st);
        let head = current;
        self.cfg[head].predicate = Some(Predicate { expr, line });

        let body_entry = self.cfg.add_node();
        let mut body_last = self.lower_block(body, body_entry);
        if let Some(step) = step {
            let mut st = Statement::new(line);
            self.lower_expr_stmt(step, &mut body_last, &mut st);
        }

        let end = self.cfg.add_node();
        self.cfg.link(body_last, end);
        let mut end_branch = end;
        let mut st = Statement::new(line);
        let expr = self.hoist_calls(cond, &mut end_branch, &mut st);
        self.cfg[end_branch].predicate = Some(Predicate { expr, line });

        let after = self.cfg.add_node();
        self.cfg.link(head, body_entry);
        self.cfg.link(head, after);
        self.cfg.link(end_branch, body_entry);
        self.cfg.link(end_branch, after);
        trace!(line, %head, %end, %after, "lowered loop");
        after
    }

    fn lower_expr_stmt(&mut self, expr: &Expr, current: &mut NodeId, st: &mut Statement) {
        match expr {
            Expr::Call { callee, args } => {
                let args = self.hoist_args(args, current, st);
                self.emit_call(current, st, callee, args, None);
            }
            other => {
                let lowered = self.hoist_calls(other, current, st);
                self.emit(*current, st, InstrKind::Eval(lowered));
            }
        }
    }

    /// Replace every call in `expr` by a temporary, emitting the calls
    /// (innermost first) ahead of the statement.
    fn hoist_calls(&mut self, expr: &Expr, current: &mut NodeId, st: &mut Statement) -> Expr {
        if !expr.contains_call() {
            return expr.clone();
        }
        match expr {
            Expr::Call { callee, args } => {
                let args = self.hoist_args(args, current, st);
                let dest = self.next_temp;
                self.next_temp += 1;
                self.emit_call(current, st, callee, args, Some(dest));
                Expr::Temp(dest)
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.hoist_calls(lhs, current, st);
                let rhs = self.hoist_calls(rhs, current, st);
                Expr::binary(*op, lhs, rhs)
            }
            Expr::Unary { op, operand } => {
                let operand = self.hoist_calls(operand, current, st);
                Expr::unary(*op, operand)
            }
            // The value is evaluated before the target
            Expr::Assign { op, target, value } => {
                let value = self.hoist_calls(value, current, st);
                let target = self.hoist_calls(target, current, st);
                Expr::compound(*op, target, value)
            }
            Expr::Index { array, index } => {
                let array = self.hoist_calls(array, current, st);
                let index = self.hoist_calls(index, current, st);
                Expr::index(array, index)
            }
            Expr::Identifier(_) | Expr::Constant(_) | Expr::Temp(_) => expr.clone(),
        }
    }

    fn hoist_args(&mut self, args: &[Expr], current: &mut NodeId, st: &mut Statement) -> Vec<Expr> {
        let mut lowered = Vec::with_capacity(args.len());
        for arg in args {
            lowered.push(self.hoist_calls(arg, current, st));
        }
        lowered
    }

    fn emit(&mut self, node: NodeId, st: &mut Statement, kind: InstrKind) {
        self.cfg[node].block.push(Instr {
            line: st.line,
            kind,
            resumes: st.started,
        });
        st.started = true;
    }

    fn emit_call(
        &mut self,
        current: &mut NodeId,
        st: &mut Statement,
        callee: &str,
        args: Vec<Expr>,
        dest: Option<TempId>,
    ) {
        let kind = InstrKind::Call {
            callee: callee.to_string(),
            args,
            dest,
        };
        self.emit(*current, st, kind);
        let next = self.cfg.add_node();
        self.cfg.link(*current, next);
        *current = next;
    }
}
