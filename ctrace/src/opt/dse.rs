//! Dead-store elimination
//!
//! A store to a variable that no path reads again is replaced by whatever
//! side effects its right-hand side still has, or by a `Nop` that keeps the
//! statement's line. Globals and address-taken names are never dead.
//! A dead declarator keeps its binding and loses its initializer.

use super::liveness::{address_taken, Liveness, UseDef};
use super::OptimizationPass;
use crate::ast::{BinOp, Expr, UnOp, VarDecl};
use crate::cfg::{Cfg, Instr, InstrKind, NodeId};
use std::collections::HashSet;
use tracing::trace;

pub struct DeadStoreElimination;

impl OptimizationPass for DeadStoreElimination {
    fn name(&self) -> &'static str {
        "dead_store_elimination"
    }

    fn run_on_function(&self, cfg: &mut Cfg, entry: NodeId, globals: &HashSet<String>) -> bool {
        let liveness = Liveness::compute(cfg, entry);
        let nodes = cfg.reachable(entry);
        let mut pinned = address_taken(cfg, &nodes);
        pinned.extend(globals.iter().cloned());

        let mut changed = false;
        for id in nodes {
            let Some(block) = liveness.block(id) else {
                continue;
            };
            let mut live = block.live_out.clone();
            let node = &mut cfg[id];
            if let Some(pred) = &node.predicate {
                live.extend(UseDef::of_expr(&pred.expr).used);
            }

            // Built back to front, then reversed
            let mut rewritten = Vec::with_capacity(node.block.len());
            for instr in std::mem::take(&mut node.block).into_iter().rev() {
                if matches!(instr.kind, InstrKind::Return(_)) {
                    live.clear();
                }
                let dead = |name: &str| !live.contains(name) && !pinned.contains(name);
                let pieces = match eliminate(&instr.kind, dead) {
                    Some(kinds) => {
                        trace!(node = %id, line = instr.line, "eliminated dead store");
                        changed = true;
                        split(&instr, kinds)
                    }
                    None => vec![instr],
                };
                for piece in pieces.into_iter().rev() {
                    let ud = UseDef::of_instr(&piece.kind);
                    for name in &ud.defined {
                        live.remove(name);
                    }
                    live.extend(ud.used);
                    rewritten.push(piece);
                }
            }
            rewritten.reverse();
            node.block = rewritten;
        }
        changed
    }
}

/// Replacement for a statement that stores to a dead name, in execution
/// order. `None` when nothing stored is dead.
fn eliminate(kind: &InstrKind, dead: impl Fn(&str) -> bool) -> Option<Vec<InstrKind>> {
    match kind {
        InstrKind::Eval(Expr::Assign { target, value, .. }) => match target.as_ref() {
            Expr::Identifier(name) if dead(name) => Some(vec![remainder(side_effects(value))]),
            _ => None,
        },
        InstrKind::Eval(Expr::Unary {
            op: UnOp::Incr | UnOp::Decr,
            operand,
        }) => match operand.as_ref() {
            Expr::Identifier(name) if dead(name) => Some(vec![InstrKind::Nop]),
            _ => None,
        },
        InstrKind::Declare(vars) => {
            // A later initializer in the same declaration may read the name
            let mut read_later = HashSet::new();
            let mut dropped = vec![false; vars.len()];
            for (i, var) in vars.iter().enumerate().rev() {
                dropped[i] =
                    var.init.is_some() && dead(&var.name) && !read_later.contains(&var.name);
                if let Some(init) = &var.init {
                    read_later.extend(UseDef::of_expr(init).used);
                }
            }
            if !dropped.contains(&true) {
                return None;
            }

            // Effects of a dropped initializer run where it would have
            // been evaluated, between the surrounding declarators.
            let mut kinds = Vec::new();
            let mut group: Vec<VarDecl> = Vec::new();
            for (var, dropped) in vars.iter().zip(dropped) {
                match &var.init {
                    Some(init) if dropped => {
                        let effects = side_effects(init);
                        if !effects.is_empty() {
                            if !group.is_empty() {
                                kinds.push(InstrKind::Declare(std::mem::take(&mut group)));
                            }
                            kinds.push(InstrKind::Effects(effects));
                        }
                        group.push(VarDecl::new(&var.name, var.ty.clone()));
                    }
                    _ => group.push(var.clone()),
                }
            }
            if !group.is_empty() {
                kinds.push(InstrKind::Declare(group));
            }
            Some(kinds)
        }
        _ => None,
    }
}

/// One instruction per replacement kind, all on the original line. Every
/// piece after the first runs in the same step as the first.
fn split(instr: &Instr, kinds: Vec<InstrKind>) -> Vec<Instr> {
    kinds
        .into_iter()
        .enumerate()
        .map(|(i, kind)| Instr {
            line: instr.line,
            kind,
            resumes: instr.resumes || i > 0,
        })
        .collect()
}

fn remainder(effects: Vec<Expr>) -> InstrKind {
    if effects.is_empty() {
        InstrKind::Nop
    } else {
        InstrKind::Effects(effects)
    }
}

/// Maximal subexpressions of `expr` that can write the store or fault,
/// in evaluation order. Empty if `expr` is pure.
pub fn side_effects(expr: &Expr) -> Vec<Expr> {
    let mut out = Vec::new();
    collect(expr, &mut out);
    out
}

fn collect(expr: &Expr, out: &mut Vec<Expr>) {
    match expr {
        Expr::Identifier(_) | Expr::Constant(_) | Expr::Temp(_) => {}
        Expr::Binary {
            op: BinOp::Div | BinOp::Mod,
            ..
        } => out.push(expr.clone()),
        Expr::Binary { lhs, rhs, .. } => {
            collect(lhs, out);
            collect(rhs, out);
        }
        Expr::Unary {
            op: UnOp::Neg | UnOp::Plus | UnOp::AddrOf,
            operand,
        } => collect(operand, out),
        Expr::Unary { .. } | Expr::Assign { .. } | Expr::Index { .. } | Expr::Call { .. } => {
            out.push(expr.clone())
        }
    }
}
