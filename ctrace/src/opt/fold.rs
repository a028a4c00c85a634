//! Constant folding

use super::OptimizationPass;
use crate::ast::{Expr, Literal, UnOp};
use crate::cfg::{Cfg, InstrKind, NodeId};
use crate::interp::{binary_op, unary_op, Value};
use std::collections::HashSet;

/// Replace operator subtrees whose operands are all literals by the literal
/// they evaluate to. Subtrees that would fault at run time (`1 / 0`) are
/// left alone so the fault still happens on its line.
pub struct ConstantFolding;

impl OptimizationPass for ConstantFolding {
    fn name(&self) -> &'static str {
        "constant_folding"
    }

    fn run_on_function(&self, cfg: &mut Cfg, entry: NodeId, _globals: &HashSet<String>) -> bool {
        let mut changed = false;
        for id in cfg.reachable(entry) {
            let node = &mut cfg[id];
            for instr in &mut node.block {
                changed |= fold_instr(&mut instr.kind);
            }
            if let Some(pred) = &mut node.predicate {
                changed |= fold_expr(&mut pred.expr);
            }
        }
        changed
    }
}

fn fold_all<'a>(exprs: impl Iterator<Item = &'a mut Expr>) -> bool {
    exprs.fold(false, |changed, expr| fold_expr(expr) | changed)
}

fn fold_instr(kind: &mut InstrKind) -> bool {
    match kind {
        InstrKind::Declare(vars) => fold_all(vars.iter_mut().filter_map(|v| v.init.as_mut())),
        InstrKind::Eval(expr) => fold_expr(expr),
        InstrKind::Effects(exprs) | InstrKind::Call { args: exprs, .. } => fold_all(exprs.iter_mut()),
        InstrKind::Print {
            value: Some(expr), ..
        }
        | InstrKind::Return(Some(expr)) => fold_expr(expr),
        InstrKind::Print { value: None, .. } | InstrKind::Return(None) | InstrKind::Nop => false,
    }
}

/// Fold `expr` bottom-up in place. Returns true if anything was replaced.
pub fn fold_expr(expr: &mut Expr) -> bool {
    let mut changed = match expr {
        Expr::Binary { lhs, rhs, .. } => fold_expr(lhs) | fold_expr(rhs),
        Expr::Unary { operand, .. } => fold_expr(operand),
        Expr::Assign { target, value, .. } => fold_expr(target) | fold_expr(value),
        Expr::Index { array, index } => fold_expr(array) | fold_expr(index),
        Expr::Call { args, .. } => fold_all(args.iter_mut()),
        Expr::Identifier(_) | Expr::Constant(_) | Expr::Temp(_) => false,
    };
    if let Some(lit) = evaluate(expr) {
        *expr = Expr::Constant(lit);
        changed = true;
    }
    changed
}

fn evaluate(expr: &Expr) -> Option<Literal> {
    match expr {
        Expr::Binary { op, lhs, rhs } => {
            let lhs = Value::from(*lhs.as_literal()?);
            let rhs = Value::from(*rhs.as_literal()?);
            binary_op(*op, &lhs, &rhs).ok()?.to_literal()
        }
        Expr::Unary {
            op: op @ (UnOp::Neg | UnOp::Plus),
            operand,
        } => unary_op(*op, &Value::from(*operand.as_literal()?)).ok()?.to_literal(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinOp;

    #[test]
    fn test_fold_arithmetic() {
        let mut expr = Expr::binary(
            BinOp::Add,
            Expr::int(3),
            Expr::binary(BinOp::Mul, Expr::int(4), Expr::int(2)),
        );
        assert!(fold_expr(&mut expr));
        assert_eq!(expr, Expr::int(11));
    }

    #[test]
    fn test_fold_is_idempotent() {
        let mut expr = Expr::assign(
            Expr::ident("x"),
            Expr::binary(BinOp::Sub, Expr::ident("y"), Expr::unary(UnOp::Neg, Expr::int(2))),
        );
        assert!(fold_expr(&mut expr));
        let once = expr.clone();
        assert!(!fold_expr(&mut expr));
        assert_eq!(expr, once);
        assert_eq!(expr.to_string(), "x = (y - -2)");
    }

    #[test]
    fn test_division_by_zero_is_not_folded() {
        let mut expr = Expr::binary(BinOp::Div, Expr::int(1), Expr::int(0));
        assert!(!fold_expr(&mut expr));
        assert!(matches!(expr, Expr::Binary { op: BinOp::Div, .. }));
    }

    #[test]
    fn test_comparison_folds_to_bool() {
        let mut expr = Expr::binary(BinOp::Lt, Expr::float(1.5), Expr::int(2));
        fold_expr(&mut expr);
        assert_eq!(expr, Expr::Constant(Literal::Bool(true)));
    }

    #[test]
    fn test_update_operators_are_kept() {
        let mut expr = Expr::unary(UnOp::Incr, Expr::ident("i"));
        assert!(!fold_expr(&mut expr));
    }
}
