//! Expression AST nodes

use serde::{Deserialize, Serialize};

/// Identifier of a compiler temporary introduced while lowering calls
pub type TempId = u32;

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Variable reference
    Identifier(String),

    /// Literal value
    Constant(Literal),

    /// Binary operation
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Unary operation (including `++`, `--`, `*` and `&`)
    Unary { op: UnOp, operand: Box<Expr> },

    /// Assignment: target op= value
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },

    /// Array index: array[index]
    Index { array: Box<Expr>, index: Box<Expr> },

    /// Function call
    Call { callee: String, args: Vec<Expr> },

    /// Result slot of a hoisted call. Produced by graph lowering only; a
    /// parser never emits it.
    Temp(TempId),
}

impl Expr {
    pub fn ident(name: &str) -> Self {
        Expr::Identifier(name.to_string())
    }

    pub fn int(value: i64) -> Self {
        Expr::Constant(Literal::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Expr::Constant(Literal::Float(value))
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn unary(op: UnOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Expr::compound(AssignOp::Assign, target, value)
    }

    pub fn compound(op: AssignOp, target: Expr, value: Expr) -> Self {
        Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    pub fn index(array: Expr, index: Expr) -> Self {
        Expr::Index {
            array: Box::new(array),
            index: Box::new(index),
        }
    }

    pub fn call(callee: &str, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: callee.to_string(),
            args,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expr::Constant(lit) => Some(lit),
            _ => None,
        }
    }

    /// True if a call appears anywhere in this tree
    pub fn contains_call(&self) -> bool {
        match self {
            Expr::Call { .. } => true,
            Expr::Identifier(_) | Expr::Constant(_) | Expr::Temp(_) => false,
            Expr::Binary { lhs, rhs, .. } => lhs.contains_call() || rhs.contains_call(),
            Expr::Unary { operand, .. } => operand.contains_call(),
            Expr::Assign { target, value, .. } => target.contains_call() || value.contains_call(),
            Expr::Index { array, index } => array.contains_call() || index.contains_call(),
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Identifier(name) => write!(f, "{name}"),
            Expr::Constant(lit) => write!(f, "{lit}"),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Expr::Unary { op, operand } => write!(f, "{op}{operand}"),
            Expr::Assign { op, target, value } => write!(f, "{target} {op} {value}"),
            Expr::Index { array, index } => write!(f, "{array}[{index}]"),
            Expr::Call { callee, args } => {
                write!(f, "{callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expr::Temp(id) => write!(f, "%t{id}"),
        }
    }
}

/// Literal constant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    /// Only produced by folding comparisons
    Bool(bool),
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Float(x) => write!(f, "{x:?}"),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl BinOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge | BinOp::Eq | BinOp::Ne
        )
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
            BinOp::Mod => write!(f, "%"),
            BinOp::Lt => write!(f, "<"),
            BinOp::Gt => write!(f, ">"),
            BinOp::Le => write!(f, "<="),
            BinOp::Ge => write!(f, ">="),
            BinOp::Eq => write!(f, "=="),
            BinOp::Ne => write!(f, "!="),
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnOp {
    /// Negation (-)
    Neg,
    /// Unary plus (+)
    Plus,
    /// Increment in place (++)
    Incr,
    /// Decrement in place (--)
    Decr,
    /// Dereference (*)
    Deref,
    /// Address-of (&)
    AddrOf,
}

impl UnOp {
    /// Operators that write back to their operand
    pub fn is_update(&self) -> bool {
        matches!(self, UnOp::Incr | UnOp::Decr)
    }
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnOp::Neg => write!(f, "-"),
            UnOp::Plus => write!(f, "+"),
            UnOp::Incr => write!(f, "++"),
            UnOp::Decr => write!(f, "--"),
            UnOp::Deref => write!(f, "*"),
            UnOp::AddrOf => write!(f, "&"),
        }
    }
}

/// Assignment operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignOp {
    /// =
    Assign,
    /// +=
    AddAssign,
    /// -=
    SubAssign,
}

impl AssignOp {
    /// Arithmetic applied before storing, for compound forms
    pub fn binop(&self) -> Option<BinOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinOp::Add),
            AssignOp::SubAssign => Some(BinOp::Sub),
        }
    }
}

impl std::fmt::Display for AssignOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignOp::Assign => write!(f, "="),
            AssignOp::AddAssign => write!(f, "+="),
            AssignOp::SubAssign => write!(f, "-="),
        }
    }
}
