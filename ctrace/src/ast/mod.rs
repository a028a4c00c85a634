//! Abstract Syntax Tree definitions
//!
//! The tree is produced by an external parser and handed over as a
//! [`TranslationUnit`]. Every statement carries the source line it starts on.

mod expr;
mod types;

pub use expr::*;
pub use types::*;

use serde::{Deserialize, Serialize};

/// A program is a sequence of top-level declarations and function definitions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub items: Vec<Item>,
}

impl TranslationUnit {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(def) => Some(def),
            Item::Declaration(_) => None,
        })
    }
}

/// Top-level item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Item {
    Declaration(Declaration),
    Function(FunctionDef),
}

/// Global declaration statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub vars: Vec<VarDecl>,
    pub line: u32,
}

/// Function definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub return_type: Type,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    /// Line of the function header
    pub line: u32,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

impl Param {
    pub fn new(name: &str, ty: Type) -> Self {
        Self {
            name: name.to_string(),
            ty,
        }
    }
}

/// One declarator: `int x = 3` declares `x` of type int with an initializer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub ty: Type,
    pub init: Option<Expr>,
}

impl VarDecl {
    pub fn new(name: &str, ty: Type) -> Self {
        Self {
            name: name.to_string(),
            ty,
            init: None,
        }
    }

    pub fn with_init(mut self, init: Expr) -> Self {
        self.init = Some(init);
        self
    }
}

impl std::fmt::Display for VarDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.ty, self.name)?;
        if let Some(init) = &self.init {
            write!(f, " = {init}")?;
        }
        Ok(())
    }
}

/// Statement with its source line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: u32,
}

/// Statement kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// Local declaration
    Declaration(Vec<VarDecl>),

    /// Expression statement (assignments, calls, `i++`)
    Expr(Expr),

    /// if / else
    Selection {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },

    /// while / for
    Iteration(Loop),

    /// Braced statement sequence
    Body(Vec<Stmt>),

    /// printf(format[, value])
    Print { format: String, value: Option<Expr> },

    /// return [value]
    Return(Option<Expr>),
}

/// Loop forms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Loop {
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    For {
        init: Option<Expr>,
        cond: Expr,
        step: Option<Expr>,
        body: Vec<Stmt>,
    },
}

impl Stmt {
    pub fn new(line: u32, kind: StmtKind) -> Self {
        Self { kind, line }
    }

    pub fn declare(line: u32, vars: Vec<VarDecl>) -> Self {
        Self::new(line, StmtKind::Declaration(vars))
    }

    pub fn expr(line: u32, expr: Expr) -> Self {
        Self::new(line, StmtKind::Expr(expr))
    }

    pub fn print(line: u32, format: &str, value: Option<Expr>) -> Self {
        Self::new(
            line,
            StmtKind::Print {
                format: format.to_string(),
                value,
            },
        )
    }

    pub fn ret(line: u32, value: Option<Expr>) -> Self {
        Self::new(line, StmtKind::Return(value))
    }

    pub fn if_else(line: u32, cond: Expr, then_body: Vec<Stmt>, else_body: Option<Vec<Stmt>>) -> Self {
        Self::new(
            line,
            StmtKind::Selection {
                cond,
                then_body,
                else_body,
            },
        )
    }

    pub fn while_loop(line: u32, cond: Expr, body: Vec<Stmt>) -> Self {
        Self::new(line, StmtKind::Iteration(Loop::While { cond, body }))
    }

    pub fn for_loop(
        line: u32,
        init: Option<Expr>,
        cond: Expr,
        step: Option<Expr>,
        body: Vec<Stmt>,
    ) -> Self {
        Self::new(
            line,
            StmtKind::Iteration(Loop::For {
                init,
                cond,
                step,
                body,
            }),
        )
    }
}
