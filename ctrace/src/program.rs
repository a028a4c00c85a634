//! Function table and the lowered program

use crate::ast::{Declaration, FunctionDef, Item, Stmt, StmtKind, TranslationUnit, Type, VarDecl};
use crate::cfg::{Cfg, CfgBuilder, NodeId};
use crate::error::{Error, Result};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Static description of one function. Activations get their own frames;
/// nothing here changes while the program runs.
#[derive(Debug, Clone)]
pub struct FunctionEntry {
    pub name: String,
    pub return_type: Type,
    pub param_types: Vec<Type>,
    pub param_names: Vec<String>,
    /// Line of the function header
    pub line: u32,
    pub entry: NodeId,
    /// Lines that carry at least one instruction of this function
    lines: BTreeSet<u32>,
}

impl FunctionEntry {
    pub fn arity(&self) -> usize {
        self.param_names.len()
    }

    pub fn params(&self) -> impl Iterator<Item = (&String, &Type)> {
        self.param_names.iter().zip(self.param_types.iter())
    }

    /// First line strictly between `after` and `before` that holds no
    /// instruction of this function.
    pub fn gap_line(&self, after: u32, before: u32) -> Option<u32> {
        (after.saturating_add(1)..before).find(|line| !self.lines.contains(line))
    }
}

/// Name to function. Exactly one entry per name.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    entries: HashMap<String, FunctionEntry>,
}

impl FunctionTable {
    pub fn insert(&mut self, entry: FunctionEntry) -> Result<()> {
        if self.entries.contains_key(&entry.name) {
            return Err(Error::build(
                format!("function `{}` is defined more than once", entry.name),
                entry.line,
            ));
        }
        self.entries.insert(entry.name.clone(), entry);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FunctionEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by defining line
    pub fn in_source_order(&self) -> Vec<&FunctionEntry> {
        let mut entries: Vec<&FunctionEntry> = self.entries.values().collect();
        entries.sort_by_key(|e| (e.line, e.name.clone()));
        entries
    }
}

/// Lowered program: one graph arena shared by all functions
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub cfg: Cfg,
    pub functions: FunctionTable,
    /// Global declarations in source order
    pub globals: Vec<Declaration>,
}

impl Program {
    /// Lower every function of `unit` into the graph.
    pub fn build(unit: &TranslationUnit) -> Result<Self> {
        let mut program = Program::default();
        for item in &unit.items {
            match item {
                Item::Declaration(decl) => {
                    for var in &decl.vars {
                        if var.init.as_ref().is_some_and(|e| e.contains_call()) {
                            return Err(Error::build(
                                format!("initializer of global `{}` calls a function", var.name),
                                decl.line,
                            ));
                        }
                        check_variable_type(&var.ty, &var.name, decl.line)?;
                    }
                    program.globals.push(decl.clone());
                }
                Item::Function(def) => {
                    let entry = program.lower_function(def)?;
                    program.functions.insert(entry)?;
                }
            }
        }
        Ok(program)
    }

    fn lower_function(&mut self, def: &FunctionDef) -> Result<FunctionEntry> {
        if let Type::Array(..) = def.return_type {
            return Err(Error::build(
                format!("function `{}` cannot return an array", def.name),
                def.line,
            ));
        }

        let mut param_types = Vec::with_capacity(def.params.len());
        for param in &def.params {
            let ty = param.ty.decayed();
            check_variable_type(&ty, &param.name, def.line)?;
            param_types.push(ty);
        }
        check_declarations(&def.body)?;

        let graph = CfgBuilder::new(&mut self.cfg).build(&def.body);

        let lines = self
            .cfg
            .reachable(graph.entry)
            .into_iter()
            .flat_map(|id| self.cfg[id].block.iter().map(|instr| instr.line))
            .collect();

        debug!(
            function = %def.name,
            entry = %graph.entry,
            nodes = self.cfg.reachable(graph.entry).len(),
            "built function graph"
        );

        Ok(FunctionEntry {
            name: def.name.clone(),
            return_type: def.return_type.clone(),
            param_types,
            param_names: def.params.iter().map(|p| p.name.clone()).collect(),
            line: def.line,
            entry: graph.entry,
            lines,
        })
    }

    pub fn function(&self, name: &str) -> Option<&FunctionEntry> {
        self.functions.get(name)
    }

    pub fn global_names(&self) -> impl Iterator<Item = &str> {
        self.globals
            .iter()
            .flat_map(|decl| decl.vars.iter().map(|v| v.name.as_str()))
    }

    /// Text listing of every function graph
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in self.functions.in_source_order() {
            out.push_str(&format!(
                "fn {}({}) -> {}  [line {}]\n",
                entry.name,
                entry
                    .params()
                    .map(|(name, ty)| format!("{ty} {name}"))
                    .collect::<Vec<_>>()
                    .join(", "),
                entry.return_type,
                entry.line
            ));
            out.push_str(&self.cfg.render(entry.entry));
        }
        out
    }
}

fn check_variable_type(ty: &Type, name: &str, line: u32) -> Result<()> {
    match ty {
        Type::Void => Err(Error::build(format!("variable `{name}` declared void"), line)),
        Type::Array(element, _) if element.is_array() => Err(Error::build(
            format!("`{name}`: arrays of arrays are not supported"),
            line,
        )),
        Type::Array(element, _) | Type::Pointer(element) if **element == Type::Void => Err(
            Error::build(format!("`{name}`: void element type"), line),
        ),
        Type::Pointer(inner) if !matches!(**inner, Type::Int | Type::Float) => Err(Error::build(
            format!("`{name}`: only pointers to int or float are supported"),
            line,
        )),
        _ => Ok(()),
    }
}

/// Check the type of every variable declared anywhere in `stmts`
fn check_declarations(stmts: &[Stmt]) -> Result<()> {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::Declaration(vars) => {
                for VarDecl { name, ty, .. } in vars {
                    check_variable_type(ty, name, stmt.line)?;
                }
            }
            StmtKind::Body(body) => check_declarations(body)?,
            StmtKind::Selection {
                then_body,
                else_body,
                ..
            } => {
                check_declarations(then_body)?;
                if let Some(else_body) = else_body {
                    check_declarations(else_body)?;
                }
            }
            StmtKind::Iteration(lp) => match lp {
                crate::ast::Loop::While { body, .. } | crate::ast::Loop::For { body, .. } => {
                    check_declarations(body)?
                }
            },
            StmtKind::Expr(_) | StmtKind::Print { .. } | StmtKind::Return(_) => {}
        }
    }
    Ok(())
}
