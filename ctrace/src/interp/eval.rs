//! Stepping evaluator
//!
//! The interpreter owns the program counter and advances it one source line
//! per [`Interpreter::step`]. After every executed statement the counter is
//! settled: exhausted and empty nodes are crossed and branch predicates
//! evaluated until it rests on the next pending statement, so a step always
//! ends on an executable line.
//!
//! A step is all or nothing: if any part of it fails, the store, the call
//! stack, the output and the counter are put back as they were before it.

use super::error::{InterpResult, RuntimeError};
use super::frame::{Frame, Symbol};
use super::stack::{CallContext, CallStack};
use super::store::{Address, ValueStore};
use super::value::{binary_op, unary_op, Value};
use crate::ast::{BinOp, Expr, TempId, Type, UnOp, VarDecl};
use crate::cfg::{Instr, InstrKind, NodeId, ProgramCounter};
use crate::config::SessionConfig;
use crate::program::Program;
use tracing::{debug, trace};

/// Effect of one instruction on control flow
enum Transfer {
    Next,
    /// Entered a callee at this position
    Enter(ProgramCounter),
    /// Left the current function; `None` when the entry function returned
    Leave(Option<ProgramCounter>),
}

/// How a node hands over control once its block is exhausted
enum Exit {
    Branch(Expr, NodeId, NodeId),
    Goto(NodeId),
    Terminal,
}

/// Storage location designated by an expression
enum Place {
    Cell { addr: Address, ty: Option<Type> },
    Element { addr: Address, index: usize, ty: Option<Type> },
    Temp(TempId),
}

/// The interpreter
pub struct Interpreter {
    program: Program,
    store: ValueStore,
    globals: Frame,
    stack: CallStack,
    /// Next statement to execute; `None` before start and after the end
    pc: Option<ProgramCounter>,
    /// Everything printed so far
    output: String,
    fill_gaps: bool,
    settle_limit: usize,
    max_call_depth: usize,
}

impl Interpreter {
    /// Create an interpreter and run the global declarations.
    pub fn new(program: Program, config: &SessionConfig) -> InterpResult<Self> {
        let mut interp = Interpreter {
            program,
            store: ValueStore::new(),
            globals: Frame::global(),
            stack: CallStack::new(),
            pc: None,
            output: String::new(),
            fill_gaps: config.fill_gaps,
            settle_limit: config.settle_limit.max(1),
            max_call_depth: config.max_call_depth.max(1),
        };
        let globals = interp.program.globals.clone();
        for decl in &globals {
            interp.declare(&decl.vars, decl.line)?;
        }
        Ok(interp)
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.stack
    }

    pub fn globals(&self) -> &Frame {
        &self.globals
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn pc(&self) -> Option<ProgramCounter> {
        self.pc
    }

    /// Enter `function` as the outermost activation and position the
    /// counter on its first line.
    pub fn start(&mut self, function: &str) -> InterpResult<Option<ProgramCounter>> {
        self.atomically(|interp| interp.enter_main(function))
    }

    fn enter_main(&mut self, function: &str) -> InterpResult<Option<ProgramCounter>> {
        if !self.stack.is_empty() {
            return Err(RuntimeError::stack_inconsistency("program already started"));
        }
        let entry = self
            .program
            .function(function)
            .ok_or_else(|| RuntimeError::undefined_function(function))?;
        let params: Vec<(String, Type)> = entry
            .params()
            .map(|(name, ty)| (name.clone(), ty.clone()))
            .collect();
        let (target, line) = (entry.entry, entry.line);

        let mut frame = Frame::new(function, self.store.len());
        for (name, ty) in &params {
            frame.declare(&mut self.store, name, ty, None, line)?;
        }
        self.stack.push(CallContext {
            function: function.to_string(),
            calling_line: line,
            frame,
            return_to: None,
            dest: None,
            high_line: line,
        });
        debug!(function, "program started");

        let mut transferred = false;
        let pc = self.settle(ProgramCounter::at(target), &mut transferred)?;
        self.pc = pc.map(|pc| self.with_gap(pc));
        Ok(self.pc)
    }

    /// Execute one source line. Returns the next program counter, or `None`
    /// once the program has ended.
    ///
    /// On error nothing the step did is kept, so the counter is back where
    /// the step began.
    pub fn step(&mut self) -> InterpResult<Option<ProgramCounter>> {
        self.atomically(Self::advance)
    }

    fn advance(&mut self) -> InterpResult<Option<ProgramCounter>> {
        let Some(pc) = self.pc else {
            return Ok(None);
        };

        if let Some(line) = pc.pending_nop {
            trace!(line, "no-op");
            self.mark_line(line);
            let resume = self.with_gap(ProgramCounter {
                pending_nop: None,
                ..pc
            });
            self.pc = Some(resume);
            return Ok(self.pc);
        }

        let mut transferred = false;
        let Some(mut pc) = self.settle(pc, &mut transferred)? else {
            return Ok(None);
        };

        loop {
            let instr = self
                .program
                .cfg
                .instr_at(pc)
                .cloned()
                .ok_or_else(|| RuntimeError::stack_inconsistency("counter points past its node"))?;
            trace!(line = instr.line, node = %pc.node, "{}", instr.kind);
            self.mark_line(instr.line);

            let next = match self.exec(&instr, pc)? {
                Transfer::Next => pc.advanced(),
                Transfer::Enter(target) | Transfer::Leave(Some(target)) => {
                    transferred = true;
                    target
                }
                Transfer::Leave(None) => {
                    self.pc = None;
                    return Ok(None);
                }
            };
            self.pc = Some(next);

            let Some(next) = self.settle(next, &mut transferred)? else {
                return Ok(None);
            };
            self.pc = Some(next);

            // The rest of a line interrupted by a call runs in the same step
            if self.program.cfg.instr_at(next).is_some_and(|i| i.resumes) {
                pc = next;
                continue;
            }

            let next = if transferred { next } else { self.with_gap(next) };
            self.pc = Some(next);
            return Ok(Some(next));
        }
    }

    /// Source line the next step executes
    pub fn current_line(&self) -> Option<u32> {
        let pc = self.pc?;
        if let Some(line) = pc.pending_nop {
            return Some(line);
        }
        let node = &self.program.cfg[pc.node];
        node.block
            .get(pc.cursor)
            .map(|instr| instr.line)
            .or_else(|| node.predicate.as_ref().map(|p| p.line))
    }

    /// Abandon the run: drop every activation and free its cells.
    pub fn halt(&mut self) {
        let frames = self.stack.unwind();
        if let Some(outermost) = frames.last() {
            if let Ok(freed) = self.store.free_from(outermost.base()) {
                debug!(freed, "halted");
            }
        }
        self.pc = None;
    }

    /// Resolve `name` in the active frame, falling back to the globals.
    pub fn resolve(&self, name: &str) -> Option<(Address, &Symbol)> {
        self.stack
            .top()
            .and_then(|ctx| ctx.frame.lookup(name))
            .or_else(|| self.globals.lookup(name))
    }

    /// Run `f`, undoing all of its effects if it fails.
    fn atomically<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> InterpResult<T>,
    ) -> InterpResult<T> {
        let pc = self.pc;
        let printed = self.output.len();
        self.store.begin();
        self.stack.begin();

        let result = f(self);
        if let Err(err) = &result {
            trace!(error = %err, "rolling back step");
            self.stack.rollback();
            self.store.rollback();
            self.output.truncate(printed);
            self.pc = pc;
        } else {
            self.stack.commit();
            self.store.commit();
        }
        result
    }

    // ========================================================================
    // Control flow
    // ========================================================================

    /// Move `pc` forward until it rests on a pending instruction. Crosses
    /// empty nodes, evaluates predicates and returns from functions whose
    /// terminal node is reached.
    fn settle(
        &mut self,
        mut pc: ProgramCounter,
        transferred: &mut bool,
    ) -> InterpResult<Option<ProgramCounter>> {
        for _ in 0..self.settle_limit {
            let exit = {
                let node = &self.program.cfg[pc.node];
                if pc.cursor < node.block.len() {
                    return Ok(Some(pc));
                }
                match (&node.predicate, node.successors.as_slice()) {
                    (Some(pred), [on_true, on_false]) => {
                        Exit::Branch(pred.expr.clone(), *on_true, *on_false)
                    }
                    (None, [next]) => Exit::Goto(*next),
                    (None, []) => Exit::Terminal,
                    (_, successors) => unreachable!(
                        "malformed node {}: predicate {}, {} successors",
                        pc.node,
                        node.predicate.is_some(),
                        successors.len()
                    ),
                }
            };
            self.pc = Some(pc);

            pc = match exit {
                Exit::Branch(expr, on_true, on_false) => {
                    let taken = self.eval_predicate(&expr)?;
                    trace!(node = %pc.node, taken, "branch");
                    ProgramCounter::at(if taken { on_true } else { on_false })
                }
                Exit::Goto(next) => ProgramCounter::at(next),
                Exit::Terminal => {
                    *transferred = true;
                    match self.leave(None)? {
                        Some(resume) => resume,
                        None => {
                            self.pc = None;
                            return Ok(None);
                        }
                    }
                }
            };
        }
        Err(RuntimeError::no_progress(self.settle_limit))
    }

    fn eval_predicate(&mut self, expr: &Expr) -> InterpResult<bool> {
        let line = self.current_line().unwrap_or_default();
        match self.eval(expr, line)? {
            Value::Bool(taken) => Ok(taken),
            other => Err(RuntimeError::non_boolean_predicate(other.type_name())),
        }
    }

    fn exec(&mut self, instr: &Instr, pc: ProgramCounter) -> InterpResult<Transfer> {
        let line = instr.line;
        match &instr.kind {
            InstrKind::Declare(vars) => self.declare(vars, line)?,
            InstrKind::Eval(expr) => {
                self.eval(expr, line)?;
            }
            InstrKind::Effects(exprs) => {
                for expr in exprs {
                    self.eval(expr, line)?;
                }
            }
            InstrKind::Print { format, value } => {
                let value = match value {
                    Some(expr) => Some(self.eval(expr, line)?),
                    None => None,
                };
                let text = format_output(format, value.as_ref())?;
                trace!(line, text = %text.escape_debug(), "print");
                self.output.push_str(&text);
            }
            InstrKind::Return(value) => {
                let value = match value {
                    Some(expr) => Some(self.eval(expr, line)?),
                    None => None,
                };
                return Ok(Transfer::Leave(self.leave(value)?));
            }
            InstrKind::Call { callee, args, dest } => {
                return self.call(callee, args, *dest, pc, line);
            }
            InstrKind::Nop => {}
        }
        Ok(Transfer::Next)
    }

    /// Evaluate arguments in the caller, then push a fresh activation.
    fn call(
        &mut self,
        callee: &str,
        args: &[Expr],
        dest: Option<TempId>,
        pc: ProgramCounter,
        line: u32,
    ) -> InterpResult<Transfer> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, line)?);
        }

        let entry = self
            .program
            .function(callee)
            .ok_or_else(|| RuntimeError::undefined_function(callee))?;
        if entry.arity() != values.len() {
            return Err(RuntimeError::arity_mismatch(callee, entry.arity(), values.len()));
        }
        if self.stack.depth() >= self.max_call_depth {
            return Err(RuntimeError::stack_overflow(self.max_call_depth));
        }
        let params: Vec<(String, Type)> = entry
            .params()
            .map(|(name, ty)| (name.clone(), ty.clone()))
            .collect();
        let (target, def_line) = (entry.entry, entry.line);

        let mut frame = Frame::new(callee, self.store.len());
        for ((name, ty), value) in params.iter().zip(values) {
            if let Err(err) = frame.declare(&mut self.store, name, ty, Some(value), def_line) {
                frame.release(&mut self.store)?;
                return Err(err);
            }
        }
        self.stack.push(CallContext {
            function: callee.to_string(),
            calling_line: line,
            frame,
            return_to: Some(pc.advanced()),
            dest,
            high_line: def_line,
        });
        debug!(function = callee, depth = self.stack.depth(), line, "call");
        Ok(Transfer::Enter(ProgramCounter::at(target)))
    }

    /// Pop the active call, free its frame and hand the result to the caller.
    fn leave(&mut self, value: Option<Value>) -> InterpResult<Option<ProgramCounter>> {
        let function = self
            .stack
            .top()
            .map(|ctx| ctx.function.clone())
            .ok_or_else(|| RuntimeError::stack_inconsistency("return with an empty call stack"))?;
        let return_type = self
            .program
            .function(&function)
            .map(|entry| entry.return_type.clone())
            .ok_or_else(|| RuntimeError::undefined_function(&function))?;
        let value = match (value, &return_type) {
            (Some(v), Type::Void) => {
                return Err(RuntimeError::type_error("no return value", v.type_name()));
            }
            (Some(v), ty) => Some(v.coerce_to(ty)?),
            (None, _) => None,
        };

        let ctx = self
            .stack
            .pop()
            .ok_or_else(|| RuntimeError::stack_inconsistency("return with an empty call stack"))?;
        let freed = ctx.frame.release(&mut self.store)?;
        debug!(function = %ctx.function, freed, "return");

        if let (Some(dest), Some(value)) = (ctx.dest, value) {
            let caller = self.stack.top_mut().ok_or_else(|| {
                RuntimeError::stack_inconsistency("call result without a caller")
            })?;
            caller.frame.store_temp(dest, value);
        }
        Ok(ctx.return_to)
    }

    fn mark_line(&mut self, line: u32) {
        if let Some(ctx) = self.stack.top_mut() {
            ctx.high_line = ctx.high_line.max(line);
        }
    }

    /// Schedule a no-op for the first skipped line between the highest line
    /// this activation has executed and the line `pc` is about to run.
    fn with_gap(&self, pc: ProgramCounter) -> ProgramCounter {
        if !self.fill_gaps {
            return pc;
        }
        let (Some(ctx), Some(instr)) = (self.stack.top(), self.program.cfg.instr_at(pc)) else {
            return pc;
        };
        let gap = self
            .program
            .function(&ctx.function)
            .and_then(|entry| entry.gap_line(ctx.high_line, instr.line));
        ProgramCounter {
            pending_nop: gap,
            ..pc
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn declare(&mut self, vars: &[VarDecl], line: u32) -> InterpResult<()> {
        for var in vars {
            let init = match &var.init {
                Some(expr) => Some(self.eval(expr, line)?),
                None => None,
            };
            let (frame, store) = self.active_frame_mut();
            frame.declare(store, &var.name, &var.ty, init, line)?;
        }
        Ok(())
    }

    fn eval(&mut self, expr: &Expr, line: u32) -> InterpResult<Value> {
        match expr {
            Expr::Constant(lit) => Ok(Value::from(*lit)),

            Expr::Identifier(name) => {
                let (addr, symbol) = self
                    .resolve(name)
                    .ok_or_else(|| RuntimeError::undefined_variable(name))?;
                // Arrays decay to a pointer to their cell
                if symbol.ty.is_array() {
                    return Ok(Value::Pointer(addr));
                }
                self.read(&Place::Cell { addr, ty: None }, name)
            }

            Expr::Temp(id) => self.read(&Place::Temp(*id), ""),

            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs, line)?;
                let rhs = self.eval(rhs, line)?;
                binary_op(*op, &lhs, &rhs)
            }

            Expr::Unary { op, operand } => match op {
                UnOp::Neg | UnOp::Plus => {
                    let value = self.eval(operand, line)?;
                    unary_op(*op, &value)
                }
                UnOp::Incr | UnOp::Decr => {
                    let place = self.place(operand, line)?;
                    let current = self.read(&place, &operand.to_string())?;
                    let op = if *op == UnOp::Incr { BinOp::Add } else { BinOp::Sub };
                    let updated = binary_op(op, &current, &Value::Int(1))?;
                    self.write(&place, updated, line)
                }
                UnOp::Deref => {
                    let place = self.place(expr, line)?;
                    self.read(&place, &expr.to_string())
                }
                UnOp::AddrOf => self.address_of(operand, line),
            },

            Expr::Assign { op, target, value } => {
                let value = self.eval(value, line)?;
                let place = self.place(target, line)?;
                let value = match op.binop() {
                    Some(op) => {
                        let current = self.read(&place, &target.to_string())?;
                        binary_op(op, &current, &value)?
                    }
                    None => value,
                };
                self.write(&place, value, line)
            }

            Expr::Index { .. } => {
                let place = self.place(expr, line)?;
                self.read(&place, &expr.to_string())
            }

            Expr::Call { callee, .. } => Err(RuntimeError::stack_inconsistency(&format!(
                "call to {callee} was not lowered into a call instruction"
            ))),
        }
    }

    fn address_of(&mut self, operand: &Expr, line: u32) -> InterpResult<Value> {
        match operand {
            Expr::Identifier(name) => {
                let (addr, _) = self
                    .resolve(name)
                    .ok_or_else(|| RuntimeError::undefined_variable(name))?;
                Ok(Value::Pointer(addr))
            }
            Expr::Unary {
                op: UnOp::Deref,
                operand,
            } => self.eval(operand, line),
            other => Err(RuntimeError::type_error(
                "variable",
                &format!("`{other}` (not addressable)"),
            )),
        }
    }

    /// Resolve an l-value
    fn place(&mut self, expr: &Expr, line: u32) -> InterpResult<Place> {
        match expr {
            Expr::Identifier(name) => {
                let (addr, symbol) = self
                    .resolve(name)
                    .ok_or_else(|| RuntimeError::undefined_variable(name))?;
                if symbol.ty.is_array() {
                    return Err(RuntimeError::invalid_lvalue(&format!("array `{name}`")));
                }
                Ok(Place::Cell {
                    addr,
                    ty: Some(symbol.ty.clone()),
                })
            }
            Expr::Temp(id) => Ok(Place::Temp(*id)),
            Expr::Unary {
                op: UnOp::Deref,
                operand,
            } => {
                let pointer = self.eval(operand, line)?;
                let addr = pointer
                    .as_pointer()
                    .ok_or_else(|| RuntimeError::type_error("pointer", pointer.type_name()))?;
                let ty = self.static_type(operand).and_then(|t| t.pointee().cloned());
                self.pointee(addr, 0, ty)
            }
            Expr::Index { array, index } => {
                let base = self.eval(array, line)?;
                let addr = base
                    .as_pointer()
                    .ok_or_else(|| RuntimeError::type_error("array", base.type_name()))?;
                let index = self.eval(index, line)?;
                let i = index
                    .as_int()
                    .ok_or_else(|| RuntimeError::type_error("int index", index.type_name()))?;
                let ty = self.static_type(array).and_then(|t| t.pointee().cloned());
                self.pointee(addr, i, ty)
            }
            other => Err(RuntimeError::invalid_lvalue(&other.to_string())),
        }
    }

    /// Place reached through a pointer. A pointer to an array cell reaches
    /// its elements; a pointer to a scalar only admits index 0.
    fn pointee(&self, addr: Address, index: i64, ty: Option<Type>) -> InterpResult<Place> {
        let cell = self.store.cell(addr).ok_or_else(|| {
            RuntimeError::stack_inconsistency(&format!("{addr} is outside the store"))
        })?;
        match cell.value() {
            Some(Value::Array(items)) => match usize::try_from(index) {
                Ok(i) if i < items.len() => Ok(Place::Element { addr, index: i, ty }),
                _ => Err(RuntimeError::index_out_of_bounds(index, items.len())),
            },
            _ if index == 0 => Ok(Place::Cell { addr, ty }),
            _ => Err(RuntimeError::index_out_of_bounds(index, 1)),
        }
    }

    /// Declared type of an expression, where it can be read off the symbols
    fn static_type(&self, expr: &Expr) -> Option<Type> {
        match expr {
            Expr::Identifier(name) => self.resolve(name).map(|(_, symbol)| symbol.ty.clone()),
            Expr::Unary {
                op: UnOp::Deref,
                operand,
            } => self.static_type(operand)?.pointee().cloned(),
            Expr::Unary {
                op: UnOp::AddrOf,
                operand,
            } => self.static_type(operand).map(Type::pointer_to),
            Expr::Index { array, .. } => self.static_type(array)?.pointee().cloned(),
            _ => None,
        }
    }

    fn read(&mut self, place: &Place, what: &str) -> InterpResult<Value> {
        match place {
            Place::Cell { addr, .. } => {
                let cell = self.store.cell(*addr).ok_or_else(|| {
                    RuntimeError::stack_inconsistency(&format!("{addr} is outside the store"))
                })?;
                cell.value()
                    .cloned()
                    .ok_or_else(|| RuntimeError::uninitialized(what))
            }
            Place::Element { addr, index, .. } => match self.store.cell(*addr).and_then(|c| c.value()) {
                Some(Value::Array(items)) => items
                    .get(*index)
                    .cloned()
                    .flatten()
                    .ok_or_else(|| RuntimeError::uninitialized(what)),
                _ => Err(RuntimeError::stack_inconsistency(&format!("{addr} holds no array"))),
            },
            Place::Temp(id) => {
                let (frame, _) = self.active_frame_mut();
                frame
                    .take_temp(*id)
                    .ok_or_else(|| RuntimeError::void_value(&format!("call %t{id}")))
            }
        }
    }

    /// Store `value` (coerced to the place's type) and return what was stored.
    /// Array elements are written by copying the whole array, so the
    /// array's cell records one history entry per element write.
    fn write(&mut self, place: &Place, value: Value, line: u32) -> InterpResult<Value> {
        match place {
            Place::Cell { addr, ty } => {
                let value = match ty {
                    Some(ty) => value.coerce_to(ty)?,
                    None => value,
                };
                self.store.set(*addr, value.clone(), line)?;
                Ok(value)
            }
            Place::Element { addr, index, ty } => {
                let value = match ty {
                    Some(ty) => value.coerce_to(ty)?,
                    None => value,
                };
                let mut items = match self.store.cell(*addr).and_then(|c| c.value()) {
                    Some(Value::Array(items)) => items.clone(),
                    _ => {
                        return Err(RuntimeError::stack_inconsistency(&format!(
                            "{addr} holds no array"
                        )));
                    }
                };
                let len = items.len();
                match items.get_mut(*index) {
                    Some(slot) => *slot = Some(value.clone()),
                    None => return Err(RuntimeError::index_out_of_bounds(*index as i64, len)),
                }
                self.store.set(*addr, Value::Array(items), line)?;
                Ok(value)
            }
            Place::Temp(id) => {
                let (frame, _) = self.active_frame_mut();
                frame.store_temp(*id, value.clone());
                Ok(value)
            }
        }
    }

    fn active_frame_mut(&mut self) -> (&mut Frame, &mut ValueStore) {
        let frame = match self.stack.top_mut() {
            Some(ctx) => &mut ctx.frame,
            None => &mut self.globals,
        };
        (frame, &mut self.store)
    }
}

/// Render a printf format with at most one `%d`/`%f` placeholder.
fn format_output(format: &str, value: Option<&Value>) -> InterpResult<String> {
    let mut out = String::with_capacity(format.len());
    let mut pending = value;
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            '%' => match chars.peek().copied() {
                Some('%') => {
                    chars.next();
                    out.push('%');
                }
                Some(conv @ ('d' | 'f')) => {
                    chars.next();
                    let value = pending
                        .take()
                        .ok_or_else(|| RuntimeError::format_mismatch(format, false))?;
                    out.push_str(&render_placeholder(conv, value)?);
                }
                _ => out.push('%'),
            },
            other => out.push(other),
        }
    }
    if pending.is_some() {
        return Err(RuntimeError::format_mismatch(format, true));
    }
    Ok(out)
}

fn render_placeholder(conv: char, value: &Value) -> InterpResult<String> {
    match (conv, value) {
        ('d', Value::Float(x)) => Ok(format!("{}", x.trunc() as i64)),
        ('d', v) => v
            .as_int()
            .map(|n| n.to_string())
            .ok_or_else(|| RuntimeError::type_error("int for %d", v.type_name())),
        (_, v) => v
            .as_float()
            .map(|x| format!("{x:.6}"))
            .ok_or_else(|| RuntimeError::type_error("float for %f", v.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FunctionDef, Item, Param, Stmt, TranslationUnit};
    use crate::interp::ErrorKind;

    fn interpreter(body: Vec<Stmt>) -> Interpreter {
        let unit = TranslationUnit::new(vec![Item::Function(FunctionDef {
            name: "main".to_string(),
            return_type: Type::Int,
            params: vec![],
            body,
            line: 1,
        })]);
        let program = Program::build(&unit).unwrap();
        Interpreter::new(program, &SessionConfig::default()).unwrap()
    }

    fn run(interp: &mut Interpreter) -> usize {
        interp.start("main").unwrap();
        let mut steps = 0;
        while interp.pc().is_some() {
            interp.step().unwrap();
            steps += 1;
        }
        steps
    }

    #[test]
    fn test_format_output() {
        assert_eq!(format_output("%d\\n", Some(&Value::Int(5))).unwrap(), "5\n");
        assert_eq!(format_output("x=%f", Some(&Value::Int(2))).unwrap(), "x=2.000000");
        assert_eq!(format_output("100%%", None).unwrap(), "100%");
        assert_eq!(format_output("%d", Some(&Value::Float(2.9))).unwrap(), "2");
    }

    #[test]
    fn test_format_arity_mismatch() {
        let err = format_output("%d", None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::FormatMismatch);
        let err = format_output("plain", Some(&Value::Int(1))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::FormatMismatch);
    }

    #[test]
    fn test_assignment_coerces_to_declared_type() {
        let mut interp = interpreter(vec![
            Stmt::declare(2, vec![VarDecl::new("x", Type::Int), VarDecl::new("f", Type::Float)]),
            Stmt::expr(3, Expr::assign(Expr::ident("x"), Expr::float(2.9))),
            Stmt::expr(4, Expr::assign(Expr::ident("f"), Expr::int(7))),
            Stmt::print(5, "%f", Some(Expr::binary(BinOp::Add, Expr::ident("x"), Expr::ident("f")))),
        ]);
        interp.start("main").unwrap();
        interp.step().unwrap();
        interp.step().unwrap();
        interp.step().unwrap();
        let (x, _) = interp.resolve("x").unwrap();
        let (f, _) = interp.resolve("f").unwrap();
        assert_eq!(interp.store().cell(x).unwrap().value(), Some(&Value::Int(2)));
        assert_eq!(interp.store().cell(f).unwrap().value(), Some(&Value::Float(7.0)));
    }

    #[test]
    fn test_increment_and_compound_assignment() {
        let i = || Expr::ident("i");
        let mut interp = interpreter(vec![
            Stmt::declare(2, vec![VarDecl::new("i", Type::Int).with_init(Expr::int(1))]),
            Stmt::expr(3, Expr::unary(UnOp::Incr, i())),
            Stmt::expr(4, Expr::compound(crate::ast::AssignOp::AddAssign, i(), Expr::int(10))),
            Stmt::expr(5, Expr::unary(UnOp::Decr, i())),
            Stmt::print(6, "%d", Some(i())),
        ]);
        run(&mut interp);
        assert_eq!(interp.output(), "11");
    }

    #[test]
    fn test_array_element_write_copies_whole_array() {
        let a = || Expr::ident("a");
        let mut interp = interpreter(vec![
            Stmt::declare(2, vec![VarDecl::new("a", Type::array_of(Type::Int, 3))]),
            Stmt::expr(3, Expr::assign(Expr::index(a(), Expr::int(1)), Expr::float(4.5))),
            Stmt::expr(4, Expr::assign(Expr::index(a(), Expr::int(0)), Expr::int(1))),
        ]);
        interp.start("main").unwrap();
        interp.step().unwrap();
        interp.step().unwrap();

        let (addr, symbol) = interp.resolve("a").unwrap();
        assert_eq!(symbol.len, 3);
        let cell = interp.store().cell(addr).unwrap();
        assert_eq!(
            cell.value(),
            Some(&Value::Array(vec![None, Some(Value::Int(4)), None]))
        );
        assert_eq!(cell.history().len(), 2);

        interp.step().unwrap();
        assert!(interp.pc().is_none());
        assert!(interp.store().is_empty());
    }

    #[test]
    fn test_index_out_of_bounds_keeps_counter() {
        let mut interp = interpreter(vec![
            Stmt::declare(2, vec![VarDecl::new("a", Type::array_of(Type::Int, 2))]),
            Stmt::expr(3, Expr::assign(Expr::index(Expr::ident("a"), Expr::int(2)), Expr::int(1))),
        ]);
        interp.start("main").unwrap();
        interp.step().unwrap();
        let before = interp.pc();
        let err = interp.step().unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndexOutOfBounds);
        assert_eq!(interp.pc(), before);
        assert_eq!(interp.current_line(), Some(3));
    }

    #[test]
    fn test_pointer_write_through_deref() {
        let mut interp = interpreter(vec![
            Stmt::declare(
                2,
                vec![
                    VarDecl::new("x", Type::Int).with_init(Expr::int(4)),
                    VarDecl::new("p", Type::pointer_to(Type::Int)),
                ],
            ),
            Stmt::expr(3, Expr::assign(Expr::ident("p"), Expr::unary(UnOp::AddrOf, Expr::ident("x")))),
            Stmt::expr(4, Expr::assign(Expr::unary(UnOp::Deref, Expr::ident("p")), Expr::float(9.7))),
            Stmt::print(5, "%d", Some(Expr::ident("x"))),
        ]);
        run(&mut interp);
        assert_eq!(interp.output(), "9");
    }

    #[test]
    fn test_non_boolean_predicate_is_error() {
        let mut interp = interpreter(vec![
            Stmt::declare(2, vec![VarDecl::new("i", Type::Int).with_init(Expr::int(3))]),
            Stmt::while_loop(3, Expr::ident("i"), vec![Stmt::expr(4, Expr::unary(UnOp::Decr, Expr::ident("i")))]),
        ]);
        interp.start("main").unwrap();
        let err = interp.step().unwrap_err();
        assert_eq!(err.kind, ErrorKind::NonBooleanPredicate);
        // the declaration before the branch is undone with the failed step
        assert_eq!(interp.current_line(), Some(2));
        assert!(interp.resolve("i").is_none());
        assert!(interp.store().is_empty());
    }

    #[test]
    fn test_failed_step_is_undone() {
        let x = || Expr::ident("x");
        let mut interp = interpreter(vec![
            Stmt::declare(
                2,
                vec![
                    VarDecl::new("x", Type::Int).with_init(Expr::int(1)),
                    VarDecl::new("z", Type::Int).with_init(Expr::int(0)),
                    VarDecl::new("y", Type::Int),
                ],
            ),
            Stmt::expr(
                3,
                Expr::assign(
                    Expr::ident("y"),
                    Expr::binary(
                        BinOp::Add,
                        Expr::unary(UnOp::Incr, x()),
                        Expr::binary(BinOp::Div, Expr::int(10), Expr::ident("z")),
                    ),
                ),
            ),
        ]);
        interp.start("main").unwrap();
        interp.step().unwrap();
        let before = interp.pc();

        for _ in 0..2 {
            let err = interp.step().unwrap_err();
            assert_eq!(err.kind, ErrorKind::DivisionByZero);
            assert_eq!(interp.pc(), before);
            let (addr, _) = interp.resolve("x").unwrap();
            let cell = interp.store().cell(addr).unwrap();
            assert_eq!(cell.value(), Some(&Value::Int(1)));
            assert_eq!(cell.history().len(), 1);
        }
    }

    #[test]
    fn test_empty_infinite_loop_reports_no_progress() {
        let mut interp = interpreter(vec![
            Stmt::declare(2, vec![VarDecl::new("i", Type::Int)]),
            Stmt::while_loop(3, Expr::binary(BinOp::Lt, Expr::int(1), Expr::int(2)), vec![]),
        ]);
        interp.start("main").unwrap();
        let err = interp.step().unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoProgress);
    }

    #[test]
    fn test_call_binds_parameters_in_fresh_frame() {
        let unit = TranslationUnit::new(vec![
            Item::Function(FunctionDef {
                name: "twice".to_string(),
                return_type: Type::Int,
                params: vec![Param::new("n", Type::Int)],
                body: vec![Stmt::ret(2, Some(Expr::binary(BinOp::Mul, Expr::ident("n"), Expr::int(2))))],
                line: 1,
            }),
            Item::Function(FunctionDef {
                name: "main".to_string(),
                return_type: Type::Int,
                params: vec![],
                body: vec![
                    Stmt::print(5, "%d", Some(Expr::call("twice", vec![Expr::float(3.5)]))),
                    Stmt::ret(6, Some(Expr::int(0))),
                ],
                line: 4,
            }),
        ]);
        let program = Program::build(&unit).unwrap();
        let mut interp = Interpreter::new(program, &SessionConfig::default()).unwrap();
        assert_eq!(run(&mut interp), 3);
        assert_eq!(interp.output(), "6");
        assert!(interp.call_stack().is_empty());
    }
}
