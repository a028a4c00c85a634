//! Debugger session: begin / next / print / trace
//!
//! Queries never fail. A name that does not resolve, an index out of range
//! or a pointer that leads nowhere all answer [`Inspection::Invisible`].

use crate::ast::TranslationUnit;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::interp::{Address, InterpResult, Interpreter, RuntimeError, Value};
use crate::opt::OptimizationPipeline;
use crate::program::Program;
use std::fmt;
use tracing::{debug, warn};

/// Where the program stands after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The next step executes this line
    Paused { line: u32 },
    Finished,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::Paused { line } => write!(f, "line {line}"),
            Progress::Finished => write!(f, "End of program"),
        }
    }
}

/// Answer to `print`
#[derive(Debug, Clone, PartialEq)]
pub enum Inspection {
    Value(Value),
    Uninitialized,
    Invisible,
}

impl fmt::Display for Inspection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inspection::Value(v) => write!(f, "{v}"),
            Inspection::Uninitialized => write!(f, "N/A"),
            Inspection::Invisible => write!(f, "Invisible variable"),
        }
    }
}

/// Answer to `trace`
#[derive(Debug, Clone, PartialEq)]
pub enum Trace {
    /// Every value the location held, oldest first, with the line that wrote it
    History {
        label: String,
        records: Vec<(Option<Value>, u32)>,
    },
    Invisible,
}

impl Trace {
    pub fn records(&self) -> &[(Option<Value>, u32)] {
        match self {
            Trace::History { records, .. } => records,
            Trace::Invisible => &[],
        }
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trace::Invisible => write!(f, "Invisible variable"),
            Trace::History { label, records } if records.is_empty() => {
                write!(f, "{label} not yet initialized")
            }
            Trace::History { label, records } => {
                for (i, (value, line)) in records.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    match value {
                        Some(v) => write!(f, "{label} = {v} at line {line}")?,
                        None => write!(f, "{label} = N/A at line {line}")?,
                    }
                }
                Ok(())
            }
        }
    }
}

/// Location a query designates
#[derive(Debug, Clone, Copy)]
enum Target {
    Cell(Address),
    /// `&name`: the address itself, not a stored value
    AddressOf(Address),
}

/// One debugging session over a lowered program
pub struct Session {
    interp: Interpreter,
    config: SessionConfig,
    started: bool,
    done: bool,
    steps: usize,
}

impl Session {
    /// Lower `unit`, optimize it at the configured level and run the
    /// global declarations.
    pub fn new(unit: &TranslationUnit, config: SessionConfig) -> Result<Self> {
        let mut program = Program::build(unit)?;
        OptimizationPipeline::for_level(config.opt_level).optimize(&mut program);
        Self::from_program(program, config)
    }

    pub fn from_program(program: Program, config: SessionConfig) -> Result<Self> {
        if program.function(&config.entry_point).is_none() {
            return Err(Error::config(format!(
                "entry point `{}` is not defined",
                config.entry_point
            )));
        }
        let interp = Interpreter::new(program, &config)?;
        Ok(Session {
            interp,
            config,
            started: false,
            done: false,
            steps: 0,
        })
    }

    /// Enter the entry function. Later calls only report progress; a
    /// start that failed is undone and tried again.
    pub fn begin(&mut self) -> InterpResult<Progress> {
        if self.started || self.done {
            return Ok(self.progress());
        }
        let entry = self.config.entry_point.clone();
        match self.interp.start(&entry) {
            Ok(pc) => {
                self.started = true;
                self.done = pc.is_none();
                Ok(self.progress())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Execute up to `n` lines (at least one), stopping early at the end of
    /// the program. Once finished, further calls change nothing.
    pub fn next(&mut self, n: usize) -> InterpResult<Progress> {
        if !self.started {
            self.begin()?;
        }
        for _ in 0..n.max(1) {
            if self.done {
                break;
            }
            match self.interp.step() {
                Ok(pc) => {
                    self.steps += 1;
                    if pc.is_none() {
                        debug!(steps = self.steps, "program finished");
                        self.done = true;
                    }
                }
                Err(e) => return Err(self.fail(e)),
            }
        }
        Ok(self.progress())
    }

    /// Step until the program ends
    pub fn run_to_end(&mut self) -> InterpResult<usize> {
        self.next(usize::MAX)?;
        Ok(self.steps)
    }

    /// Current value of `name` (optionally one element of it)
    pub fn print(&self, name: &str, index: Option<i64>) -> Inspection {
        let Some(target) = self.locate(name) else {
            return Inspection::Invisible;
        };
        match target {
            Target::AddressOf(addr) if index.is_none() => Inspection::Value(Value::Pointer(addr)),
            Target::AddressOf(_) => Inspection::Invisible,
            Target::Cell(addr) => {
                let Some(cell) = self.interp.store().cell(addr) else {
                    return Inspection::Invisible;
                };
                match (cell.value(), index) {
                    (None, None) => Inspection::Uninitialized,
                    (Some(value), None) => Inspection::Value(value.clone()),
                    (Some(Value::Array(elements)), Some(i)) => {
                        match normalize_index(i, elements.len()) {
                            Some(i) => match &elements[i] {
                                Some(v) => Inspection::Value(v.clone()),
                                None => Inspection::Uninitialized,
                            },
                            None => Inspection::Invisible,
                        }
                    }
                    (_, Some(_)) => Inspection::Invisible,
                }
            }
        }
    }

    /// Full history of `name` (optionally projected onto one element)
    pub fn trace(&self, name: &str, index: Option<i64>) -> Trace {
        let Some(Target::Cell(addr)) = self.locate(name) else {
            return Trace::Invisible;
        };
        let Some(cell) = self.interp.store().cell(addr) else {
            return Trace::Invisible;
        };
        let history = cell.history().iter();

        let (label, records) = match index {
            None => (
                name.to_string(),
                history.map(|r| (r.value.clone(), r.line)).collect(),
            ),
            Some(i) => {
                let Some(Value::Array(elements)) = cell.value() else {
                    return Trace::Invisible;
                };
                let Some(i) = normalize_index(i, elements.len()) else {
                    return Trace::Invisible;
                };
                let records = history
                    .map(|r| {
                        let element = match &r.value {
                            Some(Value::Array(elements)) => elements.get(i).cloned().flatten(),
                            _ => None,
                        };
                        (element, r.line)
                    })
                    .collect();
                (format!("{name}[{i}]"), records)
            }
        };
        Trace::History { label, records }
    }

    /// Active calls, innermost first, as `(function, calling line)`
    pub fn backtrace(&self) -> Vec<(String, u32)> {
        self.interp
            .call_stack()
            .iter()
            .map(|ctx| (ctx.function.clone(), ctx.calling_line))
            .collect()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn current_line(&self) -> Option<u32> {
        if self.done {
            None
        } else {
            self.interp.current_line()
        }
    }

    /// Everything the program printed so far
    pub fn output(&self) -> &str {
        self.interp.output()
    }

    /// Lines executed so far
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn progress(&self) -> Progress {
        match self.current_line() {
            Some(line) => Progress::Paused { line },
            None => Progress::Finished,
        }
    }

    fn fail(&mut self, err: RuntimeError) -> RuntimeError {
        if err.is_fatal() {
            warn!(error = %err, "aborting run");
            self.interp.halt();
            self.done = true;
        }
        err
    }

    /// Resolve a name with optional `*`/`&` prefixes. Prefixes apply right
    /// to left, nearest the name first.
    fn locate(&self, query: &str) -> Option<Target> {
        let name = query.trim_start_matches(['*', '&']);
        let prefixes = &query[..query.len() - name.len()];
        let (addr, _) = self.interp.resolve(name)?;

        let mut target = Target::Cell(addr);
        for prefix in prefixes.chars().rev() {
            target = match (prefix, target) {
                ('&', Target::Cell(addr)) => Target::AddressOf(addr),
                ('*', Target::AddressOf(addr)) => Target::Cell(addr),
                ('*', Target::Cell(addr)) => {
                    let pointee = self.interp.store().cell(addr)?.value()?.as_pointer()?;
                    if !self.interp.store().contains(pointee) {
                        return None;
                    }
                    Target::Cell(pointee)
                }
                _ => return None,
            };
        }
        Some(target)
    }
}

/// Map an index in `[-len, len)` onto `[0, len)`
pub fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

/// Split `name[index]` into its parts. A bare name has no index.
pub fn parse_query(text: &str) -> Option<(&str, Option<i64>)> {
    let text = text.trim();
    match text.split_once('[') {
        None if !text.is_empty() => Some((text, None)),
        None => None,
        Some((name, rest)) => {
            let index = rest.strip_suffix(']')?.trim().parse().ok()?;
            Some((name.trim(), Some(index)))
        }
    }
}
