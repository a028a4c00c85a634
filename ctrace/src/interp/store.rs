//! Addressable value store with per-address history
//!
//! Cells are allocated in a single arena. Frames refer to cells by
//! [`Address`], so any number of frames can alias the same backing store.
//! Cells are only ever released from the tail, when a frame is freed.
//!
//! Between [`ValueStore::begin`] and [`ValueStore::commit`] every change is
//! journaled so [`ValueStore::rollback`] can restore the store exactly.

use super::error::{InterpResult, RuntimeError};
use super::value::Value;
use std::fmt;

/// Index of a cell in the [`ValueStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub usize);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// One entry of a cell's history
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// `None` for the allocation of a variable without initializer
    pub value: Option<Value>,
    pub line: u32,
}

/// Storage for a single variable
#[derive(Debug, Clone)]
pub struct Cell {
    current: Option<Value>,
    history: Vec<Record>,
}

impl Cell {
    pub fn value(&self) -> Option<&Value> {
        self.current.as_ref()
    }

    /// Every value this cell has held, oldest first
    pub fn history(&self) -> &[Record] {
        &self.history
    }
}

/// Inverse of one store mutation
#[derive(Debug)]
enum Undo {
    Allocated,
    Set { addr: Address, previous: Option<Value> },
    Freed(Vec<Cell>),
}

/// Append-only arena of cells
#[derive(Debug, Default)]
pub struct ValueStore {
    cells: Vec<Cell>,
    journal: Option<Vec<Undo>>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live cells; also the address the next allocation receives
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Allocate a new cell; the allocation itself is the first history record.
    pub fn allocate(&mut self, value: Option<Value>, line: u32) -> Address {
        let addr = Address(self.cells.len());
        self.cells.push(Cell {
            current: value.clone(),
            history: vec![Record { value, line }],
        });
        self.record(Undo::Allocated);
        addr
    }

    pub fn cell(&self, addr: Address) -> Option<&Cell> {
        self.cells.get(addr.0)
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr.0 < self.cells.len()
    }

    /// Overwrite the current value and append it to the history.
    pub fn set(&mut self, addr: Address, value: Value, line: u32) -> InterpResult<()> {
        let len = self.cells.len();
        let cell = self.cells.get_mut(addr.0).ok_or_else(|| {
            RuntimeError::stack_inconsistency(&format!(
                "write to {addr} beyond store of {len} cells"
            ))
        })?;
        let previous = cell.current.replace(value.clone());
        cell.history.push(Record {
            value: Some(value),
            line,
        });
        self.record(Undo::Set { addr, previous });
        Ok(())
    }

    /// Release every cell at or above `base`. Returns how many were freed.
    pub fn free_from(&mut self, base: usize) -> InterpResult<usize> {
        if base > self.cells.len() {
            return Err(RuntimeError::stack_inconsistency(&format!(
                "frame base {base} above store of {} cells",
                self.cells.len()
            )));
        }
        let freed = self.cells.split_off(base);
        let count = freed.len();
        self.record(Undo::Freed(freed));
        Ok(count)
    }

    /// Start journaling changes
    pub fn begin(&mut self) {
        self.journal = Some(Vec::new());
    }

    /// Keep every change since [`ValueStore::begin`]
    pub fn commit(&mut self) {
        self.journal = None;
    }

    /// Undo every change since [`ValueStore::begin`], newest first.
    pub fn rollback(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::Allocated => {
                    self.cells.pop();
                }
                Undo::Set { addr, previous } => {
                    if let Some(cell) = self.cells.get_mut(addr.0) {
                        cell.history.pop();
                        cell.current = previous;
                    }
                }
                Undo::Freed(cells) => self.cells.extend(cells),
            }
        }
    }

    fn record(&mut self, undo: Undo) {
        if let Some(journal) = &mut self.journal {
            journal.push(undo);
        }
    }
}
