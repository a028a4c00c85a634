//! Stepping interpreter
//!
//! Runtime state lives in one [`ValueStore`] arena. Frames map names to
//! addresses in it, the [`CallStack`] owns the frames of active calls, and
//! the [`Interpreter`] moves a program counter through the graph.

mod error;
mod eval;
mod frame;
mod stack;
mod store;
mod value;

pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use eval::Interpreter;
pub use frame::{Frame, Symbol, SymbolTable, ValueTable};
pub use stack::{CallContext, CallStack};
pub use store::{Address, Cell, Record, ValueStore};
pub use value::{binary_op, unary_op, Value};
