//! ctrace: line-stepping interpreter and debugger
//!
//! A program arrives as a [`TranslationUnit`], is lowered into a
//! control-flow graph, optionally optimized, and then executed one source
//! line at a time with the full value history of every variable kept for
//! inspection.

pub mod ast;
pub mod cfg;
pub mod config;
pub mod debugger;
pub mod error;
pub mod interp;
pub mod opt;
pub mod program;
pub mod repl;

pub use ast::TranslationUnit;
pub use config::SessionConfig;
pub use debugger::{Inspection, Progress, Session, Trace};
pub use error::{Error, Result};
pub use opt::OptLevel;
pub use program::Program;
