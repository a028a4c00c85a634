//! Error types

use crate::interp::RuntimeError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error
#[derive(Debug, Error)]
pub enum Error {
    /// The input program cannot be lowered (duplicate function, bad declarator, ...)
    #[error("Build error at line {line}: {message}")]
    Build { message: String, line: u32 },

    /// Configuration could not be read or parsed
    #[error("Config error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl Error {
    pub fn build(message: impl Into<String>, line: u32) -> Self {
        Self::Build {
            message: message.into(),
            line,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Source line for errors tied to a location in the program
    pub fn line(&self) -> Option<u32> {
        match self {
            Self::Build { line, .. } => Some(*line),
            Self::Config { .. } | Self::Runtime(_) => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Build { message, .. } => message,
            Self::Config { message } => message,
            Self::Runtime(err) => &err.message,
        }
    }
}
