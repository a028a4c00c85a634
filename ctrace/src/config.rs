//! Session configuration
//!
//! Read from a TOML file or built in code:
//!
//! ```toml
//! opt_level = "release"
//! fill_gaps = true
//! settle_limit = 10000
//! max_call_depth = 1000
//! entry_point = "main"
//! ```

use crate::error::{Error, Result};
use crate::opt::OptLevel;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one debugging session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Optimization applied to the graph before stepping begins
    pub opt_level: OptLevel,
    /// Step through lines that carry no statement (braces, blank lines)
    pub fill_gaps: bool,
    /// Empty or branch nodes one step may cross before giving up
    pub settle_limit: usize,
    /// Deepest allowed call nesting
    pub max_call_depth: usize,
    /// Function `begin` enters
    pub entry_point: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            opt_level: OptLevel::Debug,
            fill_gaps: true,
            settle_limit: 10_000,
            max_call_depth: 1_000,
            entry_point: "main".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opt_level(mut self, level: OptLevel) -> Self {
        self.opt_level = level;
        self
    }

    pub fn fill_gaps(mut self, enabled: bool) -> Self {
        self.fill_gaps = enabled;
        self
    }

    pub fn settle_limit(mut self, limit: usize) -> Self {
        self.settle_limit = limit;
        self
    }

    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = name.into();
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
