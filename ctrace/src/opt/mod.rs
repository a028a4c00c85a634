//! Dataflow optimization over the control-flow graph
//!
//! Passes rewrite statements inside nodes and never add, remove or rewire
//! nodes, so every node reachable before optimization stays reachable and
//! every statement keeps its source line.
//!
//! # Optimization Levels
//!
//! - **Debug**: no optimization
//! - **Release**: constant folding, then dead-store elimination

mod dse;
mod fold;
mod liveness;

pub use dse::{side_effects, DeadStoreElimination};
pub use fold::{fold_expr, ConstantFolding};
pub use liveness::{address_taken, BlockLiveness, Liveness, UseDef};

use crate::cfg::{Cfg, NodeId};
use crate::program::Program;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Optimization pass trait
pub trait OptimizationPass {
    /// Name of the optimization pass
    fn name(&self) -> &'static str;

    /// Run the pass on the function whose graph starts at `entry`.
    /// `globals` are always treated as live.
    /// Returns true if any changes were made
    fn run_on_function(&self, cfg: &mut Cfg, entry: NodeId, globals: &HashSet<String>) -> bool;
}

/// Optimization level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptLevel {
    #[default]
    Debug,
    Release,
}

/// Statistics from optimization passes
#[derive(Debug, Default)]
pub struct OptimizationStats {
    /// Functions visited
    pub functions: usize,
    /// Functions each pass changed
    pub pass_counts: HashMap<String, usize>,
}

impl OptimizationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pass(&mut self, name: &str) {
        *self.pass_counts.entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, name: &str) -> usize {
        self.pass_counts.get(name).copied().unwrap_or(0)
    }
}

/// Optimization pipeline
#[derive(Default)]
pub struct OptimizationPipeline {
    passes: Vec<Box<dyn OptimizationPass>>,
}

impl OptimizationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create pipeline for the given optimization level
    pub fn for_level(level: OptLevel) -> Self {
        let mut pipeline = Self::new();
        if level == OptLevel::Release {
            pipeline.add_pass(Box::new(ConstantFolding));
            pipeline.add_pass(Box::new(DeadStoreElimination));
        }
        pipeline
    }

    pub fn add_pass(&mut self, pass: Box<dyn OptimizationPass>) {
        self.passes.push(pass);
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Run every pass, in order, on every function of `program`.
    pub fn optimize(&self, program: &mut Program) -> OptimizationStats {
        let mut stats = OptimizationStats::new();
        if self.passes.is_empty() {
            return stats;
        }

        let globals: HashSet<String> = program.global_names().map(str::to_string).collect();
        let entries: Vec<NodeId> = program
            .functions
            .in_source_order()
            .iter()
            .map(|entry| entry.entry)
            .collect();

        for entry in entries {
            stats.functions += 1;
            for pass in &self.passes {
                if pass.run_on_function(&mut program.cfg, entry, &globals) {
                    stats.record_pass(pass.name());
                }
            }
        }

        info!(
            functions = stats.functions,
            folded = stats.count("constant_folding"),
            pruned = stats.count("dead_store_elimination"),
            "optimized program"
        );
        stats
    }
}
