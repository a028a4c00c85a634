//! Call stack

use super::frame::Frame;
use crate::ast::TempId;
use crate::cfg::ProgramCounter;

/// One active function call. Owns the activation's frame.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub function: String,
    /// Line of the call site (the header line for the entry function)
    pub calling_line: u32,
    pub frame: Frame,
    /// Where the caller continues; `None` for the entry function
    pub return_to: Option<ProgramCounter>,
    /// Caller temporary receiving the result
    pub dest: Option<TempId>,
    /// Highest line executed by this activation, used for gap filling
    pub high_line: u32,
}

/// Contexts as they were when a checkpoint was taken, saved the first
/// time each one is changed or popped
#[derive(Debug, Clone)]
struct Checkpoint {
    /// Contexts below this index are untouched
    low: usize,
    /// Saved contexts, highest index first
    saved: Vec<CallContext>,
}

/// Active calls, innermost last. The top context decides which frame
/// resolves identifiers.
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    contexts: Vec<CallContext>,
    checkpoint: Option<Checkpoint>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ctx: CallContext) {
        self.contexts.push(ctx);
    }

    pub fn pop(&mut self) -> Option<CallContext> {
        self.touch();
        self.contexts.pop()
    }

    pub fn top(&self) -> Option<&CallContext> {
        self.contexts.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut CallContext> {
        self.touch();
        self.contexts.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Innermost first
    pub fn iter(&self) -> impl Iterator<Item = &CallContext> {
        self.contexts.iter().rev()
    }

    /// Drop every context and hand back their frames, innermost first
    pub fn unwind(&mut self) -> Vec<Frame> {
        self.checkpoint = None;
        self.contexts.drain(..).rev().map(|ctx| ctx.frame).collect()
    }

    /// Remember the current contexts until [`CallStack::commit`] or
    /// [`CallStack::rollback`]
    pub fn begin(&mut self) {
        self.checkpoint = Some(Checkpoint {
            low: self.contexts.len(),
            saved: Vec::new(),
        });
    }

    pub fn commit(&mut self) {
        self.checkpoint = None;
    }

    /// Restore the contexts as they were at [`CallStack::begin`]
    pub fn rollback(&mut self) {
        if let Some(checkpoint) = self.checkpoint.take() {
            self.contexts.truncate(checkpoint.low);
            self.contexts.extend(checkpoint.saved.into_iter().rev());
        }
    }

    /// Only the top context is ever changed, and the stack shrinks one pop
    /// at a time, so contexts are saved in descending index order.
    fn touch(&mut self) {
        let Some(checkpoint) = &mut self.checkpoint else {
            return;
        };
        let Some(top) = self.contexts.len().checked_sub(1) else {
            return;
        };
        if top < checkpoint.low {
            checkpoint.saved.push(self.contexts[top].clone());
            checkpoint.low = top;
        }
    }
}
