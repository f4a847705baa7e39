//! Per-session context stack
//!
//! Each entry is a non-owning position in the shared command tree. The bottom
//! entry is always the root.

use crate::core::params::BoundParams;
use crate::core::tree::NodeId;
use crate::error::SessionError;
use tracing::debug;

/// A position in the tree that scopes command matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    node: NodeId,
    label: String,
    params: BoundParams,
}

impl Context {
    pub fn new(node: NodeId, label: impl Into<String>) -> Self {
        Self::with_params(node, label, BoundParams::new())
    }

    /// Context that remembers the arguments of the command that entered it
    pub fn with_params(node: NodeId, label: impl Into<String>, params: BoundParams) -> Self {
        Self {
            node,
            label: label.into(),
            params,
        }
    }

    pub fn root() -> Self {
        Self::new(NodeId::ROOT, "")
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Display label; empty for the root
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn params(&self) -> &BoundParams {
        &self.params
    }

    pub fn is_root(&self) -> bool {
        self.node == NodeId::ROOT
    }
}

/// Stack of contexts owned by exactly one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextStack {
    entries: Vec<Context>,
}

impl Default for ContextStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStack {
    /// Stack holding only the root entry
    pub fn new() -> Self {
        Self {
            entries: vec![Context::root()],
        }
    }

    /// Top entry. The root is always present.
    pub fn current(&self) -> &Context {
        self.entries
            .last()
            .unwrap_or_else(|| unreachable!("context stack lost its root entry"))
    }

    pub fn push(&mut self, node: NodeId, label: impl Into<String>) {
        self.push_context(Context::new(node, label));
    }

    pub fn push_context(&mut self, context: Context) {
        debug!(
            "Entering context '{}' at depth {}",
            context.label,
            self.entries.len()
        );
        self.entries.push(context);
    }

    /// Remove the top entry. The root entry cannot be removed.
    pub fn pop(&mut self) -> Result<Context, SessionError> {
        if self.entries.len() == 1 {
            return Err(SessionError::CannotExitRoot);
        }
        let popped = self
            .entries
            .pop()
            .ok_or(SessionError::CannotExitRoot)?;
        debug!("Left context '{}'", popped.label);
        Ok(popped)
    }

    /// Truncate to the root entry
    pub fn reset(&mut self) {
        self.entries.truncate(1);
    }

    /// Number of entries including the root
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Entries from the root up
    pub fn iter(&self) -> impl Iterator<Item = &Context> {
        self.entries.iter()
    }
}
