//! Command handler capability
//!
//! A handler is invoked with the bound parameters and the session's active
//! context. It returns rendered text and, optionally, a request to change
//! the session's context. The executor applies that request only after the
//! handler has returned successfully.

use crate::core::context::Context;
use crate::core::params::BoundParams;

/// Context change requested by a handler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Transition {
    /// Leave the context stack as it is
    #[default]
    Stay,
    /// Push the matched node; `label` overrides the node's context label
    Enter { label: Option<String> },
    /// Pop the current context
    Exit,
    /// Truncate to the root context
    Reset,
}

/// Result of a successful handler invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    pub text: String,
    pub transition: Transition,
}

impl Output {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            transition: Transition::Stay,
        }
    }

    pub fn enter() -> Self {
        Self::empty().with_transition(Transition::Enter { label: None })
    }

    pub fn enter_as(label: impl Into<String>) -> Self {
        Self::empty().with_transition(Transition::Enter {
            label: Some(label.into()),
        })
    }

    pub fn exit() -> Self {
        Self::empty().with_transition(Transition::Exit)
    }

    pub fn reset() -> Self {
        Self::empty().with_transition(Transition::Reset)
    }

    #[must_use]
    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transition = transition;
        self
    }
}

/// Polymorphic command implementation
pub trait Handler: Send + Sync {
    fn invoke(&self, params: &BoundParams, context: &Context) -> anyhow::Result<Output>;
}

/// Handler backed by a closure
pub struct FnHandler<F>(F);

impl<F> Handler for FnHandler<F>
where
    F: Fn(&BoundParams, &Context) -> anyhow::Result<Output> + Send + Sync,
{
    fn invoke(&self, params: &BoundParams, context: &Context) -> anyhow::Result<Output> {
        (self.0)(params, context)
    }
}

/// Wrap a closure as a [`Handler`]
pub fn handler<F>(f: F) -> FnHandler<F>
where
    F: Fn(&BoundParams, &Context) -> anyhow::Result<Output> + Send + Sync,
{
    FnHandler(f)
}

/// Handler that always prints the same text
#[derive(Debug, Clone)]
pub struct StaticText(String);

impl Handler for StaticText {
    fn invoke(&self, _params: &BoundParams, _context: &Context) -> anyhow::Result<Output> {
        Ok(Output::text(self.0.clone()))
    }
}

pub fn text(text: impl Into<String>) -> StaticText {
    StaticText(text.into())
}

/// Handler that only requests a context transition
#[derive(Debug, Clone)]
pub struct TransitionOnly(Transition);

impl Handler for TransitionOnly {
    fn invoke(&self, _params: &BoundParams, _context: &Context) -> anyhow::Result<Output> {
        Ok(Output::empty().with_transition(self.0.clone()))
    }
}

/// Built-in `exit`: leave the current context
pub fn exit() -> TransitionOnly {
    TransitionOnly(Transition::Exit)
}

/// Built-in `end`: return to the root context
pub fn end() -> TransitionOnly {
    TransitionOnly(Transition::Reset)
}
