//! Interpreter sessions
//!
//! A session owns one context stack and nothing else; any number of them
//! share the same frozen command tree.

use crate::core::context::{Context, ContextStack};
use std::fmt;

/// Unique, monotonically increasing session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// One independent console
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    contexts: ContextStack,
}

impl Session {
    pub(crate) fn new(id: SessionId) -> Self {
        Self {
            id,
            contexts: ContextStack::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn contexts(&self) -> &ContextStack {
        &self.contexts
    }

    pub fn contexts_mut(&mut self) -> &mut ContextStack {
        &mut self.contexts
    }

    pub fn current(&self) -> &Context {
        self.contexts.current()
    }

    /// Labels of every non-root context, outermost first
    pub fn context_path(&self) -> Vec<&str> {
        self.contexts
            .iter()
            .filter(|ctx| !ctx.is_root())
            .map(Context::label)
            .collect()
    }

    /// Drop back to the root context
    pub fn reset(&mut self) {
        self.contexts.reset();
    }

    /// Router-style prompt: `host#` at the root, `host(label)#` otherwise
    pub fn prompt(&self, hostname: &str) -> String {
        let current = self.current();
        if current.is_root() || current.label().is_empty() {
            format!("{hostname}#")
        } else {
            format!("{hostname}({})#", current.label())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handler::text;
    use crate::core::tree::CommandTree;

    #[test]
    fn test_prompt_follows_context() {
        let mut tree = CommandTree::new();
        let config = tree
            .register(&["configure", "terminal"], vec![], text(""), true)
            .unwrap();
        let iface = tree
            .register(&["configure", "terminal", "interface"], vec![], text(""), true)
            .unwrap();

        let mut session = Session::new(SessionId::new(1));
        assert_eq!(session.prompt("router"), "router#");

        session.contexts_mut().push(config, "config");
        assert_eq!(session.prompt("router"), "router(config)#");

        session.contexts_mut().push(iface, "config-if");
        assert_eq!(session.context_path(), ["config", "config-if"]);

        session.reset();
        assert_eq!(session.prompt("router"), "router#");
        assert!(session.context_path().is_empty());
    }

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId::new(7).to_string(), "session-7");
    }
}
