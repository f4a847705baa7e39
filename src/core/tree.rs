//! Command tree registry
//!
//! The tree is an arena of [`CommandNode`]s addressed by [`NodeId`]. It is
//! built once through [`CommandTree::register`], then frozen and shared
//! read-only between sessions.

use crate::core::handler::Handler;
use crate::core::params::{ParamSpec, validate_specs};
use crate::error::RegistrationError;
use indexmap::IndexMap;
use std::fmt::{self, Write as _};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Index of a node inside its [`CommandTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// One named node of the command tree
pub struct CommandNode {
    name: String,
    parent: Option<NodeId>,
    depth: usize,
    children: IndexMap<String, NodeId>,
    params: Vec<ParamSpec>,
    handler: Option<Arc<dyn Handler>>,
    context_entering: bool,
    help: Option<String>,
    context_label: Option<String>,
}

impl CommandNode {
    fn new(name: impl Into<String>, parent: Option<NodeId>, depth: usize) -> Self {
        Self {
            name: name.into(),
            parent,
            depth,
            children: IndexMap::new(),
            params: Vec::new(),
            handler: None,
            context_entering: false,
            help: None,
            context_label: None,
        }
    }

    /// Node name; empty for the root
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Distance from the root (root is 0)
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn handler(&self) -> Option<&Arc<dyn Handler>> {
        self.handler.as_ref()
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    pub fn is_context_entering(&self) -> bool {
        self.context_entering
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Label shown in the prompt while this node is the active context
    pub fn context_label(&self) -> &str {
        self.context_label.as_deref().unwrap_or(&self.name)
    }

    /// Exact child lookup
    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    /// Children in insertion order
    pub fn children(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.children.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Usage line such as `interface <name>`
    pub fn usage(&self) -> String {
        let mut usage = self.name.clone();
        for spec in &self.params {
            usage.push(' ');
            usage.push_str(&spec.usage());
        }
        usage
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("name", &self.name)
            .field("depth", &self.depth)
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .field("params", &self.params)
            .field("handler", &self.handler.as_ref().map(|_| "<dyn Handler>"))
            .field("context_entering", &self.context_entering)
            .finish_non_exhaustive()
    }
}

/// Rooted, write-once registry of command paths
#[derive(Debug)]
pub struct CommandTree {
    nodes: Vec<CommandNode>,
    frozen: bool,
}

impl Default for CommandTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTree {
    /// Create a tree holding only the unnamed root
    pub fn new() -> Self {
        Self {
            nodes: vec![CommandNode::new("", None, 0)],
            frozen: false,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Borrow a node.
    ///
    /// Panics if `id` does not come from this tree.
    pub fn node(&self, id: NodeId) -> &CommandNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&CommandNode> {
        self.nodes.get(id.0)
    }

    /// Number of nodes including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Deepest node depth
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(CommandNode::depth).max().unwrap_or(0)
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Make the tree immutable. Further registrations fail with `TreeFrozen`.
    pub fn freeze(&mut self) {
        if !self.frozen {
            debug!("Freezing command tree with {} node(s)", self.nodes.len());
        }
        self.frozen = true;
    }

    /// Children of `id` in insertion order
    pub fn children_of(&self, id: NodeId) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.node(id).children()
    }

    /// Resolve a path of exact names from the root
    pub fn lookup(&self, path: &[&str]) -> Option<NodeId> {
        path.iter()
            .try_fold(NodeId::ROOT, |id, name| self.node(id).child(name))
    }

    /// Names from the root down to `id`
    pub fn path_of(&self, id: NodeId) -> Vec<String> {
        let mut path = Vec::with_capacity(self.node(id).depth);
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current);
            if node.parent.is_some() {
                path.push(node.name.clone());
            }
            cursor = node.parent;
        }
        path.reverse();
        path
    }

    /// Bind `handler` to `path`, creating intermediate nodes as needed.
    ///
    /// On error the tree is left unchanged.
    #[instrument(level = "debug", skip(self, params, handler), fields(path = ?path))]
    pub fn register<H>(
        &mut self,
        path: &[&str],
        params: Vec<ParamSpec>,
        handler: H,
        context_entering: bool,
    ) -> Result<NodeId, RegistrationError>
    where
        H: Handler + 'static,
    {
        self.check_writable(path)?;
        if path.is_empty() {
            return Err(RegistrationError::EmptyPath);
        }
        validate_specs(&params).map_err(|reason| RegistrationError::InvalidParamSpec {
            path: owned(path),
            reason,
        })?;
        if self.lookup(path).is_some_and(|id| self.node(id).has_handler()) {
            return Err(RegistrationError::DuplicateCommand { path: owned(path) });
        }

        let id = self.ensure_path(path);
        let node = &mut self.nodes[id.0];
        node.params = params;
        node.handler = Some(Arc::new(handler));
        node.context_entering = context_entering;
        debug!("Registered command '{}'", path.join(" "));
        Ok(id)
    }

    /// Create handler-less nodes along `path` and attach help text to the last one
    pub fn group(&mut self, path: &[&str], help: &str) -> Result<NodeId, RegistrationError> {
        self.check_writable(path)?;
        if path.is_empty() {
            return Err(RegistrationError::EmptyPath);
        }
        let id = self.ensure_path(path);
        self.nodes[id.0].help = Some(help.to_string());
        Ok(id)
    }

    pub fn set_help(&mut self, id: NodeId, help: &str) -> Result<(), RegistrationError> {
        self.check_writable_node(id)?;
        self.nodes[id.0].help = Some(help.to_string());
        Ok(())
    }

    /// Override the prompt label used when `id` becomes the active context
    pub fn set_context_label(&mut self, id: NodeId, label: &str) -> Result<(), RegistrationError> {
        self.check_writable_node(id)?;
        self.nodes[id.0].context_label = Some(label.to_string());
        Ok(())
    }

    /// Render the tree as an indented listing, one node per line
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_node(NodeId::ROOT, &mut out);
        out
    }

    fn render_node(&self, id: NodeId, out: &mut String) {
        for (_, child) in self.children_of(id) {
            let node = self.node(child);
            let indent = "  ".repeat(node.depth - 1);
            let marker = if node.context_entering { " >" } else { "" };
            let _ = write!(out, "{indent}{}{marker}", node.usage());
            if let Some(help) = node.help() {
                let _ = write!(out, "  - {help}");
            }
            out.push('\n');
            self.render_node(child, out);
        }
    }

    fn check_writable(&self, path: &[&str]) -> Result<(), RegistrationError> {
        if self.frozen {
            return Err(RegistrationError::TreeFrozen { path: owned(path) });
        }
        if let Some(bad) = path
            .iter()
            .find(|name| name.is_empty() || name.chars().any(char::is_whitespace))
        {
            return Err(RegistrationError::InvalidName {
                name: bad.to_string(),
            });
        }
        Ok(())
    }

    fn check_writable_node(&self, id: NodeId) -> Result<(), RegistrationError> {
        if self.frozen {
            return Err(RegistrationError::TreeFrozen {
                path: self.path_of(id),
            });
        }
        Ok(())
    }

    fn ensure_path(&mut self, path: &[&str]) -> NodeId {
        let mut current = NodeId::ROOT;
        for name in path {
            current = match self.node(current).child(name) {
                Some(existing) => existing,
                None => {
                    let id = NodeId(self.nodes.len());
                    let depth = self.node(current).depth + 1;
                    self.nodes.push(CommandNode::new(*name, Some(current), depth));
                    self.nodes[current.0].children.insert(name.to_string(), id);
                    id
                }
            };
        }
        current
    }
}

fn owned(path: &[&str]) -> Vec<String> {
    path.iter().map(|s| s.to_string()).collect()
}
