//! Abbreviation-matching state machine
//!
//! Walks the command tree from a session's current context, one token at a
//! time, and hands the remaining tokens to the parameter binder once a
//! handler node is reached. States are `Matching`, `Binding`, `Done` and
//! `Error`; the last two are terminal.
//!
//! An exact child name always wins over a prefix match. Matching is
//! case-sensitive.

use crate::core::params::{BoundParams, bind};
use crate::core::tree::{CommandTree, NodeId};
use crate::error::{CliError, MatchError};
use crate::utils::tokenizer::Token;
use tracing::{debug, trace};

/// How one token resolves against the children of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Exact(NodeId),
    Abbreviation(NodeId),
    Ambiguous(Vec<String>),
    NoMatch,
}

impl Resolution {
    pub fn selected(&self) -> Option<NodeId> {
        match self {
            Self::Exact(id) | Self::Abbreviation(id) => Some(*id),
            _ => None,
        }
    }
}

/// Resolve `token` among the children of `node`
pub fn resolve(tree: &CommandTree, node: NodeId, token: &str) -> Resolution {
    let parent = tree.node(node);
    if let Some(exact) = parent.child(token) {
        return Resolution::Exact(exact);
    }

    let mut candidates: Vec<(&str, NodeId)> = parent
        .children()
        .filter(|(name, _)| name.starts_with(token))
        .collect();

    match candidates.len() {
        0 => Resolution::NoMatch,
        1 => Resolution::Abbreviation(candidates.remove(0).1),
        _ => Resolution::Ambiguous(candidates.into_iter().map(|(n, _)| n.to_string()).collect()),
    }
}

/// Children of `node` whose names start with `prefix`, in insertion order
pub fn completions<'t>(tree: &'t CommandTree, node: NodeId, prefix: &str) -> Vec<(&'t str, NodeId)> {
    tree.children_of(node)
        .filter(|(name, _)| name.starts_with(prefix))
        .collect()
}

/// A fully matched command with its bound parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedCommand {
    pub node: NodeId,
    pub params: BoundParams,
    /// Index of the first parameter token
    pub param_start: usize,
}

#[derive(Debug)]
pub enum MatchState {
    /// Consuming path tokens; `cursor` indexes the next token
    Matching { node: NodeId, cursor: usize },
    /// Handing `tokens[cursor..]` to the binder
    Binding { node: NodeId, cursor: usize },
    Done(MatchedCommand),
    Error(CliError),
}

impl MatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Error(_))
    }
}

/// Single-line matcher over a borrowed tree and token list
#[derive(Debug)]
pub struct Matcher<'a> {
    tree: &'a CommandTree,
    tokens: &'a [Token],
    line_len: usize,
    state: MatchState,
}

impl<'a> Matcher<'a> {
    /// Start matching at `start`. `line_len` positions errors that point
    /// past the last token.
    pub fn new(tree: &'a CommandTree, start: NodeId, tokens: &'a [Token], line_len: usize) -> Self {
        Self {
            tree,
            tokens,
            line_len,
            state: MatchState::Matching {
                node: start,
                cursor: 0,
            },
        }
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Advance by one transition. Terminal states are left as they are.
    pub fn step(&mut self) -> &MatchState {
        let next = match &self.state {
            MatchState::Matching { node, cursor } => Some(self.step_matching(*node, *cursor)),
            MatchState::Binding { node, cursor } => Some(self.step_binding(*node, *cursor)),
            MatchState::Done(_) | MatchState::Error(_) => None,
        };
        if let Some(next) = next {
            trace!("Matcher transition -> {:?}", next);
            self.state = next;
        }
        &self.state
    }

    /// Drive the machine to a terminal state
    pub fn run(mut self) -> Result<MatchedCommand, CliError> {
        while !self.state.is_terminal() {
            self.step();
        }
        match self.state {
            MatchState::Done(matched) => {
                debug!(
                    "Matched '{}'",
                    self.tree.path_of(matched.node).join(" ")
                );
                Ok(matched)
            }
            MatchState::Error(err) => Err(err),
            _ => unreachable!("matcher stopped in a non-terminal state"),
        }
    }

    /// Walk path tokens only, stopping before parameter binding.
    ///
    /// Returns the reached node and the index of the first unconsumed token.
    pub fn locate(mut self) -> Result<(NodeId, usize), CliError> {
        loop {
            match self.state {
                MatchState::Matching { node, cursor } if cursor == self.tokens.len() => {
                    return Ok((node, cursor));
                }
                MatchState::Binding { node, cursor } => return Ok((node, cursor)),
                MatchState::Error(err) => return Err(err),
                MatchState::Done(matched) => return Ok((matched.node, matched.param_start)),
                MatchState::Matching { .. } => {
                    self.step();
                }
            }
        }
    }

    fn step_matching(&self, node: NodeId, cursor: usize) -> MatchState {
        let current = self.tree.node(node);
        // Binding requires at least one consumed path token; the context
        // node itself is never re-invoked implicitly.
        let can_bind = cursor > 0 && current.has_handler();

        let Some(token) = self.tokens.get(cursor) else {
            if can_bind {
                return MatchState::Binding { node, cursor };
            }
            return MatchState::Error(
                MatchError::IncompleteCommand {
                    path: self.tree.path_of(node),
                    position: self.line_len,
                }
                .into(),
            );
        };

        match resolve(self.tree, node, &token.text) {
            Resolution::Exact(child) | Resolution::Abbreviation(child) => MatchState::Matching {
                node: child,
                cursor: cursor + 1,
            },
            Resolution::NoMatch if can_bind => MatchState::Binding { node, cursor },
            Resolution::NoMatch => MatchState::Error(
                MatchError::UnknownCommand {
                    token: token.text.clone(),
                    position: token.offset,
                }
                .into(),
            ),
            Resolution::Ambiguous(candidates) => MatchState::Error(
                MatchError::AmbiguousCommand {
                    token: token.text.clone(),
                    position: token.offset,
                    candidates,
                }
                .into(),
            ),
        }
    }

    fn step_binding(&self, node: NodeId, cursor: usize) -> MatchState {
        let specs = self.tree.node(node).params();
        match bind(specs, &self.tokens[cursor..], self.line_len) {
            Ok(params) => MatchState::Done(MatchedCommand {
                node,
                params,
                param_start: cursor,
            }),
            Err(err) => MatchState::Error(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handler::text;
    use crate::core::params::ParamSpec;
    use crate::error::ParameterError;
    use crate::utils::tokenizer::{ShellTokenizer, Tokenizer};

    fn tree() -> CommandTree {
        let mut tree = CommandTree::new();
        tree.register(&["show"], vec![], text("show"), false).unwrap();
        tree.register(&["show", "version"], vec![], text("v1.0"), false).unwrap();
        tree.register(&["show", "vlan"], vec![ParamSpec::integer("id", 1, 4094)], text(""), false)
            .unwrap();
        tree.register(&["shutdown"], vec![], text(""), false).unwrap();
        tree.register(&["showall"], vec![], text(""), false).unwrap();
        tree.register(&["interface"], vec![ParamSpec::string("name")], text(""), true)
            .unwrap();
        tree.register(&["interface", "shutdown"], vec![], text(""), false).unwrap();
        tree.group(&["clear"], "Reset functions").unwrap();
        tree.register(&["clear", "counters"], vec![], text(""), false).unwrap();
        tree.freeze();
        tree
    }

    fn run_at(tree: &CommandTree, start: NodeId, line: &str) -> Result<MatchedCommand, CliError> {
        let tokens = ShellTokenizer::new().tokenize(line).unwrap();
        Matcher::new(tree, start, &tokens, line.len()).run()
    }

    fn run(tree: &CommandTree, line: &str) -> Result<MatchedCommand, CliError> {
        run_at(tree, NodeId::ROOT, line)
    }

    #[test]
    fn test_ambiguous_prefix_lists_candidates_in_order() {
        let tree = tree();
        match run(&tree, "sh") {
            Err(CliError::Match(MatchError::AmbiguousCommand { token, candidates, position })) => {
                assert_eq!(token, "sh");
                assert_eq!(position, 0);
                assert_eq!(candidates, ["show", "shutdown", "showall"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_match_beats_abbreviation() {
        let tree = tree();
        let matched = run(&tree, "show").unwrap();
        assert_eq!(matched.node, tree.lookup(&["show"]).unwrap());
    }

    #[test]
    fn test_unique_abbreviation() {
        let tree = tree();
        let matched = run(&tree, "shu").unwrap();
        assert_eq!(matched.node, tree.lookup(&["shutdown"]).unwrap());

        let matched = run(&tree, "show ver").unwrap();
        assert_eq!(matched.node, tree.lookup(&["show", "version"]).unwrap());
    }

    #[test]
    fn test_ambiguous_below_root() {
        let tree = tree();
        let err = run(&tree, "show v").unwrap_err();
        assert!(matches!(
            err,
            CliError::Match(MatchError::AmbiguousCommand { ref candidates, .. })
                if candidates == &["version", "vlan"]
        ));
    }

    #[test]
    fn test_unknown_command_carries_token_and_offset() {
        let tree = tree();
        let err = run(&tree, "show verison").unwrap_err();
        assert!(matches!(
            err,
            CliError::Match(MatchError::UnknownCommand { ref token, position: 5 }) if token == "verison"
        ));
    }

    #[test]
    fn test_unknown_at_handlerless_group() {
        let tree = tree();
        let err = run(&tree, "clear everything").unwrap_err();
        assert!(matches!(err, CliError::Match(MatchError::UnknownCommand { .. })));
    }

    #[test]
    fn test_incomplete_command() {
        let tree = tree();
        let err = run(&tree, "clear").unwrap_err();
        match err {
            CliError::Match(MatchError::IncompleteCommand { path, position }) => {
                assert_eq!(path, ["clear"]);
                assert_eq!(position, 5);
            }
            other => panic!("expected incomplete, got {other:?}"),
        }
    }

    #[test]
    fn test_handler_node_binds_unmatched_tokens() {
        let tree = tree();
        let matched = run(&tree, "interface Gi0/1").unwrap();
        assert_eq!(matched.node, tree.lookup(&["interface"]).unwrap());
        assert_eq!(matched.params.get_str("name"), Some("Gi0/1"));
        assert_eq!(matched.param_start, 1);
    }

    #[test]
    fn test_child_preferred_over_parameter() {
        let tree = tree();
        let matched = run(&tree, "interface shut").unwrap();
        assert_eq!(matched.node, tree.lookup(&["interface", "shutdown"]).unwrap());
    }

    #[test]
    fn test_binding_error_surfaces() {
        let tree = tree();
        let err = run(&tree, "show vlan 5000").unwrap_err();
        assert!(matches!(err, CliError::Parameter(ParameterError::OutOfRange { .. })));
        let err = run(&tree, "show vlan").unwrap_err();
        assert!(matches!(err, CliError::Parameter(ParameterError::MissingParameter { .. })));
        let err = run(&tree, "show version extra").unwrap_err();
        assert!(matches!(err, CliError::Parameter(ParameterError::ExtraArguments { .. })));
    }

    #[test]
    fn test_matching_starts_at_context() {
        let tree = tree();
        let iface = tree.lookup(&["interface"]).unwrap();
        let matched = run_at(&tree, iface, "shutdown").unwrap();
        assert_eq!(matched.node, tree.lookup(&["interface", "shutdown"]).unwrap());

        // the context node's own handler is not re-entered implicitly
        let err = run_at(&tree, iface, "Gi0/2").unwrap_err();
        assert!(matches!(err, CliError::Match(MatchError::UnknownCommand { .. })));
    }

    #[test]
    fn test_case_sensitive() {
        let tree = tree();
        assert!(run(&tree, "SHOW").is_err());
    }

    #[test]
    fn test_step_through_states() {
        let tree = tree();
        let tokens = ShellTokenizer::new().tokenize("show version").unwrap();
        let mut matcher = Matcher::new(&tree, NodeId::ROOT, &tokens, 12);

        assert!(matches!(matcher.step(), MatchState::Matching { cursor: 1, .. }));
        assert!(matches!(matcher.step(), MatchState::Matching { cursor: 2, .. }));
        assert!(matches!(matcher.step(), MatchState::Binding { cursor: 2, .. }));
        assert!(matches!(matcher.step(), MatchState::Done(_)));
        assert!(matcher.step().is_terminal());
    }

    #[test]
    fn test_locate_stops_before_binding() {
        let tree = tree();
        let tokens = ShellTokenizer::new().tokenize("interface Gi0/1").unwrap();
        let (node, cursor) = Matcher::new(&tree, NodeId::ROOT, &tokens, 15).locate().unwrap();
        assert_eq!(node, tree.lookup(&["interface"]).unwrap());
        assert_eq!(cursor, 1);
    }

    #[test]
    fn test_completions_filter_by_prefix() {
        let tree = tree();
        let names: Vec<&str> = completions(&tree, NodeId::ROOT, "sh")
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, ["show", "shutdown", "showall"]);
    }
}
