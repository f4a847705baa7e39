//! Line execution
//!
//! The [`Interpreter`] owns the frozen command tree and the tokenizer. It
//! runs one input line for one session: tokenize, match, bind, invoke the
//! handler, then apply the requested context change.

use crate::core::context::Context;
use crate::core::handler::Transition;
use crate::core::matcher::{Matcher, completions};
use crate::core::params::BoundParams;
use crate::core::session::{Session, SessionId};
use crate::core::tree::{CommandTree, NodeId};
use crate::error::{CliError, HandlerError, MatchError, Result, SessionError};
use crate::utils::io::{LineSource, OutputSink};
use crate::utils::tokenizer::{ShellTokenizer, Token, Tokenizer};
use std::any::Any;
use std::fmt::Write as _;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, instrument, warn};

/// Result of one executed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Text produced by the handler, verbatim
    pub output: String,
    /// Label of the session's context after the line ran
    pub context_label: String,
}

/// One row of a `?` listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpEntry {
    pub name: String,
    pub help: String,
}

/// Options for [`Interpreter::run`]
#[derive(Default)]
pub struct RunOptions<'a> {
    /// Report line-local errors to the sink and continue instead of stopping
    pub keep_going: bool,
    /// Echo each line after the prompt this closure renders
    pub echo: Option<&'a dyn Fn(&Session) -> String>,
}

/// Counters reported by [`Interpreter::run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: usize,
    pub failed: usize,
}

/// Context mutation validated before any output is written
enum PlannedTransition {
    None,
    Push(Context),
    Pop,
    Reset,
}

/// Command interpreter shared by any number of sessions
pub struct Interpreter {
    tree: Arc<CommandTree>,
    tokenizer: Arc<dyn Tokenizer>,
    comment_prefixes: Vec<String>,
    next_session: AtomicU64,
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("nodes", &self.tree.len())
            .field("comment_prefixes", &self.comment_prefixes)
            .finish_non_exhaustive()
    }
}

impl Interpreter {
    /// Freeze `tree` and build an interpreter around it
    pub fn new(mut tree: CommandTree) -> Self {
        tree.freeze();
        info!("Command interpreter ready with {} node(s)", tree.len());
        Self {
            tree: Arc::new(tree),
            tokenizer: Arc::new(ShellTokenizer::new()),
            comment_prefixes: vec!["!".to_string(), "#".to_string()],
            next_session: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: impl Tokenizer + 'static) -> Self {
        self.tokenizer = Arc::new(tokenizer);
        self
    }

    /// Lines whose first token starts with one of these prefixes are ignored
    #[must_use]
    pub fn with_comment_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.comment_prefixes = prefixes;
        self
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    /// New session positioned at the root
    pub fn create_session(&self) -> Session {
        let id = SessionId::new(self.next_session.fetch_add(1, Ordering::Relaxed));
        debug!("Created {}", id);
        Session::new(id)
    }

    /// Release a session. The command tree is unaffected.
    pub fn destroy_session(&self, session: Session) {
        debug!("Destroyed {}", session.id());
        drop(session);
    }

    /// Execute one line for `session`, writing handler output to `sink`.
    ///
    /// On any error the session's context stack is left as it was.
    #[instrument(level = "debug", skip(self, session, sink), fields(session = %session.id()))]
    pub fn execute(
        &self,
        line: &str,
        session: &mut Session,
        sink: &mut dyn OutputSink,
    ) -> Result<ExecutionOutcome> {
        let tokens = self.tokenizer.tokenize(line)?;
        if self.is_blank_or_comment(&tokens) {
            return Ok(self.outcome(String::new(), session));
        }

        if let Some(partial) = line.trim_end().strip_suffix('?') {
            let listing = render_help(&self.help(partial, session)?);
            sink.write(&listing)?;
            return Ok(self.outcome(listing, session));
        }

        let start = session.current().node();
        let matched = Matcher::new(&self.tree, start, &tokens, line.len()).run()?;
        let node = self.tree.node(matched.node);
        let command = self.tree.path_of(matched.node).join(" ");
        let handler = node.handler().ok_or_else(|| MatchError::IncompleteCommand {
            path: self.tree.path_of(matched.node),
            position: line.len(),
        })?;

        let invoked = panic::catch_unwind(AssertUnwindSafe(|| {
            handler.invoke(&matched.params, session.current())
        }));
        let output = match invoked {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                debug!("Handler for '{}' failed: {:#}", command, source);
                return Err(HandlerError::new(command, source).into());
            }
            Err(payload) => {
                warn!("Handler for '{}' panicked", command);
                let source = anyhow::anyhow!("handler panicked: {}", panic_message(&*payload));
                return Err(HandlerError::new(command, source).into());
            }
        };

        let planned = self.plan_transition(matched.node, matched.params, output.transition, session)?;
        if !output.text.is_empty() {
            sink.write(&output.text)?;
        }
        self.commit(planned, session);

        Ok(self.outcome(output.text, session))
    }

    /// Candidates for completing `partial` from the session's current context.
    ///
    /// All tokens but an unfinished last one are matched as a path; the
    /// children of the reached node that start with the unfinished token are
    /// listed in insertion order.
    pub fn help(&self, partial: &str, session: &Session) -> Result<Vec<HelpEntry>> {
        let mut tokens = self.tokenizer.tokenize(partial)?;
        let open = partial.is_empty() || partial.ends_with(char::is_whitespace);
        let prefix = if open {
            String::new()
        } else {
            tokens.pop().map(|t| t.text).unwrap_or_default()
        };

        let start = session.current().node();
        let (id, cursor) = Matcher::new(&self.tree, start, &tokens, partial.len()).locate()?;
        let node = self.tree.node(id);
        let reached_command = cursor > 0 && node.has_handler();

        if cursor < tokens.len() {
            return Ok(vec![usage_entry(&self.tree, id)]);
        }

        let mut entries: Vec<HelpEntry> = completions(&self.tree, id, &prefix)
            .into_iter()
            .map(|(name, child)| HelpEntry {
                name: name.to_string(),
                help: self.tree.node(child).help().unwrap_or_default().to_string(),
            })
            .collect();

        if reached_command && (prefix.is_empty() || entries.is_empty()) {
            if node.params().is_empty() {
                entries.push(HelpEntry {
                    name: "<cr>".to_string(),
                    help: String::new(),
                });
            } else {
                entries.push(usage_entry(&self.tree, id));
            }
        }
        Ok(entries)
    }

    /// Execute every line from `source` until it is exhausted
    pub fn run(
        &self,
        source: &mut dyn LineSource,
        session: &mut Session,
        sink: &mut dyn OutputSink,
        options: &RunOptions<'_>,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        while let Some(line) = source.next_line()? {
            if let Some(prompt) = options.echo {
                sink.write(&format!("{}{}\n", prompt(session), line))?;
            }

            match self.execute(&line, session, sink) {
                Ok(outcome) => {
                    summary.executed += 1;
                    if !outcome.output.is_empty() && !outcome.output.ends_with('\n') {
                        sink.write("\n")?;
                    }
                }
                Err(err) if options.keep_going && err.is_line_local() => {
                    summary.failed += 1;
                    sink.write(&format!("{}\n", err.render(&line)))?;
                }
                Err(err) => return Err(err),
            }
        }

        debug!(
            "Run finished: {} executed, {} failed",
            summary.executed, summary.failed
        );
        Ok(summary)
    }

    fn is_blank_or_comment(&self, tokens: &[Token]) -> bool {
        match tokens.first() {
            None => true,
            Some(first) => self
                .comment_prefixes
                .iter()
                .any(|prefix| first.text.starts_with(prefix.as_str())),
        }
    }

    fn plan_transition(
        &self,
        id: NodeId,
        params: BoundParams,
        transition: Transition,
        session: &Session,
    ) -> Result<PlannedTransition> {
        let node = self.tree.node(id);
        let transition = match transition {
            Transition::Stay if node.is_context_entering() => Transition::Enter { label: None },
            other => other,
        };

        let planned = match transition {
            Transition::Stay => PlannedTransition::None,
            Transition::Enter { label } if node.is_context_entering() => {
                let label = label.unwrap_or_else(|| node.context_label().to_string());
                PlannedTransition::Push(Context::with_params(id, label, params))
            }
            Transition::Enter { .. } => {
                warn!(
                    "Ignoring context entry requested by '{}', which does not enter a context",
                    self.tree.path_of(id).join(" ")
                );
                PlannedTransition::None
            }
            Transition::Exit if session.contexts().depth() == 1 => {
                return Err(CliError::Session(SessionError::CannotExitRoot));
            }
            Transition::Exit => PlannedTransition::Pop,
            Transition::Reset => PlannedTransition::Reset,
        };
        Ok(planned)
    }

    fn commit(&self, planned: PlannedTransition, session: &mut Session) {
        let contexts = session.contexts_mut();
        match planned {
            PlannedTransition::None => {}
            PlannedTransition::Push(context) => {
                contexts.push_context(context);
                debug_assert!(contexts.depth() <= self.tree.depth() + 1);
            }
            PlannedTransition::Pop => {
                if let Err(err) = contexts.pop() {
                    warn!("Context pop rejected after planning: {}", err);
                }
            }
            PlannedTransition::Reset => contexts.reset(),
        }
    }

    fn outcome(&self, output: String, session: &Session) -> ExecutionOutcome {
        ExecutionOutcome {
            output,
            context_label: session.current().label().to_string(),
        }
    }
}

fn usage_entry(tree: &CommandTree, id: NodeId) -> HelpEntry {
    let node = tree.node(id);
    HelpEntry {
        name: node.usage(),
        help: node.help().unwrap_or_default().to_string(),
    }
}

/// Two-column listing of help entries
pub fn render_help(entries: &[HelpEntry]) -> String {
    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for entry in entries {
        if entry.help.is_empty() {
            let _ = writeln!(out, "  {}", entry.name);
        } else {
            let _ = writeln!(out, "  {:<width$}  {}", entry.name, entry.help);
        }
    }
    out
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
