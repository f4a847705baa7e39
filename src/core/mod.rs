//! Command interpreter engine
//!
//! Contains the command tree, the matching state machine, the parameter
//! binder, per-session context stacks and the executor.

pub mod context;
pub mod executor;
pub mod handler;
pub mod matcher;
pub mod params;
pub mod session;
pub mod tree;

pub use context::{Context, ContextStack};
pub use executor::{ExecutionOutcome, HelpEntry, Interpreter, RunOptions, RunSummary};
pub use handler::{Handler, Output, Transition, handler};
pub use matcher::{MatchState, MatchedCommand, Matcher, Resolution};
pub use params::{BoundParams, ParamKind, ParamSpec, ParamValue};
pub use session::{Session, SessionId};
pub use tree::{CommandNode, CommandTree, NodeId};
