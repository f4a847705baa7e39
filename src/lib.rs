//! # netsim-cli
//!
//! An embeddable command interpreter for simulated network devices, in the
//! style of a router console. Commands live in a hierarchical tree and are
//! reached by unambiguous abbreviations. Some commands enter nested
//! configuration contexts that later lines resolve against.
//!
//! ## Features
//!
//! - Command tree registry with typed parameter specifications
//! - Quote and escape aware tokenizer
//! - Abbreviation matching with exact-match precedence
//! - Per-session context stacks over one shared, frozen tree
//! - Router-style diagnostics with a caret under the offending token
//!
//! ## Example
//!
//! ```no_run
//! use netsim_cli::core::{CommandTree, Interpreter, Output, handler};
//!
//! let mut tree = CommandTree::new();
//! tree.register(
//!     &["show", "version"],
//!     vec![],
//!     handler(|_, _| Ok(Output::text("v1.0"))),
//!     false,
//! )?;
//!
//! let interpreter = Interpreter::new(tree);
//! let mut session = interpreter.create_session();
//! let mut output = String::new();
//! let outcome = interpreter.execute("sh ver", &mut session, &mut output)?;
//! assert_eq!(outcome.output, "v1.0");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod device;
pub mod error;
pub mod utils;

pub use crate::core::{CommandTree, ExecutionOutcome, Interpreter, Session};
pub use crate::error::{CliError, Result};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging with appropriate verbosity.
///
/// Log lines go to stderr so console output on stdout stays clean.
pub fn setup_logging(debug: bool) -> anyhow::Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
