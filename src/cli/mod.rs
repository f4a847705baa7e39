//! Command-line interface module
//!
//! Provides argument parsing and the console, script and tree commands.

pub mod args;
pub mod commands;

pub use args::{Args, Command, parse_args};
pub use commands::{build_interpreter, console_loop, execute_command};
