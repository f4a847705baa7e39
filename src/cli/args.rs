//! Command-line argument parsing and validation

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Simulated router console driven by the netsim command interpreter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "simcli")]
pub struct Args {
    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Initial device hostname
    #[arg(long, global = true)]
    pub hostname: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive console on stdin/stdout
    Console,

    /// Execute a script of console lines
    Run {
        /// Script file, one console line per line
        script: PathBuf,

        /// Report failing lines and continue
        #[arg(short = 'k', long)]
        keep_going: bool,

        /// Echo each line after its prompt
        #[arg(short = 'e', long)]
        echo: bool,
    },

    /// Print the registered command tree
    Tree,
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    Args::parse()
}
