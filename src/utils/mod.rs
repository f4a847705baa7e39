//! Collaborator utilities
//!
//! Provides the line tokenizer and the caller-supplied I/O abstractions.

pub mod io;
pub mod tokenizer;

pub use io::{LineSource, NullSink, OutputSink, ReaderSource, ScriptSource, WriterSink};
pub use tokenizer::{ShellTokenizer, Token, Tokenizer};
