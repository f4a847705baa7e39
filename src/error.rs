//! Error types for the command interpreter
//!
//! Every failure carries the structured data needed to render a precise
//! diagnostic (offending token, byte offset, candidate lists) without
//! re-deriving it from the raw line.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed input line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// A quoted span was opened but never closed
    #[error("unterminated {quote} quote starting at offset {offset}")]
    UnterminatedQuote { quote: char, offset: usize },
}

/// Failures while building the command tree. Fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The full path already has a handler bound
    #[error("duplicate command: {}", path.join(" "))]
    DuplicateCommand { path: Vec<String> },

    /// The parameter list violates the vararg/required ordering rules
    #[error("invalid parameter spec for '{}': {reason}", path.join(" "))]
    InvalidParamSpec { path: Vec<String>, reason: String },

    /// The tree has been frozen and no longer accepts registrations
    #[error("command tree is frozen; cannot register '{}'", path.join(" "))]
    TreeFrozen { path: Vec<String> },

    /// The root node cannot carry a handler
    #[error("cannot register a command with an empty path")]
    EmptyPath,

    /// Command names must be non-empty and free of whitespace
    #[error("invalid command name: {name:?}")]
    InvalidName { name: String },
}

/// Failures while walking the tree with path tokens
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// No child matches the token, exactly or as a prefix
    #[error("unknown command '{token}' at offset {position}")]
    UnknownCommand { token: String, position: usize },

    /// The token is a prefix of more than one child
    #[error("ambiguous command '{token}': {}", candidates.join(", "))]
    AmbiguousCommand {
        token: String,
        position: usize,
        candidates: Vec<String>,
    },

    /// The tokens ran out on a node without a handler
    #[error("incomplete command: {}", path.join(" "))]
    IncompleteCommand { path: Vec<String>, position: usize },
}

/// Failures while binding trailing tokens to a node's parameters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    /// A required parameter has no corresponding token
    #[error("missing parameter <{spec_name}>")]
    MissingParameter { spec_name: String, position: usize },

    /// Tokens remain after every parameter was bound
    #[error("unexpected arguments: {}", tokens.join(" "))]
    ExtraArguments { tokens: Vec<String>, position: usize },

    /// The token does not parse as the expected kind
    #[error("invalid value '{token}', expected {expected_kind}")]
    InvalidParameter {
        token: String,
        expected_kind: String,
        position: usize,
    },

    /// An integer token outside its declared bounds
    #[error("value {token} out of range [{min}, {max}]")]
    OutOfRange {
        token: String,
        min: i64,
        max: i64,
        position: usize,
    },
}

/// A failure raised by a command's own handler logic
#[derive(Error, Debug)]
#[error("command '{command}' failed: {source}")]
pub struct HandlerError {
    /// Space-joined path of the command that failed
    pub command: String,
    #[source]
    pub source: anyhow::Error,
}

impl HandlerError {
    /// Wrap a handler failure for the given command path
    pub fn new(command: impl Into<String>, source: anyhow::Error) -> Self {
        Self {
            command: command.into(),
            source,
        }
    }
}

/// Context stack misuse
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// `pop` on a stack holding only the root entry
    #[error("cannot exit the root context")]
    CannotExitRoot,
}

/// Invalid or unreadable console configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("configuration error: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Main error type returned by the execution API
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The caller-supplied output sink rejected a write
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

impl CliError {
    /// Byte offset in the input line the error points at, if any
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Tokenize(TokenizeError::UnterminatedQuote { offset, .. }) => Some(*offset),
            Self::Match(
                MatchError::UnknownCommand { position, .. }
                | MatchError::AmbiguousCommand { position, .. }
                | MatchError::IncompleteCommand { position, .. },
            ) => Some(*position),
            Self::Parameter(
                ParameterError::MissingParameter { position, .. }
                | ParameterError::ExtraArguments { position, .. }
                | ParameterError::InvalidParameter { position, .. }
                | ParameterError::OutOfRange { position, .. },
            ) => Some(*position),
            _ => None,
        }
    }

    /// Whether the error only affects the current line and leaves the session usable
    pub fn is_line_local(&self) -> bool {
        !matches!(self, Self::Registration(_) | Self::Output(_))
    }

    /// Render a router-style diagnostic with a caret under the offending offset
    pub fn render(&self, line: &str) -> String {
        let summary = match self {
            Self::Match(MatchError::AmbiguousCommand { token, .. }) => {
                format!("% Ambiguous command: \"{token}\"")
            }
            Self::Match(MatchError::IncompleteCommand { .. }) => "% Incomplete command.".to_string(),
            Self::Match(MatchError::UnknownCommand { .. }) | Self::Parameter(_) => {
                format!("% Invalid input detected at '^' marker. ({self})")
            }
            other => format!("% {other}"),
        };

        let with_caret = matches!(
            self,
            Self::Tokenize(_) | Self::Match(MatchError::UnknownCommand { .. }) | Self::Parameter(_)
        );

        match self.position() {
            Some(position) if with_caret => {
                let column = line
                    .char_indices()
                    .take_while(|(idx, _)| *idx < position)
                    .count();
                format!("{line}\n{}^\n{summary}", " ".repeat(column))
            }
            _ => summary,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_unknown_command_points_at_token() {
        let err = CliError::from(MatchError::UnknownCommand {
            token: "verison".to_string(),
            position: 5,
        });
        let rendered = err.render("show verison");
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some("show verison"));
        assert_eq!(lines.next(), Some("     ^"));
        assert!(lines.next().unwrap().starts_with("% Invalid input detected"));
    }

    #[test]
    fn test_render_ambiguous_has_no_caret() {
        let err = CliError::from(MatchError::AmbiguousCommand {
            token: "sh".to_string(),
            position: 0,
            candidates: vec!["show".to_string(), "shutdown".to_string()],
        });
        assert_eq!(err.render("sh"), "% Ambiguous command: \"sh\"");
    }

    #[test]
    fn test_handler_error_keeps_source() {
        let err = HandlerError::new("show version", anyhow::anyhow!("boom"));
        assert_eq!(err.to_string(), "command 'show version' failed: boom");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_line_local_classification() {
        assert!(CliError::from(SessionError::CannotExitRoot).is_line_local());
        assert!(!CliError::from(RegistrationError::EmptyPath).is_line_local());
    }
}
