//! Line tokenization
//!
//! Splits a raw input line into tokens, honoring single- and double-quoted
//! spans and backslash escapes.

use crate::error::TokenizeError;
use std::iter::Peekable;
use std::str::CharIndices;
use tracing::trace;

/// One token of an input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Unquoted, unescaped text
    pub text: String,
    /// Byte offset of the token's first character in the source line
    pub offset: usize,
}

impl Token {
    /// Create a token at the given offset
    pub fn new(text: impl Into<String>, offset: usize) -> Self {
        Self {
            text: text.into(),
            offset,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Turns a raw line into an ordered sequence of tokens
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, line: &str) -> Result<Vec<Token>, TokenizeError>;
}

/// Shell-style tokenizer used by default
///
/// - whitespace separates tokens
/// - `'...'` is taken literally
/// - `"..."` allows `\"` and `\\` escapes
/// - outside quotes, `\` escapes the next character (quotes, whitespace, `\`)
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellTokenizer;

impl ShellTokenizer {
    pub fn new() -> Self {
        Self
    }

    fn read_single_quoted(
        chars: &mut Peekable<CharIndices<'_>>,
        buf: &mut String,
        open: usize,
    ) -> Result<(), TokenizeError> {
        for (_, c) in chars.by_ref() {
            if c == '\'' {
                return Ok(());
            }
            buf.push(c);
        }
        Err(TokenizeError::UnterminatedQuote {
            quote: '\'',
            offset: open,
        })
    }

    fn read_double_quoted(
        chars: &mut Peekable<CharIndices<'_>>,
        buf: &mut String,
        open: usize,
    ) -> Result<(), TokenizeError> {
        while let Some((_, c)) = chars.next() {
            match c {
                '"' => return Ok(()),
                '\\' => match chars.peek() {
                    Some(&(_, next @ ('"' | '\\'))) => {
                        buf.push(next);
                        chars.next();
                    }
                    _ => buf.push('\\'),
                },
                _ => buf.push(c),
            }
        }
        Err(TokenizeError::UnterminatedQuote {
            quote: '"',
            offset: open,
        })
    }
}

impl Tokenizer for ShellTokenizer {
    fn tokenize(&self, line: &str) -> Result<Vec<Token>, TokenizeError> {
        let mut tokens = Vec::new();
        let mut current: Option<Token> = None;
        let mut chars = line.char_indices().peekable();

        while let Some((idx, c)) = chars.next() {
            if c.is_whitespace() {
                if let Some(token) = current.take() {
                    tokens.push(token);
                }
                continue;
            }

            let token = current.get_or_insert_with(|| Token::new(String::new(), idx));
            match c {
                '\'' => Self::read_single_quoted(&mut chars, &mut token.text, idx)?,
                '"' => Self::read_double_quoted(&mut chars, &mut token.text, idx)?,
                '\\' => match chars.next() {
                    Some((_, escaped)) => token.text.push(escaped),
                    None => token.text.push('\\'),
                },
                _ => token.text.push(c),
            }
        }

        if let Some(token) = current {
            tokens.push(token);
        }

        trace!("Tokenized {:?} into {} token(s)", line, tokens.len());
        Ok(tokens)
    }
}

/// Texts of a token slice, for error payloads and vararg values
pub fn texts(tokens: &[Token]) -> Vec<String> {
    tokens.iter().map(|t| t.text.clone()).collect()
}
