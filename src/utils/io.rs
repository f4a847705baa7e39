//! Caller-supplied I/O capabilities
//!
//! The interpreter never touches a terminal or socket directly. Lines come
//! from a [`LineSource`] and rendered output goes to an [`OutputSink`].

use std::io::{self, BufRead, Write};

/// Destination for rendered command output
pub trait OutputSink {
    fn write(&mut self, text: &str) -> io::Result<()>;
}

impl OutputSink for String {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.push_str(text);
        Ok(())
    }
}

/// Discards everything written to it
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn write(&mut self, _text: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Adapts any [`io::Write`] into an output sink, flushing after each write
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    inner: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> OutputSink for WriterSink<W> {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.inner.write_all(text.as_bytes())?;
        self.inner.flush()
    }
}

/// Supplier of input lines
pub trait LineSource {
    /// Next line without its terminator, or `None` at end of input
    fn next_line(&mut self) -> io::Result<Option<String>>;
}

/// Reads lines from any buffered reader
#[derive(Debug)]
pub struct ReaderSource<R: BufRead> {
    reader: R,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

/// Replays a fixed list of lines
#[derive(Debug, Default)]
pub struct ScriptSource {
    lines: std::collections::VecDeque<String>,
}

impl ScriptSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl LineSource for ScriptSource {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}
