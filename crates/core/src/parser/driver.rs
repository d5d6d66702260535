//! The driving parser loop.
//!
//! The active node of a live tree acts as the parse stack: at every step
//! the active composite either recognizes its terminator and closes, or one
//! of its candidate productions matches and the new node is admitted.

use std::io::Read;

use super::grammar::{self, Production};
use super::source::{ByteSource, MAX_WINDOW, MIN_LOOKAHEAD};
use crate::error::{Candidate, FailureKind, ParseFailure, PdfError, Result};
use crate::model::composite::{Fragment, Token};
use crate::model::{Kind, NodeId, Tree};
use crate::trace::{NoopSink, Phase, TraceEvent, TraceSink};

/// Bytes of unconsumed input shown in a parse failure.
const PREVIEW_LEN: usize = 20;

/// Parser configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Lookahead guaranteed before each step unless the input is exhausted.
    pub min_lookahead: usize,
    /// Window a refill grows to. A token that does not fit doubles it.
    pub max_window: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            min_lookahead: MIN_LOOKAHEAD,
            max_window: MAX_WINDOW,
        }
    }
}

/// Single-pass parser from a byte source to a [`Tree`].
pub struct TreeParser<R, S = NoopSink> {
    source: ByteSource<R>,
    tree: Tree,
    active: NodeId,
    /// Literal string closed by the most recent step, if any.
    closed_string: Option<NodeId>,
    sink: S,
}

impl<R: Read> TreeParser<R> {
    pub fn new(reader: R, options: ParseOptions) -> Self {
        Self::with_sink(reader, options, NoopSink)
    }
}

impl<R: Read, S: TraceSink> TreeParser<R, S> {
    pub fn with_sink(reader: R, options: ParseOptions, sink: S) -> Self {
        let tree = Tree::new();
        let active = tree.root();
        Self {
            source: ByteSource::with_limits(reader, options.min_lookahead, options.max_window),
            tree,
            active,
            closed_string: None,
            sink,
        }
    }

    /// Run the loop to the end of input.
    pub fn parse(mut self) -> Result<Tree> {
        loop {
            self.source.fill()?;
            let at_eof = self.source.at_eof();

            let close = self
                .tree
                .should_close(self.active, self.source.window(), at_eof);
            if let Some(len) = close {
                if !self.close(len)? {
                    break;
                }
                continue;
            }

            let window = self.source.window();
            let matched = grammar::context(self.tree.kind(self.active))
                .iter()
                .map(|id| id.production())
                .find_map(|p| p.matches(window, at_eof).map(|len| (p, len)));

            match matched {
                Some((production, len)) => self.step(production, len)?,
                None => {
                    if let Some(string) = self.closed_string.filter(|_| window.starts_with(b")")) {
                        return Err(PdfError::UnbalancedParenthesis {
                            offset: self.tree.get(string).start,
                        });
                    }
                    if at_eof {
                        return Err(self.failure(stuck_kind(window)).into());
                    }
                    self.source.grow()?;
                }
            }
        }

        if !self.source.is_exhausted() {
            return Err(self.failure(FailureKind::TrailingBytes).into());
        }
        Ok(self.tree)
    }

    /// Consume `len` bytes for `production` and admit the result.
    fn step(&mut self, production: &'static Production, len: usize) -> Result<()> {
        let start = self.source.position();
        let raw = self.source.consume(len);
        let token = production.convert(&raw);
        self.closed_string = None;

        if self.sink.enabled() {
            let event = TraceEvent {
                phase: Phase::Opened,
                offset: start,
                size: raw.len(),
                depth: self.tree.depth(self.active) + 1,
                kind: production.name,
                trivial: production.trivial,
                summary: summarize(&token),
            };
            self.sink.node_opened(&event);
        }

        self.active = self.tree.admit(self.active, start, raw.len(), token)?;
        Ok(())
    }

    /// Close the active node; false once the document root has closed.
    fn close(&mut self, len: usize) -> Result<bool> {
        let start = self.source.position();
        let terminator = self.source.consume(len);
        let closed = self.active;
        let parent = self.tree.close(closed, &terminator, start)?;
        self.closed_string = (self.tree.kind(closed) == Kind::LiteralString).then_some(closed);

        if self.sink.enabled() {
            let node = self.tree.get(closed);
            let event = TraceEvent {
                phase: Phase::Closed,
                offset: node.start,
                size: node.size,
                depth: self.tree.depth(closed),
                kind: node.kind().name(),
                trivial: false,
                summary: node.value.describe(),
            };
            self.sink.node_closed(&event);
        }

        match parent {
            Some(parent) => {
                self.active = parent;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn failure(&self, kind: FailureKind) -> ParseFailure {
        let window = self.source.window();
        let candidates = match kind {
            FailureKind::TrailingBytes => Vec::new(),
            _ => grammar::context(self.tree.kind(self.active))
                .iter()
                .map(|id| {
                    let p = id.production();
                    Candidate {
                        name: p.name,
                        pattern: p.pattern,
                    }
                })
                .collect(),
        };
        ParseFailure {
            kind,
            offset: self.source.position(),
            path: self.tree.path(self.active),
            partial: self.tree.value(self.active).describe(),
            preview: window[..window.len().min(PREVIEW_LEN)].to_vec(),
            candidates,
        }
    }
}

/// Failure kind once the whole remaining input is in the window.
fn stuck_kind(window: &[u8]) -> FailureKind {
    if window.is_empty() {
        FailureKind::Truncated
    } else {
        FailureKind::NoMatch
    }
}

fn summarize(token: &Token) -> String {
    match token {
        Token::Value(value) if value.kind().is_composite() => String::new(),
        Token::Value(value) => value.describe(),
        Token::Fragment(Fragment::Paren(b) | Fragment::Escape(b)) => {
            format!("b\"{}\"", [*b].escape_ascii())
        }
        Token::Fragment(Fragment::Chars(chars)) => format!("b\"{}\"", chars.escape_ascii()),
        Token::Fragment(Fragment::StreamData(chunk)) => format!("{} bytes", chunk.len()),
    }
}

/// Parse everything `reader` yields into a tree.
pub fn parse<R: Read>(reader: R, options: ParseOptions) -> Result<Tree> {
    TreeParser::new(reader, options).parse()
}

/// Parse an in-memory buffer with default options.
pub fn parse_bytes(data: &[u8]) -> Result<Tree> {
    parse(data, ParseOptions::default())
}
