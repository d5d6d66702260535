//! Error types for the pdfscope parser.

use std::fmt;
use thiserror::Error;

/// Primary error type for parsing and decompression.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("{0}")]
    Parse(Box<ParseFailure>),

    #[error("indirect object {reference} already holds a {slot} value")]
    SlotConflict {
        reference: String,
        slot: &'static str,
    },

    #[error("unbalanced closing parenthesis after literal string at position {offset:x}")]
    UnbalancedParenthesis { offset: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias for PdfError.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Why the driving loop gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Neither the close test nor any candidate production matched.
    NoMatch,
    /// The source ran dry while a composite other than the document was open.
    Truncated,
    /// The document closed but bytes remain in the source.
    TrailingBytes,
}

/// A production that was tried and failed at the failure point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: &'static str,
    pub pattern: &'static str,
}

/// Everything needed to diagnose a failed parse without re-running it.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    pub kind: FailureKind,
    /// Byte offset of the cursor when parsing stopped.
    pub offset: usize,
    /// Dotted path from the document root to the active node.
    pub path: String,
    /// Rendering of the active node's partially accumulated value.
    pub partial: String,
    /// The first bytes of the unconsumed buffer.
    pub preview: Vec<u8>,
    pub candidates: Vec<Candidate>,
}

impl ParseFailure {
    /// Structured notes, one per line, in the order a reader needs them.
    pub fn notes(&self) -> Vec<String> {
        let mut notes = vec![
            format!("{:<25} {:x}", "Byte position:", self.offset),
            format!("{:<25} {}", "Current context:", self.path),
            format!("{:<25} {}", "Current data:", self.partial),
            format!("{:<25} {}", "Buffer:", escape_preview(&self.preview)),
        ];
        if !self.candidates.is_empty() {
            notes.push("Possible matches:".to_string());
            for candidate in &self.candidates {
                notes.push(format!("{:<25} {}", candidate.name, candidate.pattern));
            }
        }
        notes
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::NoMatch => write!(
                f,
                "could not parse symbols at byte position {:x} in {}",
                self.offset, self.path
            ),
            FailureKind::Truncated => write!(
                f,
                "input ended at byte position {:x} while {} was still open",
                self.offset, self.path
            ),
            FailureKind::TrailingBytes => write!(
                f,
                "document ended before the end of the input at byte position {:x}",
                self.offset
            ),
        }
    }
}

impl From<ParseFailure> for PdfError {
    fn from(failure: ParseFailure) -> Self {
        PdfError::Parse(Box::new(failure))
    }
}

/// Render bytes as printable ASCII, escaping everything else.
pub(crate) fn escape_preview(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}
