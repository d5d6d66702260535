//! pdfscope - structural PDF parsing with exact byte provenance.
//!
//! Parses a PDF byte stream into an object tree in which every node keeps
//! the offset and length of the bytes it was built from, without relying
//! on any cross-reference data.

pub mod codec;
pub mod converter;
pub mod document;
pub mod error;
pub mod model;
pub mod parser;
pub mod trace;

pub use document::{DecompressOptions, DecompressReport, Document, StreamOutcome};
pub use error::{PdfError, Result};
pub use model::{Kind, Node, NodeId, Tree, Value};
pub use parser::{ParseOptions, parse, parse_bytes};
pub use trace::{NoopSink, RecordingSink, TraceEvent, TraceSink, TracingSink};
