//! Parsed PDF document.
//!
//! This module contains:
//! - `decompress` - stream externalization pass
//! - `layout` - top-level span classification

pub mod decompress;
pub mod layout;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::converter::{self, KeyWarning};
use crate::error::Result;
use crate::model::{NodeId, Tree, Value};
use crate::parser::{ParseOptions, TreeParser};
use crate::trace::TraceSink;

// Re-export main types for convenience
pub use decompress::{
    DecompressOptions, DecompressReport, StreamFilter, StreamOutcome, StreamReport, stream_filter,
};
pub use layout::{Category, LayoutEntry};

/// A fully parsed PDF file.
///
/// # Example
///
/// ```
/// use pdfscope_core::Document;
///
/// let doc = Document::from_bytes(b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n")?;
/// assert_eq!(doc.indirect_objects().count(), 1);
/// # Ok::<(), pdfscope_core::PdfError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    tree: Tree,
}

impl Document {
    /// Parse the file at `path` with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), ParseOptions::default())
    }

    pub fn from_reader<R: Read>(reader: R, options: ParseOptions) -> Result<Self> {
        let tree = TreeParser::new(reader, options).parse()?;
        Ok(Self { tree })
    }

    /// Parse while reporting node events to `sink`.
    pub fn from_reader_with_sink<R: Read, S: TraceSink>(
        reader: R,
        options: ParseOptions,
        sink: S,
    ) -> Result<Self> {
        let tree = TreeParser::with_sink(reader, options, sink).parse()?;
        Ok(Self { tree })
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_reader(data, ParseOptions::default())
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Total number of bytes parsed.
    pub fn size(&self) -> usize {
        self.tree.get(self.tree.root()).size
    }

    /// Recorded top-level constructs, whitespace excluded.
    pub fn top_level(&self) -> Vec<NodeId> {
        self.tree.children(self.tree.root())
    }

    /// Top-level indirect objects, in file order.
    pub fn indirect_objects(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.top_level()
            .into_iter()
            .filter(|&id| matches!(self.tree.value(id), Value::IndirectObject(_)))
    }

    /// Write stream payloads out to `options.output_dir`.
    pub fn decompress(&mut self, options: &DecompressOptions) -> Result<DecompressReport> {
        decompress::decompress(&mut self.tree, options)
    }

    pub fn to_json(&self) -> serde_json::Value {
        converter::to_json(&self.tree)
    }

    pub fn to_json_with_warnings(&self) -> (serde_json::Value, Vec<KeyWarning>) {
        converter::to_json_with_warnings(&self.tree)
    }

    pub fn layout(&self) -> Vec<LayoutEntry> {
        layout::layout(&self.tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}

    #[test]
    fn test_document_is_send() {
        assert_send::<Document>();
    }

    #[test]
    fn test_size_covers_input() {
        let data = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n";
        let doc = Document::from_bytes(data).unwrap();
        assert_eq!(doc.size(), data.len());
        assert_eq!(doc.top_level().len(), 2);
    }
}
