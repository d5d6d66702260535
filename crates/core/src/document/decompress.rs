//! Post-parse stream externalization.
//!
//! Walks the top-level indirect objects, decodes the streams whose filter
//! is supported and writes every decodable payload to a file, replacing the
//! in-memory bytes with the file's path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::codec::{FLATE_DECODE, flatedecode};
use crate::error::Result;
use crate::model::{NodeId, Payload, Tree, Value};

/// Where the decompression pass writes payload files.
///
/// The directory must already exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompressOptions {
    pub output_dir: PathBuf,
}

impl DecompressOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

/// Filter declared by a stream's dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFilter {
    None,
    Flate,
    /// Anything else, rendered for reporting.
    Other(String),
}

/// What happened to one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Unfiltered payload written verbatim.
    Literal(PathBuf),
    /// Decoded payload written.
    Decoded(PathBuf),
    /// Filter is not implemented; payload left in memory.
    Unsupported(String),
    /// Supported filter, but the body did not decode; payload left in memory.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamReport {
    pub reference: String,
    pub outcome: StreamOutcome,
}

/// Per-stream outcomes, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecompressReport {
    pub streams: Vec<StreamReport>,
}

impl DecompressReport {
    /// Streams that were left in memory.
    pub fn skipped(&self) -> impl Iterator<Item = &StreamReport> {
        self.streams.iter().filter(|r| {
            matches!(
                r.outcome,
                StreamOutcome::Unsupported(_) | StreamOutcome::Failed(_)
            )
        })
    }

    /// Files written by the pass.
    pub fn written(&self) -> impl Iterator<Item = &Path> {
        self.streams.iter().filter_map(|r| match &r.outcome {
            StreamOutcome::Literal(path) | StreamOutcome::Decoded(path) => Some(path.as_path()),
            _ => None,
        })
    }
}

/// Externalize the streams of every top-level indirect object.
///
/// Unsupported filters and undecodable bodies are reported, never raised;
/// only failing to write an output file is an error.
pub fn decompress(tree: &mut Tree, options: &DecompressOptions) -> Result<DecompressReport> {
    let mut report = DecompressReport::default();

    for id in tree.children(tree.root()) {
        let Some((stream, entry)) = externalize(tree, id, &options.output_dir)? else {
            continue;
        };

        match &entry.outcome {
            StreamOutcome::Literal(path) | StreamOutcome::Decoded(path) => {
                tracing::debug!(reference = %entry.reference, path = %path.display(), "stream externalized");
                if let Value::Stream(s) = &mut tree.get_mut(stream).value {
                    s.payload = Payload::External(path.clone());
                }
            }
            StreamOutcome::Unsupported(filter) => {
                tracing::warn!(reference = %entry.reference, "decompressing with filter {filter} is not implemented");
            }
            StreamOutcome::Failed(reason) => {
                tracing::warn!(reference = %entry.reference, "stream did not decode: {reason}");
            }
        }
        report.streams.push(entry);
    }

    Ok(report)
}

/// Handle one top-level node; `None` when it carries no in-memory stream.
fn externalize(tree: &Tree, id: NodeId, dir: &Path) -> Result<Option<(NodeId, StreamReport)>> {
    let Value::IndirectObject(obj) = tree.value(id) else {
        return Ok(None);
    };
    let Some(stream_id) = obj.stream else {
        return Ok(None);
    };
    let Value::Stream(stream) = tree.value(stream_id) else {
        return Ok(None);
    };
    let (Some(data), Some(body)) = (stream.data(), stream.body()) else {
        // Already externalized by an earlier pass.
        return Ok(None);
    };

    let reference = obj.reference.to_string();
    let outcome = match stream_filter(tree, obj.object) {
        StreamFilter::None => {
            let path = dir.join(format!("{reference}.txt"));
            fs::write(&path, data)?;
            StreamOutcome::Literal(path)
        }
        StreamFilter::Flate => match flatedecode(body) {
            Ok(decoded) => {
                let path = dir.join(format!("{reference}.bin"));
                fs::write(&path, decoded)?;
                StreamOutcome::Decoded(path)
            }
            Err(e) => StreamOutcome::Failed(e.to_string()),
        },
        StreamFilter::Other(name) => StreamOutcome::Unsupported(name),
    };

    Ok(Some((
        stream_id,
        StreamReport { reference, outcome },
    )))
}

/// Read `/Filter` from an indirect object's dictionary.
pub fn stream_filter(tree: &Tree, object: Option<NodeId>) -> StreamFilter {
    let Some(Value::Dictionary(dict)) = object.map(|id| tree.value(id)) else {
        return StreamFilter::None;
    };
    let Some(filter) = dict.get("Filter") else {
        return StreamFilter::None;
    };

    let name = match tree.value(filter) {
        Value::Name(name) => Some(name.as_str()),
        Value::List(items) if items.len() == 1 => tree.name(items[0]),
        _ => None,
    };
    match name {
        Some(FLATE_DECODE) => StreamFilter::Flate,
        Some(other) => StreamFilter::Other(other.to_string()),
        None => StreamFilter::Other(render_filter(tree, filter)),
    }
}

fn render_filter(tree: &Tree, filter: NodeId) -> String {
    match tree.value(filter) {
        Value::List(items) => {
            let names: Vec<String> = items
                .iter()
                .map(|&item| tree.value(item).describe())
                .collect();
            format!("[{}]", names.join(" "))
        }
        other => other.describe(),
    }
}
