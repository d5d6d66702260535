//! Coarse classification of top-level byte spans.
//!
//! Every top-level node, whitespace included, gets a [`Category`] so that a
//! renderer can chart how a file's bytes are spent.

use std::fmt;

use crate::model::{Kind, NodeId, Tree, Value};

/// What a top-level span holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    /// Header or comment.
    Comment,
    Whitespace,
    /// Cross-reference table, trailer, `startxref` offset or EOF marker.
    DataIndex,
    List,
    /// Number, boolean, null or hexadecimal string.
    Primitive,
    Catalog,
    /// `Outlines` or `Pages`.
    DocumentStructure,
    Page,
    /// `Font` or `FontDescriptor`.
    Font,
    /// Dictionary with some other `/Type`.
    OtherTyped(String),
    /// Dictionary carrying a `/Filter`.
    CompressedData,
    /// Dictionary carrying a `/Length`, or a stream with no dictionary.
    StreamData,
    /// Dictionary carrying a `/Creator`.
    AuthorInfo,
    /// Dictionary with none of the keys above.
    UnspecifiedDict,
    /// Anything the rules above do not cover.
    Unspecified(Kind),
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Comment => "Comment",
            Category::Whitespace => "Whitespace",
            Category::DataIndex => "Data Index",
            Category::List => "List",
            Category::Primitive => "Primitive",
            Category::Catalog => "Catalog",
            Category::DocumentStructure => "Document Structure",
            Category::Page => "Page",
            Category::Font => "Font",
            Category::OtherTyped(_) => "Other indirect data",
            Category::CompressedData => "Compressed Data",
            Category::StreamData => "Stream Data",
            Category::AuthorInfo => "Author info",
            Category::UnspecifiedDict => "Unspecified Dict",
            Category::Unspecified(_) => "Unspecified",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::OtherTyped(ty) => write!(f, "{} ({ty})", self.label()),
            Category::Unspecified(kind) => write!(f, "{} ({kind})", self.label()),
            _ => f.write_str(self.label()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEntry {
    pub start: usize,
    pub size: usize,
    pub category: Category,
}

/// Classify every top-level span in source order.
pub fn layout(tree: &Tree) -> Vec<LayoutEntry> {
    tree.spans(tree.root())
        .into_iter()
        .map(|id| {
            let node = tree.get(id);
            LayoutEntry {
                start: node.start,
                size: node.size,
                category: classify(tree, id),
            }
        })
        .collect()
}

/// Category of one top-level node.
pub fn classify(tree: &Tree, id: NodeId) -> Category {
    match tree.value(id) {
        Value::Header(_) | Value::Comment(_) => Category::Comment,
        Value::Whitespace(_) => Category::Whitespace,
        Value::XrefTable(_) | Value::Trailer(_) | Value::XrefOffset(_) | Value::EndOfFile(_) => {
            Category::DataIndex
        }
        Value::IndirectObject(obj) => match (obj.object, obj.stream) {
            (Some(object), _) => classify_object(tree, object),
            (None, Some(_)) => Category::StreamData,
            (None, None) => Category::Unspecified(Kind::IndirectObject),
        },
        other => Category::Unspecified(other.kind()),
    }
}

fn classify_object(tree: &Tree, object: NodeId) -> Category {
    match tree.value(object) {
        Value::List(_) => Category::List,
        Value::Number(_) | Value::Boolean(_) | Value::Null | Value::HexString(_) => {
            Category::Primitive
        }
        Value::Dictionary(dict) => {
            // First recognized key wins, in dictionary order.
            for (key, entry) in dict.iter() {
                match key.as_name() {
                    Some("Type") => return classify_type(tree, entry.value),
                    Some("Filter") => return Category::CompressedData,
                    Some("Length") => return Category::StreamData,
                    Some("Creator") => return Category::AuthorInfo,
                    _ => {}
                }
            }
            Category::UnspecifiedDict
        }
        other => Category::Unspecified(other.kind()),
    }
}

fn classify_type(tree: &Tree, value: NodeId) -> Category {
    match tree.name(value) {
        Some("Catalog") => Category::Catalog,
        Some("Outlines" | "Pages") => Category::DocumentStructure,
        Some("Page") => Category::Page,
        Some("Font" | "FontDescriptor") => Category::Font,
        Some(other) => Category::OtherTyped(other.to_string()),
        None => Category::OtherTyped(tree.value(value).describe()),
    }
}
