//! Object tree nodes.
//!
//! Every recognized construct becomes a [`Node`] carrying its byte span,
//! a non-owning parent link and its semantic [`Value`].

use indexmap::IndexMap;
use std::fmt;
use std::path::PathBuf;

/// Index of a node in its [`Tree`](super::Tree) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

/// A parsed construct and its exact byte provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Byte offset of the first matched byte.
    pub start: usize,
    /// Number of bytes covered, terminator included for composites.
    pub size: usize,
    /// Enclosing node; `None` only for the document root.
    pub parent: Option<NodeId>,
    pub value: Value,
}

impl Node {
    pub const fn new(start: usize, size: usize, parent: Option<NodeId>, value: Value) -> Self {
        Self {
            start,
            size,
            parent,
            value,
        }
    }

    /// One past the last byte of this node.
    pub const fn end(&self) -> usize {
        self.start + self.size
    }

    pub const fn kind(&self) -> Kind {
        self.value.kind()
    }
}

/// Decoded text, or the raw bytes when they are not valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Text {
    Utf8(String),
    Raw(Vec<u8>),
}

impl Text {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Text::Utf8(text),
            Err(err) => Text::Raw(err.into_bytes()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Text::Utf8(text) => Some(text),
            Text::Raw(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Text::Utf8(text) => text.as_bytes(),
            Text::Raw(bytes) => bytes,
        }
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Text::Utf8(text) => f.write_str(text),
            Text::Raw(bytes) => write!(f, "b\"{}\"", bytes.escape_ascii()),
        }
    }
}

/// A single whitespace byte, named for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WsToken {
    Space,
    CarriageReturn,
    LineFeed,
    Tab,
    FormFeed,
    Nul,
}

impl WsToken {
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            b' ' => Some(WsToken::Space),
            b'\r' => Some(WsToken::CarriageReturn),
            b'\n' => Some(WsToken::LineFeed),
            b'\t' => Some(WsToken::Tab),
            0x0c => Some(WsToken::FormFeed),
            0x00 => Some(WsToken::Nul),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            WsToken::Space => "SP",
            WsToken::CarriageReturn => "CR",
            WsToken::LineFeed => "LF",
            WsToken::Tab => "TB",
            WsToken::FormFeed => "FF",
            WsToken::Nul => "NUL",
        }
    }
}

/// Object number and generation of an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef {
    pub objid: u64,
    pub genno: u64,
}

impl ObjRef {
    pub const fn new(objid: u64, genno: u64) -> Self {
        Self { objid, genno }
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R {} {}", self.objid, self.genno)
    }
}

/// Subsection header of a cross-reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XrefSpec {
    pub first: u64,
    pub count: u64,
}

/// Fixed-width cross-reference entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XrefEntry {
    pub offset: u64,
    pub generation: u64,
    pub in_use: bool,
}

/// Literal string state: an open accumulator until closed, then text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiteralString {
    pub(crate) buffer: Vec<u8>,
    /// Unpaired, unescaped `(` seen so far.
    pub(crate) depth: usize,
    pub(crate) text: Option<Text>,
}

impl LiteralString {
    /// The decoded string, available once the closing `)` was consumed.
    pub fn text(&self) -> Option<&Text> {
        self.text.as_ref()
    }

    /// Bytes accumulated so far (empty once sealed).
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }
}

/// Where a stream's payload currently lives.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Inline(Vec<u8>),
    /// Written out by the decompression pass.
    External(PathBuf),
}

/// Stream payload paired with its indirect object's dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub(crate) payload: Payload,
    /// Length of the data proper, before the EOL and `endstream` keyword.
    pub(crate) body_len: usize,
}

impl Stream {
    pub(crate) const fn open() -> Self {
        Self {
            payload: Payload::Inline(Vec::new()),
            body_len: 0,
        }
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Raw payload bytes, terminator included, while still in memory.
    pub fn data(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Inline(data) => Some(data),
            Payload::External(_) => None,
        }
    }

    /// Payload bytes without the terminating `EOL endstream EOL`.
    pub fn body(&self) -> Option<&[u8]> {
        self.data().map(|data| &data[..self.body_len.min(data.len())])
    }
}

/// `<num> <gen> obj ... endobj`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectObject {
    pub reference: ObjRef,
    pub object: Option<NodeId>,
    pub stream: Option<NodeId>,
}

/// Dictionary key collapsed from its key node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    Name(String),
    /// Non-name scalar key, in its lexical or decoded form.
    Scalar(String),
    /// A key that has no scalar form (list, dictionary, raw bytes).
    Node(NodeId),
}

impl DictKey {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            DictKey::Name(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictEntry {
    pub key: NodeId,
    pub value: NodeId,
}

/// Insertion-ordered dictionary; a repeated key keeps its first position
/// and takes the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    pub(crate) entries: IndexMap<DictKey, DictEntry>,
    pub(crate) pending: Option<NodeId>,
}

impl Dictionary {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.entries
            .get(&DictKey::Name(name.to_string()))
            .map(|entry| entry.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DictKey, &DictEntry)> {
        self.entries.iter()
    }

    /// Key node still waiting for its value.
    pub fn pending_key(&self) -> Option<NodeId> {
        self.pending
    }
}

/// Semantic value of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Document(Vec<NodeId>),
    /// PDF version from the header, e.g. `1.4`.
    Header(String),
    Comment(Text),
    Whitespace(Vec<WsToken>),
    Name(String),
    /// Lexical form, kept undecoded.
    Number(String),
    Boolean(bool),
    Null,
    HexString(Text),
    Reference(ObjRef),
    LiteralString(LiteralString),
    List(Vec<NodeId>),
    Dictionary(Dictionary),
    Stream(Stream),
    IndirectObject(IndirectObject),
    XrefTable(Vec<NodeId>),
    XrefSpec(XrefSpec),
    XrefEntry(XrefEntry),
    XrefOffset(u64),
    Trailer(Vec<NodeId>),
    EndOfFile(String),
}

impl Value {
    pub const fn kind(&self) -> Kind {
        match self {
            Value::Document(_) => Kind::Document,
            Value::Header(_) => Kind::Header,
            Value::Comment(_) => Kind::Comment,
            Value::Whitespace(_) => Kind::Whitespace,
            Value::Name(_) => Kind::Name,
            Value::Number(_) => Kind::Number,
            Value::Boolean(_) => Kind::Boolean,
            Value::Null => Kind::Null,
            Value::HexString(_) => Kind::HexString,
            Value::Reference(_) => Kind::Reference,
            Value::LiteralString(_) => Kind::LiteralString,
            Value::List(_) => Kind::List,
            Value::Dictionary(_) => Kind::Dictionary,
            Value::Stream(_) => Kind::Stream,
            Value::IndirectObject(_) => Kind::IndirectObject,
            Value::XrefTable(_) => Kind::XrefTable,
            Value::XrefSpec(_) => Kind::XrefSpec,
            Value::XrefEntry(_) => Kind::XrefEntry,
            Value::XrefOffset(_) => Kind::XrefOffset,
            Value::Trailer(_) => Kind::Trailer,
            Value::EndOfFile(_) => Kind::EndOfFile,
        }
    }

    /// Short human-readable rendering used by traces and parse errors.
    pub fn describe(&self) -> String {
        match self {
            Value::Document(items)
            | Value::List(items)
            | Value::XrefTable(items)
            | Value::Trailer(items) => format!("[{} items]", items.len()),
            Value::Header(version) => format!("Version from header: {version}"),
            Value::Comment(text) | Value::HexString(text) => text.to_string(),
            Value::Whitespace(tokens) => tokens
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            Value::Name(name) => format!("/{name}"),
            Value::Number(number) => number.clone(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Reference(r) => r.to_string(),
            Value::LiteralString(s) => match &s.text {
                Some(text) => text.to_string(),
                None => format!("b\"{}\"", s.buffer.escape_ascii()),
            },
            Value::Dictionary(dict) => format!("{{{} entries}}", dict.len()),
            Value::Stream(stream) => match &stream.payload {
                Payload::Inline(data) => {
                    let head = &data[..data.len().min(10)];
                    let tail = &data[data.len().saturating_sub(10)..];
                    format!(
                        "{} bytes of stream data: b\"{}\" ... b\"{}\"",
                        data.len(),
                        head.escape_ascii(),
                        tail.escape_ascii()
                    )
                }
                Payload::External(path) => path.display().to_string(),
            },
            Value::IndirectObject(obj) => obj.reference.to_string(),
            Value::XrefSpec(spec) => format!("{} {}", spec.first, spec.count),
            Value::XrefEntry(entry) => format!(
                "{:010} {:05} {}",
                entry.offset,
                entry.generation,
                if entry.in_use { 'n' } else { 'f' }
            ),
            Value::XrefOffset(offset) => offset.to_string(),
            Value::EndOfFile(text) => text.clone(),
        }
    }
}

/// Closed discriminator over node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Document,
    Header,
    Comment,
    Whitespace,
    Name,
    Number,
    Boolean,
    Null,
    HexString,
    Reference,
    LiteralString,
    List,
    Dictionary,
    Stream,
    IndirectObject,
    XrefTable,
    XrefSpec,
    XrefEntry,
    XrefOffset,
    Trailer,
    EndOfFile,
}

impl Kind {
    pub const fn name(self) -> &'static str {
        match self {
            Kind::Document => "Document",
            Kind::Header => "Header",
            Kind::Comment => "Comment",
            Kind::Whitespace => "Whitespace",
            Kind::Name => "Name",
            Kind::Number => "Number",
            Kind::Boolean => "Boolean",
            Kind::Null => "Null",
            Kind::HexString => "HexString",
            Kind::Reference => "Reference",
            Kind::LiteralString => "LiteralString",
            Kind::List => "List",
            Kind::Dictionary => "Dictionary",
            Kind::Stream => "Stream",
            Kind::IndirectObject => "IndirectObject",
            Kind::XrefTable => "XrefTable",
            Kind::XrefSpec => "XrefSpec",
            Kind::XrefEntry => "XrefEntry",
            Kind::XrefOffset => "XrefOffset",
            Kind::Trailer => "Trailer",
            Kind::EndOfFile => "EndOfFile",
        }
    }

    /// Composites stay active after admission and close on their own terminator.
    pub const fn is_composite(self) -> bool {
        matches!(
            self,
            Kind::Document
                | Kind::LiteralString
                | Kind::List
                | Kind::Dictionary
                | Kind::Stream
                | Kind::IndirectObject
                | Kind::XrefTable
                | Kind::Trailer
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
