//! Composite node protocol: child admission, close tests and finalization.

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::mem;

use super::node::{DictEntry, Kind, Node, NodeId, Payload, Text, Value};
use super::tree::Tree;
use crate::error::{PdfError, Result};

/// Bytes that are absorbed into an accumulating composite instead of
/// becoming nodes of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Unescaped `(` or `)` inside a literal string.
    Paren(u8),
    /// Decoded escape sequence.
    Escape(u8),
    /// Run of ordinary literal-string bytes.
    Chars(Vec<u8>),
    /// Chunk of raw stream payload.
    StreamData(Vec<u8>),
}

/// Result of converting matched bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Value(Value),
    Fragment(Fragment),
}

static STREAM_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s-u)^.*?endstream(?:\r\n|\r|\n)").expect("stream terminator pattern")
});

static OBJECT_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u)^endobj[ \r\n\t\x0c\x00]*?(?:\r\n|\r|\n)")
        .expect("object terminator pattern")
});

const ENDSTREAM: &[u8] = b"endstream";

impl Tree {
    /// Hand a freshly matched token to the active composite `parent`.
    ///
    /// Returns the node that becomes active next: the new child when it is
    /// itself a composite, otherwise `parent`.
    pub(crate) fn admit(
        &mut self,
        parent: NodeId,
        start: usize,
        size: usize,
        token: Token,
    ) -> Result<NodeId> {
        let value = match token {
            Token::Fragment(fragment) => {
                self.absorb(parent, fragment)?;
                return Ok(parent);
            }
            Token::Value(value) => value,
        };

        let kind = value.kind();
        let child = self.push(Node::new(start, size, Some(parent), value));
        if kind == Kind::Whitespace {
            return Ok(parent);
        }
        self.record(parent, child)?;

        Ok(if kind.is_composite() { child } else { parent })
    }

    fn absorb(&mut self, parent: NodeId, fragment: Fragment) -> Result<()> {
        let offset = self.get(parent).start;
        match (&mut self.get_mut(parent).value, fragment) {
            (Value::LiteralString(s), Fragment::Paren(b'(')) => {
                s.depth += 1;
                s.buffer.push(b'(');
            }
            (Value::LiteralString(s), Fragment::Paren(_)) => {
                s.depth = s
                    .depth
                    .checked_sub(1)
                    .ok_or(PdfError::UnbalancedParenthesis { offset })?;
                s.buffer.push(b')');
            }
            (Value::LiteralString(s), Fragment::Escape(b)) => s.buffer.push(b),
            (Value::LiteralString(s), Fragment::Chars(chars)) => s.buffer.extend(chars),
            (Value::Stream(stream), Fragment::StreamData(chunk)) => {
                if let Payload::Inline(data) = &mut stream.payload {
                    data.extend(chunk);
                }
            }
            // Contexts only offer fragments to the composites that absorb them.
            _ => {}
        }
        Ok(())
    }

    fn record(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let pending = match self.value(parent) {
            Value::Dictionary(dict) => dict.pending.map(|key| (key, self.dict_key(key))),
            _ => None,
        };
        let child_kind = self.kind(child);

        match &mut self.get_mut(parent).value {
            Value::Document(items)
            | Value::List(items)
            | Value::XrefTable(items)
            | Value::Trailer(items) => items.push(child),
            Value::Dictionary(dict) => match pending {
                Some((key_node, key)) => {
                    dict.pending = None;
                    dict.entries.insert(
                        key,
                        DictEntry {
                            key: key_node,
                            value: child,
                        },
                    );
                }
                None => dict.pending = Some(child),
            },
            Value::IndirectObject(obj) => {
                let (slot, name) = if child_kind == Kind::Stream {
                    (&mut obj.stream, "stream")
                } else {
                    (&mut obj.object, "object")
                };
                if slot.is_some() {
                    return Err(PdfError::SlotConflict {
                        reference: obj.reference.to_string(),
                        slot: name,
                    });
                }
                *slot = Some(child);
            }
            // Leaves never become active, so they never receive children.
            _ => {}
        }
        Ok(())
    }

    /// Test whether the active composite ends at the head of `window`.
    ///
    /// Returns the terminator length; zero-length terminators leave the
    /// bytes for the parent to consume.
    pub(crate) fn should_close(&self, id: NodeId, window: &[u8], at_eof: bool) -> Option<usize> {
        match self.value(id) {
            Value::Document(_) => (window.is_empty() && at_eof).then_some(0),
            Value::List(_) => window.starts_with(b"]").then_some(1),
            Value::Dictionary(_) => window.starts_with(b">>").then_some(2),
            Value::LiteralString(s) => (s.depth == 0 && window.starts_with(b")")).then_some(1),
            Value::Stream(_) => STREAM_END
                .find(window)
                .map(|m| m.end())
                .filter(|&end| eol_settled(window, end, at_eof)),
            Value::IndirectObject(_) => match OBJECT_END.find(window) {
                Some(m) => eol_settled(window, m.end(), at_eof).then_some(m.end()),
                None => (at_eof
                    && window.starts_with(b"endobj")
                    && window[6..].iter().all(|&b| is_whitespace(b)))
                .then_some(window.len()),
            },
            Value::XrefTable(_) => window.starts_with(b"trailer").then_some(0),
            Value::Trailer(_) => window.starts_with(b"%%EOF").then_some(5),
            _ => None,
        }
    }

    /// Seal composite `id` and return its parent, or `None` for the root.
    pub(crate) fn close(
        &mut self,
        id: NodeId,
        terminator: &[u8],
        terminator_start: usize,
    ) -> Result<Option<NodeId>> {
        let node = self.get_mut(id);
        node.size = terminator_start + terminator.len() - node.start;
        let parent = node.parent;

        match &mut node.value {
            Value::LiteralString(s) => {
                s.text = Some(Text::from_bytes(mem::take(&mut s.buffer)));
            }
            Value::Stream(stream) => {
                if let Payload::Inline(data) = &mut stream.payload {
                    let keyword = data.len() + find_endstream(terminator);
                    data.extend_from_slice(terminator);
                    stream.body_len = strip_eol(&data[..keyword]).len();
                }
            }
            Value::Dictionary(dict) => {
                if let Some(key) = dict.pending.take() {
                    tracing::warn!(
                        key = key.index(),
                        offset = terminator_start,
                        "dictionary closed with a key and no value; key dropped"
                    );
                }
            }
            _ => {}
        }

        if self.kind(id) == Kind::Trailer {
            let marker = self.push(Node::new(
                terminator_start,
                terminator.len(),
                Some(id),
                Value::EndOfFile(String::from_utf8_lossy(terminator).into_owned()),
            ));
            if let Value::Trailer(items) = &mut self.get_mut(id).value {
                items.push(marker);
            }
        }

        Ok(parent)
    }
}

/// Offset of the `endstream` keyword inside a matched stream terminator.
fn find_endstream(terminator: &[u8]) -> usize {
    terminator
        .windows(ENDSTREAM.len())
        .rposition(|w| w == ENDSTREAM)
        .unwrap_or(terminator.len())
}

/// False when a terminator ends on a `\r` at the edge of the window and
/// more input may still turn it into `\r\n`.
fn eol_settled(window: &[u8], end: usize, at_eof: bool) -> bool {
    at_eof || end < window.len() || window[end - 1] != b'\r'
}

/// Drop one trailing end-of-line marker.
fn strip_eol(data: &[u8]) -> &[u8] {
    data.strip_suffix(b"\r\n")
        .or_else(|| data.strip_suffix(b"\n"))
        .or_else(|| data.strip_suffix(b"\r"))
        .unwrap_or(data)
}

pub(crate) const fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\r' | b'\n' | b'\t' | 0x0c | 0x00)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::{Dictionary, IndirectObject, LiteralString, ObjRef, Stream};

    fn open(tree: &mut Tree, value: Value) -> NodeId {
        let root = tree.root();
        tree.admit(root, 0, 0, Token::Value(value)).unwrap()
    }

    #[test]
    fn test_whitespace_is_not_recorded() {
        let mut tree = Tree::new();
        let list = open(&mut tree, Value::List(Vec::new()));
        let next = tree
            .admit(list, 1, 1, Token::Value(Value::Whitespace(Vec::new())))
            .unwrap();
        assert_eq!(next, list);
        assert_eq!(tree.children(list), Vec::<NodeId>::new());
        assert_eq!(tree.spans(list).len(), 1);
    }

    #[test]
    fn test_dictionary_pairs_and_last_write_wins() {
        let mut tree = Tree::new();
        let dict = open(&mut tree, Value::Dictionary(Dictionary::default()));
        for value in [
            Value::Name("A".into()),
            Value::Number("1".into()),
            Value::Name("B".into()),
            Value::Number("2".into()),
            Value::Name("A".into()),
            Value::Number("3".into()),
        ] {
            assert_eq!(tree.admit(dict, 0, 1, Token::Value(value)).unwrap(), dict);
        }
        let Value::Dictionary(d) = tree.value(dict) else {
            panic!("not a dictionary");
        };
        let keys: Vec<_> = d.iter().map(|(k, _)| k.as_name().unwrap()).collect();
        assert_eq!(keys, ["A", "B"]);
        let a = d.get("A").unwrap();
        assert_eq!(tree.value(a), &Value::Number("3".into()));
    }

    #[test]
    fn test_second_object_is_a_slot_conflict() {
        let mut tree = Tree::new();
        let obj = open(
            &mut tree,
            Value::IndirectObject(IndirectObject {
                reference: ObjRef::new(4, 0),
                object: None,
                stream: None,
            }),
        );
        tree.admit(obj, 8, 1, Token::Value(Value::Number("1".into())))
            .unwrap();
        let err = tree
            .admit(obj, 10, 1, Token::Value(Value::Number("2".into())))
            .unwrap_err();
        assert!(matches!(
            err,
            PdfError::SlotConflict { slot: "object", ref reference } if reference == "R 4 0"
        ));
    }

    #[test]
    fn test_second_stream_is_a_slot_conflict() {
        let mut tree = Tree::new();
        let obj = open(
            &mut tree,
            Value::IndirectObject(IndirectObject {
                reference: ObjRef::new(4, 0),
                object: None,
                stream: None,
            }),
        );
        let first = tree
            .admit(obj, 8, 7, Token::Value(Value::Stream(Stream::open())))
            .unwrap();
        tree.close(first, b"endstream\n", 15).unwrap();
        let err = tree
            .admit(obj, 25, 7, Token::Value(Value::Stream(Stream::open())))
            .unwrap_err();
        assert!(matches!(err, PdfError::SlotConflict { slot: "stream", .. }));
    }

    #[test]
    fn test_unbalanced_parenthesis_is_reported() {
        let mut tree = Tree::new();
        let s = open(&mut tree, Value::LiteralString(LiteralString::default()));
        let err = tree
            .admit(s, 1, 1, Token::Fragment(Fragment::Paren(b')')))
            .unwrap_err();
        assert!(matches!(err, PdfError::UnbalancedParenthesis { offset: 0 }));
    }

    #[test]
    fn test_literal_string_close_is_gated_on_depth() {
        let mut tree = Tree::new();
        let s = open(&mut tree, Value::LiteralString(LiteralString::default()));
        tree.admit(s, 1, 1, Token::Fragment(Fragment::Paren(b'(')))
            .unwrap();
        assert_eq!(tree.should_close(s, b")", false), None);
        tree.admit(s, 2, 1, Token::Fragment(Fragment::Paren(b')')))
            .unwrap();
        assert_eq!(tree.should_close(s, b")", false), Some(1));
    }

    #[test]
    fn test_stream_close_keeps_terminator_and_body() {
        let mut tree = Tree::new();
        let stream = open(&mut tree, Value::Stream(Stream::open()));
        tree.admit(
            stream,
            7,
            3,
            Token::Fragment(Fragment::StreamData(b"abc".to_vec())),
        )
        .unwrap();
        let window = b"def\r\nendstream\r\nendobj\n";
        let len = tree.should_close(stream, window, false).unwrap();
        assert_eq!(&window[..len], b"def\r\nendstream\r\n");
        tree.close(stream, &window[..len], 10).unwrap();

        let Value::Stream(s) = tree.value(stream) else {
            panic!("not a stream");
        };
        assert_eq!(s.data(), Some(&b"abcdef\r\nendstream\r\n"[..]));
        assert_eq!(s.body(), Some(&b"abcdef"[..]));
        assert_eq!(tree.get(stream).size, 10 + len);
    }

    #[test]
    fn test_carriage_return_at_window_edge_waits_for_more_input() {
        let mut tree = Tree::new();
        let stream = open(&mut tree, Value::Stream(Stream::open()));
        assert_eq!(tree.should_close(stream, b"x\r\nendstream\r", false), None);
        assert_eq!(tree.should_close(stream, b"x\r\nendstream\r", true), Some(13));
        assert_eq!(tree.should_close(stream, b"x\r\nendstream\r\n", false), Some(14));
        assert_eq!(tree.should_close(stream, b"x\r\nendstream\rx", false), Some(13));

        let obj = open(
            &mut tree,
            Value::IndirectObject(IndirectObject {
                reference: ObjRef::new(1, 0),
                object: None,
                stream: None,
            }),
        );
        assert_eq!(tree.should_close(obj, b"endobj\r", false), None);
        assert_eq!(tree.should_close(obj, b"endobj\r", true), Some(7));
        assert_eq!(tree.should_close(obj, b"endobj\r\n1", false), Some(8));
    }

    #[test]
    fn test_xref_table_closes_zero_width() {
        let mut tree = Tree::new();
        let xref = open(&mut tree, Value::XrefTable(Vec::new()));
        assert_eq!(tree.should_close(xref, b"trailer\n<<", false), Some(0));
    }

    #[test]
    fn test_trailer_synthesizes_end_of_file_marker() {
        let mut tree = Tree::new();
        let trailer = open(&mut tree, Value::Trailer(Vec::new()));
        assert_eq!(tree.should_close(trailer, b"%%EOF\n", false), Some(5));
        let parent = tree.close(trailer, b"%%EOF", 40).unwrap();
        assert_eq!(parent, Some(tree.root()));
        let children = tree.children(trailer);
        assert_eq!(children.len(), 1);
        assert_eq!(tree.value(children[0]), &Value::EndOfFile("%%EOF".into()));
        assert_eq!(tree.get(children[0]).start, 40);
    }

    #[test]
    fn test_document_closes_only_at_end_of_input() {
        let tree = Tree::new();
        assert_eq!(tree.should_close(tree.root(), b"", false), None);
        assert_eq!(tree.should_close(tree.root(), b"", true), Some(0));
    }
}
