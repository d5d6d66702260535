//! Projection of a parsed tree onto `serde_json::Value`.
//!
//! The projection is pure: it reads the tree and never mutates it, so
//! converting the same tree twice yields identical output.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value as Json, json};

use crate::model::{DictKey, NodeId, Payload, Text, Tree, Value};

/// A dictionary key with no scalar form, rendered as JSON text instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyWarning {
    /// Dotted path of the dictionary holding the key.
    pub path: String,
    /// Byte offset of the key node.
    pub offset: usize,
    /// The compact JSON text the key was collapsed to.
    pub rendered: String,
}

impl std::fmt::Display for KeyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot collapse dictionary key at offset {} in {}, using {}",
            self.offset, self.path, self.rendered
        )
    }
}

/// Convert the whole tree, starting at the document root.
pub fn to_json(tree: &Tree) -> Json {
    to_json_with_warnings(tree).0
}

/// Like [`to_json`], also returning the keys that had to be rendered as text.
pub fn to_json_with_warnings(tree: &Tree) -> (Json, Vec<KeyWarning>) {
    let mut converter = JsonConverter {
        tree,
        warnings: Vec::new(),
    };
    let value = converter.node(tree.root());
    (value, converter.warnings)
}

/// Convert a single subtree.
pub fn node_to_json(tree: &Tree, id: NodeId) -> Json {
    JsonConverter {
        tree,
        warnings: Vec::new(),
    }
    .node(id)
}

struct JsonConverter<'a> {
    tree: &'a Tree,
    warnings: Vec<KeyWarning>,
}

impl JsonConverter<'_> {
    fn node(&mut self, id: NodeId) -> Json {
        let tree = self.tree;
        match tree.value(id) {
            Value::Document(items)
            | Value::List(items)
            | Value::XrefTable(items)
            | Value::Trailer(items) => Json::Array(items.iter().map(|&i| self.node(i)).collect()),
            Value::Header(version) => json!(format!("Version from header: {version}")),
            Value::Comment(text) | Value::HexString(text) => text_json(text),
            Value::Whitespace(_) => json!(tree.value(id).describe()),
            Value::Name(name) => json!(name),
            Value::Number(number) => json!(number),
            Value::Boolean(b) => json!(b),
            Value::Null => Json::Null,
            Value::Reference(r) => json!(r.to_string()),
            Value::LiteralString(s) => match s.text() {
                Some(text) => text_json(text),
                None => bytes_json(s.pending()),
            },
            Value::Dictionary(dict) => {
                let mut map = Map::new();
                for (key, entry) in dict.iter() {
                    let key = self.key(id, key, entry.key);
                    let value = self.node(entry.value);
                    map.insert(key, value);
                }
                Json::Object(map)
            }
            Value::Stream(stream) => match stream.payload() {
                Payload::Inline(data) => bytes_json(data),
                Payload::External(path) => json!(path.to_string_lossy()),
            },
            Value::IndirectObject(obj) => {
                let mut map = Map::new();
                map.insert("reference".into(), json!(obj.reference.to_string()));
                let object = obj.object.map_or(Json::Null, |o| self.node(o));
                map.insert("object".into(), object);
                if let Some(stream) = obj.stream {
                    let stream = self.node(stream);
                    map.insert("data stream".into(), stream);
                }
                Json::Object(map)
            }
            Value::XrefSpec(spec) => json!({
                "object number of first entry": spec.first,
                "number of entries": spec.count,
            }),
            Value::XrefEntry(entry) => json!({
                "byte offset": entry.offset,
                "generation number": entry.generation,
                "in-use": entry.in_use,
            }),
            Value::XrefOffset(offset) => json!(offset),
            Value::EndOfFile(text) => json!(text),
        }
    }

    fn key(&mut self, dict: NodeId, key: &DictKey, node: NodeId) -> String {
        match key {
            DictKey::Name(name) | DictKey::Scalar(name) => name.clone(),
            DictKey::Node(_) => {
                let rendered = self.node(node).to_string();
                let warning = KeyWarning {
                    path: self.tree.path(dict),
                    offset: self.tree.get(node).start,
                    rendered: rendered.clone(),
                };
                tracing::warn!("{warning}");
                self.warnings.push(warning);
                rendered
            }
        }
    }
}

fn text_json(text: &Text) -> Json {
    match text {
        Text::Utf8(s) => json!(s),
        Text::Raw(bytes) => bytes_json(bytes),
    }
}

fn bytes_json(bytes: &[u8]) -> Json {
    Json::String(STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_bytes;

    #[test]
    fn test_indirect_object_shape() {
        let tree = parse_bytes(b"12 0 obj\n<< /Type /Catalog >>\nendobj\n").unwrap();
        let json = to_json(&tree);
        assert_eq!(
            json,
            json!([{ "reference": "R 12 0", "object": { "Type": "Catalog" } }])
        );
    }

    #[test]
    fn test_raw_bytes_are_base64() {
        assert_eq!(bytes_json(&[0xff, 0x00]), json!("/wA="));
        assert_eq!(text_json(&Text::Utf8("abc".into())), json!("abc"));
    }

    #[test]
    fn test_composite_key_warns() {
        let tree = parse_bytes(b"1 0 obj\n<< [1] /V >>\nendobj\n").unwrap();
        let (json, warnings) = to_json_with_warnings(&tree);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].rendered, "[\"1\"]");
        assert_eq!(json[0]["object"]["[\"1\"]"], json!("V"));
    }
}
