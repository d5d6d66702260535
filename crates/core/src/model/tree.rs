//! Arena holding every node of a parsed document.
//!
//! Ownership is strictly top-down: the arena owns all nodes, composites
//! refer to their children by [`NodeId`], and the parent link is an index
//! used only for path reporting and dictionary/stream pairing.

use super::node::{DictKey, Kind, Node, NodeId, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// A tree holding only an empty, open document root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(0, 0, None, Value::Document(Vec::new()))],
        }
    }

    pub const fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn value(&self, id: NodeId) -> &Value {
        &self.get(id).value
    }

    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId::new(i), node))
    }

    /// Number of ancestors of `id`.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut cursor = self.get(id).parent;
        while let Some(parent) = cursor {
            depth += 1;
            cursor = self.get(parent).parent;
        }
        depth
    }

    /// Dotted structural path from the root, e.g. `Document.IndirectObject.Dictionary`.
    pub fn path(&self, id: NodeId) -> String {
        let mut names = vec![self.get(id).kind().name()];
        let mut cursor = self.get(id).parent;
        while let Some(parent) = cursor {
            names.push(self.get(parent).kind().name());
            cursor = self.get(parent).parent;
        }
        names.reverse();
        names.join(".")
    }

    /// Recorded children of a composite, in source order.
    ///
    /// Dictionaries yield key and value alternately. Whitespace is never
    /// a recorded child; see [`Tree::spans`].
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.value(id) {
            Value::Document(items)
            | Value::List(items)
            | Value::XrefTable(items)
            | Value::Trailer(items) => items.clone(),
            Value::Dictionary(dict) => {
                let mut ids: Vec<NodeId> = dict
                    .iter()
                    .flat_map(|(_, entry)| [entry.key, entry.value])
                    .collect();
                ids.extend(dict.pending_key());
                ids.sort();
                ids
            }
            Value::IndirectObject(obj) => obj.object.into_iter().chain(obj.stream).collect(),
            _ => Vec::new(),
        }
    }

    /// Every node whose parent is `id`, whitespace included, in source order.
    ///
    /// Descendants of `id` occupy the arena slots right after it, so the
    /// walk stops at the first node whose parent precedes `id`.
    pub fn spans(&self, id: NodeId) -> Vec<NodeId> {
        let first = id.index() + 1;
        self.nodes[first.min(self.nodes.len())..]
            .iter()
            .take_while(|node| node.parent.is_some_and(|p| p >= id))
            .enumerate()
            .filter(|(_, node)| node.parent == Some(id))
            .map(|(i, _)| NodeId::new(first + i))
            .collect()
    }

    /// Collapse a dictionary key node to its hashable form.
    pub(crate) fn dict_key(&self, key: NodeId) -> DictKey {
        match self.value(key) {
            Value::Name(name) => DictKey::Name(name.clone()),
            Value::Number(number) => DictKey::Scalar(number.clone()),
            Value::Boolean(b) => DictKey::Scalar(b.to_string()),
            Value::Null => DictKey::Scalar("null".to_string()),
            Value::Reference(r) => DictKey::Scalar(r.to_string()),
            Value::HexString(text) => match text.as_str() {
                Some(s) => DictKey::Scalar(s.to_string()),
                None => DictKey::Node(key),
            },
            Value::LiteralString(s) => match s.text().and_then(|t| t.as_str()) {
                Some(s) => DictKey::Scalar(s.to_string()),
                None => DictKey::Node(key),
            },
            _ => DictKey::Node(key),
        }
    }

    /// The name held by `id`, if it is a `Name`.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match self.value(id) {
            Value::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn kind(&self, id: NodeId) -> Kind {
        self.get(id).kind()
    }
}
