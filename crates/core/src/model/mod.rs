//! Object tree model.
//!
//! - `node` - node, value and kind types
//! - `tree` - the arena that owns every node
//! - `composite` - admission, close tests and finalization of composites

pub mod composite;
pub mod node;
pub mod tree;

// Re-export main types for convenience
pub use composite::{Fragment, Token};
pub use node::{
    DictEntry, DictKey, Dictionary, IndirectObject, Kind, LiteralString, Node, NodeId, ObjRef,
    Payload, Stream, Text, Value, WsToken, XrefEntry, XrefSpec,
};
pub use tree::Tree;
