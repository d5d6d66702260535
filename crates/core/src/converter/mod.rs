//! Output converters for parsed trees.
//!
//! - `json`: lossless projection onto `serde_json::Value`

mod json;

pub use json::{KeyWarning, node_to_json, to_json, to_json_with_warnings};
