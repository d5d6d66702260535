//! PDF byte-stream parsing.
//!
//! - `source`: refillable lookahead over any reader
//! - `grammar`: productions and per-composite contexts
//! - `driver`: the loop that grows the object tree

pub mod driver;
pub mod grammar;
pub mod source;

// Re-export main types for convenience
pub use driver::{ParseOptions, TreeParser, parse, parse_bytes};
pub use grammar::{Production, ProductionId};
pub use source::ByteSource;
