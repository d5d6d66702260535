//! Stream codecs.
//!
//! - `flate`: FlateDecode, the one filter the decompression pass decodes

pub mod flate;

// Re-export main functions for convenience
pub use flate::{FLATE_DECODE, flatedecode};
