//! Static spatial index over area bounding boxes.
//!
//! [`PackedIndex`] is bulk-loaded once from per-ID boxes and never mutated;
//! [`codec`] validates the binary artifact and turns it back into an index.

pub mod codec;
pub mod packed;

pub use codec::{decode, encode};
pub use packed::PackedIndex;
