//! Column and row key indexes for identity matching.

mod blocking;
mod key_index;
mod normalize;

pub use blocking::KeyBlockIndex;
pub use key_index::{ColumnFingerprint, ColumnKeyIndex};
pub use normalize::{normalize_key, tokenize};
