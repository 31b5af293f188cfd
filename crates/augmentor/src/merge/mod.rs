//! Augmented-table construction.

mod merger;

pub use merger::{AugmentMerger, CollisionPolicy, MergeOptions, MergedTable};
