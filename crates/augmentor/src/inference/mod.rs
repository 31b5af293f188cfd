//! Type inference for parsed columns.

mod statistical;

pub use statistical::TypeInferrer;
