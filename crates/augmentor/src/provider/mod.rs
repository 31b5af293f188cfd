//! Collaborators the pipeline consumes: companion materialization, entity
//! properties, embeddings, geospatial resolution and result caching.
//!
//! Every collaborator is optional. The in-memory implementations serve tests
//! and embedding; [`FileCompanionSource`] and [`HttpCompanionSource`] fetch real
//! delimited files.
//!
//! # Example
//!
//! ```
//! use augmentor::{Augmentor, InMemoryCompanionSource, MemoryCache};
//!
//! let augmentor = Augmentor::new()
//!     .with_companions(InMemoryCompanionSource::new())
//!     .with_cache(MemoryCache::new());
//! ```

mod cache;
mod collaborator;
mod memory;
mod remote;

pub use cache::{cache_key, MemoryCache};
pub use collaborator::{
    Collaborators, CompanionDescriptor, CompanionSource, EmbeddingSource, EntityProperties,
    EntityPropertySource, GeoEntityResolver, PropertyValue, ResultCache, ENTITY_ID_COLUMN,
};
pub use memory::{InMemoryCompanionSource, StaticEmbeddings, StaticEntityProperties, StaticGeoResolver};
pub use remote::{FileCompanionSource, HttpCompanionSource};
