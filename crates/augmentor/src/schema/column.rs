//! Per-column metadata carried inside a table.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::types::{LogicalType, Provenance, SemanticTag};
use crate::temporal::Granularity;

/// Metadata for a single column.
///
/// Metadata travels with the column values, so reordering or dropping
/// columns never desynchronizes names, types and tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Column name.
    pub name: String,
    /// Declared logical type.
    #[serde(default)]
    pub logical_type: LogicalType,
    /// Semantic tags.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<SemanticTag>,
    /// Original vs augmented.
    #[serde(default)]
    pub provenance: Provenance,
    /// Declared time granularity for temporal columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_granularity: Option<Granularity>,
}

impl ColumnMetadata {
    /// Create metadata for a text attribute column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logical_type: LogicalType::Text,
            tags: BTreeSet::from([SemanticTag::Attribute]),
            provenance: Provenance::Original,
            time_granularity: None,
        }
    }

    /// Create metadata for an entity-identifier column.
    pub fn entity_id(name: impl Into<String>) -> Self {
        Self::new(name)
            .with_type(LogicalType::EntityId)
            .with_tags([SemanticTag::EntityId])
    }

    /// Create metadata for a temporal column.
    pub fn temporal(name: impl Into<String>, granularity: Option<Granularity>) -> Self {
        let mut meta = Self::new(name)
            .with_type(LogicalType::DateTime)
            .with_tags([SemanticTag::Temporal]);
        meta.time_granularity = granularity;
        meta
    }

    /// Set the logical type.
    pub fn with_type(mut self, logical_type: LogicalType) -> Self {
        self.logical_type = logical_type;
        self
    }

    /// Replace the tag set.
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = SemanticTag>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    /// Add a single tag.
    pub fn with_tag(mut self, tag: SemanticTag) -> Self {
        self.tags.insert(tag);
        self
    }

    /// Check whether the column carries a tag.
    pub fn has_tag(&self, tag: SemanticTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Entity-identifier columns are joined by exact equality.
    pub fn is_entity_id(&self) -> bool {
        self.logical_type == LogicalType::EntityId || self.has_tag(SemanticTag::EntityId)
    }

    /// Temporal columns are eligible for time alignment.
    pub fn is_temporal(&self) -> bool {
        self.logical_type == LogicalType::DateTime || self.has_tag(SemanticTag::Temporal)
    }

    /// Copy of this metadata marked as contributed by augmentation.
    pub fn as_augmented(&self) -> Self {
        let mut meta = self.clone();
        meta.provenance = Provenance::Augmented;
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_constructor() {
        let meta = ColumnMetadata::entity_id("city_wikidata");
        assert!(meta.is_entity_id());
        assert!(!meta.is_temporal());
        assert_eq!(meta.provenance, Provenance::Original);
    }

    #[test]
    fn test_as_augmented_keeps_name_and_tags() {
        let meta = ColumnMetadata::new("population").with_tag(SemanticTag::Text);
        let augmented = meta.as_augmented();
        assert_eq!(augmented.name, "population");
        assert!(augmented.has_tag(SemanticTag::Text));
        assert_eq!(augmented.provenance, Provenance::Augmented);
    }
}
