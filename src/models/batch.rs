//! Checkpoint batch input: the structured records the external extraction
//! step produces from conversation logs.
//!
//! The shapes here are the boundary with a dynamically-typed collaborator,
//! so every record is validated individually before it reaches the merge
//! engine; a non-conforming record is rejected on its own without aborting
//! the batch.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{EntityKey, EntityType, FactCategory, FactSource};
use crate::services::slug::slugify;

/// A full checkpoint batch as supplied by the extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointBatch {
    #[serde(default)]
    pub entity_facts: Vec<EntityFactRecord>,
    #[serde(default)]
    pub new_entities: Vec<NewEntityRecord>,
    #[serde(default)]
    pub daily_notes: Option<String>,
    #[serde(default)]
    pub decisions: Vec<String>,
}

/// One candidate fact aimed at one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityFactRecord {
    pub entity_type: String,
    pub entity_name: String,
    /// Id of an active fact this one replaces, when the extractor knows it.
    #[serde(default)]
    pub supersedes_id: Option<String>,
    pub fact: CandidateFact,
}

impl EntityFactRecord {
    /// Validate the record against the schema: known entity type, known
    /// category, non-empty content. Returns the resolved target key and
    /// category.
    pub fn validate(&self) -> Result<(EntityKey, FactCategory)> {
        let entity_type = EntityType::from_str(&self.entity_type).ok_or_else(|| {
            Error::Validation(format!("unknown entity_type: {:?}", self.entity_type))
        })?;
        let category = FactCategory::from_str(&self.fact.category).ok_or_else(|| {
            Error::Validation(format!("unknown category: {:?}", self.fact.category))
        })?;
        if self.fact.content.trim().is_empty() {
            return Err(Error::Validation("empty fact content".to_string()));
        }
        let id = slugify(&self.entity_name);
        Ok((EntityKey::new(entity_type, id), category))
    }
}

/// Candidate fact payload: text, category and weak links, but no id,
/// status or access metadata — those are assigned by the merge engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateFact {
    pub category: String,
    #[serde(alias = "fact")]
    pub content: String,
    #[serde(rename = "relatedEntities", default)]
    pub related_entities: Vec<String>,
    #[serde(default)]
    pub source: Option<FactSource>,
}

/// Request to create an entity ahead of any facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntityRecord {
    pub entity_type: String,
    pub entity_name: String,
    #[serde(default)]
    pub reason: String,
}

impl NewEntityRecord {
    pub fn validate(&self) -> Result<EntityKey> {
        let entity_type = EntityType::from_str(&self.entity_type).ok_or_else(|| {
            Error::Validation(format!("unknown entity_type: {:?}", self.entity_type))
        })?;
        Ok(EntityKey::new(entity_type, slugify(&self.entity_name)))
    }
}
