//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};

use para_memory::models::{
    CandidateFact, CheckpointBatch, Entity, EntityFactRecord, EntityKey, Fact, FactCategory,
};
use para_memory::services::decay::TierConfig;
use para_memory::services::{AccessTracker, DailyNotes, EntityStore, Runner};

/// Fixed evaluation instant so tier math is reproducible.
pub const NOW: &str = "2026-08-07T12:00:00Z";

pub fn now() -> DateTime<Utc> {
    NOW.parse().unwrap()
}

pub fn today() -> NaiveDate {
    now().date_naive()
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn days_ago(days: i64) -> NaiveDate {
    today() - chrono::Duration::days(days)
}

/// Build a runner over a temp workspace, with lock timing short enough
/// for contention tests.
pub fn runner_in(root: &Path) -> Runner {
    let store = EntityStore::new(root.join("para"))
        .with_lock_timing(Duration::from_millis(200), Duration::from_millis(10));
    Runner::new(
        store,
        AccessTracker::new(root.join("cache")),
        DailyNotes::new(root.join("memory")),
        TierConfig::default(),
    )
}

pub fn key(raw: &str) -> EntityKey {
    EntityKey::parse(raw).unwrap()
}

/// A batch carrying a single candidate fact.
pub fn single_fact_batch(
    entity_type: &str,
    entity_name: &str,
    category: &str,
    content: &str,
) -> CheckpointBatch {
    CheckpointBatch {
        entity_facts: vec![fact_record(entity_type, entity_name, category, content)],
        ..Default::default()
    }
}

pub fn fact_record(
    entity_type: &str,
    entity_name: &str,
    category: &str,
    content: &str,
) -> EntityFactRecord {
    EntityFactRecord {
        entity_type: entity_type.to_string(),
        entity_name: entity_name.to_string(),
        supersedes_id: None,
        fact: CandidateFact {
            category: category.to_string(),
            content: content.to_string(),
            related_entities: vec![],
            source: None,
        },
    }
}

/// A fact with crafted access history, for seeding entities directly.
pub fn fact_accessed(id: &str, category: FactCategory, days: i64, access_count: u32) -> Fact {
    let mut fact = Fact::new(
        id.to_string(),
        format!("fact {}", id),
        category,
        vec![],
        None,
        days_ago(days),
    );
    fact.access_count = access_count;
    fact
}

/// Persist an entity with the given facts.
pub async fn seed_entity(
    store: &EntityStore,
    key: &EntityKey,
    facts: Vec<Fact>,
) -> para_memory::Result<Entity> {
    let mut entity = Entity::new(key, "seeded for test", date("2026-06-01"));
    entity.facts = facts;
    store.save(key, &entity).await?;
    Ok(entity)
}
