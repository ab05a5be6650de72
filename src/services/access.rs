//! Access tracking for facts.
//!
//! `touch` updates a fact's access metadata in place; callers persist the
//! owning entity atomically together with whatever save triggered the
//! touch, so there are no lost updates under concurrent touches to
//! different facts of one entity.
//!
//! Touches are also mirrored into a cache-directory access log so the full
//! decay run can backfill facts that predate tracking (imported corpora,
//! hand-written files).

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::models::{lenient_date, Entity, Fact};
use crate::services::store;

/// Bump a fact on re-observation or retrieval: `lastAccessed = now`,
/// `accessCount + 1`. The count never decreases.
pub fn touch(fact: &mut Fact, now: NaiveDate) {
    fact.last_accessed = Some(now);
    fact.access_count = fact.access_count.saturating_add(1);
}

/// One entry in the access log, keyed by `<entity-id>:<fact-id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessEntry {
    #[serde(rename = "accessCount", default)]
    pub access_count: u32,
    #[serde(
        rename = "lastAccessed",
        default,
        with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_accessed: Option<NaiveDate>,
}

/// The access log: a flat map of fact keys to their access metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessLog(pub BTreeMap<String, AccessEntry>);

impl AccessLog {
    pub fn get(&self, entity_id: &str, fact_id: &str) -> Option<&AccessEntry> {
        self.0.get(&format!("{}:{}", entity_id, fact_id))
    }

    pub fn bump(&mut self, entity_id: &str, fact_id: &str, now: NaiveDate) {
        let entry = self
            .0
            .entry(format!("{}:{}", entity_id, fact_id))
            .or_insert(AccessEntry {
                access_count: 0,
                last_accessed: None,
            });
        entry.access_count = entry.access_count.saturating_add(1);
        entry.last_accessed = Some(now);
    }
}

/// Persistence for the access log under the cache directory.
pub struct AccessTracker {
    cache_dir: PathBuf,
}

impl AccessTracker {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    fn log_path(&self) -> PathBuf {
        self.cache_dir.join("access-log.json")
    }

    /// Load the access log. A missing or unreadable log is an empty one;
    /// the log is a cache, not a source of truth.
    pub async fn load_log(&self) -> AccessLog {
        match tokio::fs::read_to_string(self.log_path()).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("access log unparseable, starting fresh: {}", e);
                AccessLog::default()
            }),
            Err(_) => AccessLog::default(),
        }
    }

    pub async fn save_log(&self, log: &AccessLog) -> Result<()> {
        let content = serde_json::to_string_pretty(log)
            .map_err(|e| crate::Error::Internal(format!("Failed to serialize access log: {}", e)))?;
        store::write_atomic(&self.log_path(), &content).await
    }

    /// Record touches for a set of facts in one entity.
    pub async fn record(&self, entity_id: &str, fact_ids: &[String], now: NaiveDate) -> Result<()> {
        if fact_ids.is_empty() {
            return Ok(());
        }
        let mut log = self.load_log().await;
        for fact_id in fact_ids {
            log.bump(entity_id, fact_id, now);
        }
        self.save_log(&log).await
    }
}

/// Backfill access metadata onto facts that have none: first from the
/// access log, otherwise from the entity's creation date with a zero
/// count. Returns the number of facts updated.
pub fn backfill(entity: &mut Entity, log: &AccessLog) -> usize {
    let entity_id = entity.id.clone();
    let created = entity.created;
    let mut updated = 0;

    for fact in &mut entity.facts {
        if fact.last_accessed.is_some() {
            continue;
        }
        match log.get(&entity_id, &fact.id) {
            Some(entry) if entry.last_accessed.is_some() => {
                fact.last_accessed = entry.last_accessed;
                fact.access_count = fact.access_count.max(entry.access_count);
            }
            _ => {
                fact.last_accessed = Some(fact.created.unwrap_or(created));
            }
        }
        updated += 1;
    }

    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityKey, EntityType, FactCategory};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_touch_bumps_metadata() {
        let mut fact = Fact::new(
            "ali-001".to_string(),
            "x".to_string(),
            FactCategory::Context,
            vec![],
            None,
            date("2026-07-01"),
        );
        touch(&mut fact, date("2026-08-07"));
        assert_eq!(fact.access_count, 1);
        assert_eq!(fact.last_accessed, Some(date("2026-08-07")));
    }

    #[test]
    fn test_backfill_prefers_log_then_created() {
        let key = EntityKey::new(EntityType::People, "alice");
        let mut entity = Entity::new(&key, "", date("2026-06-01"));
        let mut logged = Fact::new(
            "ali-001".to_string(),
            "a".to_string(),
            FactCategory::Context,
            vec![],
            None,
            date("2026-06-01"),
        );
        logged.last_accessed = None;
        let mut unlogged = Fact::new(
            "ali-002".to_string(),
            "b".to_string(),
            FactCategory::Context,
            vec![],
            None,
            date("2026-06-02"),
        );
        unlogged.last_accessed = None;
        entity.facts.push(logged);
        entity.facts.push(unlogged);

        let mut log = AccessLog::default();
        log.bump("alice", "ali-001", date("2026-08-01"));
        log.bump("alice", "ali-001", date("2026-08-02"));

        let updated = backfill(&mut entity, &log);
        assert_eq!(updated, 2);
        assert_eq!(
            entity.fact("ali-001").unwrap().last_accessed,
            Some(date("2026-08-02"))
        );
        assert_eq!(entity.fact("ali-001").unwrap().access_count, 2);
        // No log entry: falls back to the fact's own creation date
        assert_eq!(
            entity.fact("ali-002").unwrap().last_accessed,
            Some(date("2026-06-02"))
        );
        assert_eq!(entity.fact("ali-002").unwrap().access_count, 0);
    }

    #[test]
    fn test_backfill_leaves_tracked_facts_alone() {
        let key = EntityKey::new(EntityType::People, "alice");
        let mut entity = Entity::new(&key, "", date("2026-06-01"));
        entity.facts.push(Fact::new(
            "ali-001".to_string(),
            "a".to_string(),
            FactCategory::Context,
            vec![],
            None,
            date("2026-08-01"),
        ));

        assert_eq!(backfill(&mut entity, &AccessLog::default()), 0);
        assert_eq!(
            entity.fact("ali-001").unwrap().last_accessed,
            Some(date("2026-08-01"))
        );
    }
}
