//! Fact merge engine.
//!
//! Reconciles a batch of candidate facts against per-entity fact stores.
//! For each candidate, in batch order: a duplicate of an existing active
//! fact reheats that fact through the access tracker (so re-processing the
//! same conversation excerpt is idempotent); an update supersedes exactly
//! one prior fact, preserving it for audit; anything else becomes a fresh
//! fact. Each touched entity is persisted with a single atomic save, so a
//! run aborted between entities can simply be re-run.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::models::{
    CheckpointBatch, Entity, EntityFactRecord, EntityKey, Fact, FactCategory, FactSource,
};
use crate::services::access;
use crate::services::store::EntityStore;

/// Decides when a candidate duplicates or updates an existing active fact
/// of the same category. Implementations must be deterministic and
/// side-effect-free so merge stays idempotent and re-runnable.
pub trait MatchRules: Send + Sync {
    /// The candidate restates `existing`: reheat instead of creating.
    fn is_duplicate(&self, candidate: &str, existing: &str) -> bool;

    /// The candidate carries newer information about the same subject:
    /// supersede `existing`.
    fn is_update(&self, candidate: &str, existing: &str) -> bool;
}

/// Baseline rule: case-insensitive, whitespace-collapsed text equality for
/// duplicates, and no inferred updates — supersession then only happens
/// when the extractor names the fact it replaces. Stronger similarity
/// rules can be swapped in without touching merge invariants.
pub struct NormalizedExactMatch;

impl MatchRules for NormalizedExactMatch {
    fn is_duplicate(&self, candidate: &str, existing: &str) -> bool {
        normalize(candidate) == normalize(existing)
    }

    fn is_update(&self, _candidate: &str, _existing: &str) -> bool {
        false
    }
}

/// Collapse whitespace and case for text comparison.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Outcome of a checkpoint merge run.
#[derive(Debug, Default)]
pub struct MergeReport {
    pub entities_created: usize,
    pub entities_saved: usize,
    pub facts_added: usize,
    pub facts_superseded: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub cross_links: usize,
    /// Entities that failed with the error message, retried next run.
    pub failures: Vec<(String, String)>,
    /// Entities whose fact store was modified (summaries need a refresh).
    pub modified: Vec<EntityKey>,
    /// Facts reheated by duplicate detection, mirrored to the access log.
    pub touched: Vec<(EntityKey, String)>,
}

impl MergeReport {
    fn fail(&mut self, key: &EntityKey, err: Error) {
        warn!(entity = %key, "merge failed: {}", err);
        self.failures.push((key.to_string(), err.to_string()));
    }
}

impl std::fmt::Display for MergeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "entities: {} saved, {} created, {} failed; facts: {} added, {} superseded, {} reheated, {} rejected",
            self.entities_saved,
            self.entities_created,
            self.failures.len(),
            self.facts_added,
            self.facts_superseded,
            self.duplicates,
            self.rejected,
        )
    }
}

/// The merge engine over an entity store.
pub struct MergeEngine<'a> {
    store: &'a EntityStore,
    rules: Box<dyn MatchRules>,
}

impl<'a> MergeEngine<'a> {
    pub fn new(store: &'a EntityStore) -> Self {
        Self {
            store,
            rules: Box::new(NormalizedExactMatch),
        }
    }

    /// Substitute the duplicate/update predicate.
    pub fn with_rules(mut self, rules: Box<dyn MatchRules>) -> Self {
        self.rules = rules;
        self
    }

    /// Merge a full checkpoint batch. Individual failures (malformed
    /// records, busy or corrupt entities) are reported and skipped; the
    /// rest of the batch proceeds.
    pub async fn run(&self, batch: &CheckpointBatch, now: DateTime<Utc>) -> MergeReport {
        let today = now.date_naive();
        let mut report = MergeReport::default();

        // Explicitly requested entities first, so facts can land in them
        for record in &batch.new_entities {
            match record.validate() {
                Ok(key) => match self.ensure_entity(&key, &record.reason, today).await {
                    Ok(created) => {
                        if created {
                            info!(entity = %key, "created entity");
                            report.entities_created += 1;
                        }
                    }
                    Err(e) => report.fail(&key, e),
                },
                Err(e) => {
                    warn!("rejected entity record: {}", e);
                    report.rejected += 1;
                }
            }
        }

        // Group candidates by target entity, preserving batch order
        let mut groups: Vec<(EntityKey, Vec<(&EntityFactRecord, FactCategory)>)> = Vec::new();
        for record in &batch.entity_facts {
            match record.validate() {
                Ok((key, category)) => {
                    match groups.iter_mut().find(|(k, _)| *k == key) {
                        Some((_, list)) => list.push((record, category)),
                        None => groups.push((key, vec![(record, category)])),
                    }
                }
                Err(e) => {
                    warn!("rejected candidate: {}", e);
                    report.rejected += 1;
                }
            }
        }

        // One atomic save per entity touched
        for (key, records) in &groups {
            match self.merge_entity(key, records, now, &mut report).await {
                Ok(()) => report.entities_saved += 1,
                Err(e) => report.fail(key, e),
            }
        }

        // Weak back-references onto related entities, best effort
        self.link_related(&groups, &mut report).await;

        report
    }

    /// Create the entity if it does not exist yet. Returns whether a new
    /// one was persisted.
    async fn ensure_entity(
        &self,
        key: &EntityKey,
        reason: &str,
        today: chrono::NaiveDate,
    ) -> crate::Result<bool> {
        let _lock = self.store.lock(key).await?;
        if self.store.exists(key).await {
            return Ok(false);
        }
        let entity = Entity::new(key, reason, today);
        self.store.save(key, &entity).await?;
        Ok(true)
    }

    /// Merge all of one entity's candidates under its lock, then save once.
    async fn merge_entity(
        &self,
        key: &EntityKey,
        records: &[(&EntityFactRecord, FactCategory)],
        now: DateTime<Utc>,
        report: &mut MergeReport,
    ) -> crate::Result<()> {
        let today = now.date_naive();
        let _lock = self.store.lock(key).await?;

        let (mut entity, created) = match self.store.try_load(key).await? {
            Some(entity) => (entity, false),
            None => (
                Entity::new(key, "Auto-created for fact storage", today),
                true,
            ),
        };

        for (record, category) in records {
            self.merge_candidate(&mut entity, key, record, *category, now, report);
        }

        entity.last_updated = today;
        self.store.save(key, &entity).await?;
        if created {
            info!(entity = %key, "created entity");
            report.entities_created += 1;
        }
        report.modified.push(key.clone());
        Ok(())
    }

    /// Apply one candidate to an in-memory entity.
    fn merge_candidate(
        &self,
        entity: &mut Entity,
        key: &EntityKey,
        record: &EntityFactRecord,
        category: FactCategory,
        now: DateTime<Utc>,
        report: &mut MergeReport,
    ) {
        let today = now.date_naive();
        let content = record.fact.content.trim();

        // 1. Duplicate: reheat the matched fact, create nothing. On
        // multiple matches the most recently accessed one wins.
        let duplicate = entity
            .facts
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_active() && f.category == category)
            .filter(|(_, f)| self.rules.is_duplicate(content, &f.fact))
            .max_by_key(|(i, f)| (f.last_accessed, *i))
            .map(|(i, _)| i);

        if let Some(idx) = duplicate {
            access::touch(&mut entity.facts[idx], today);
            debug!(entity = %key, fact = %entity.facts[idx].id, "duplicate candidate, reheated");
            report.duplicates += 1;
            report.touched.push((key.clone(), entity.facts[idx].id.clone()));
            return;
        }

        // 2. Supersession target, if any
        let target = self.supersession_target(entity, record, category, content);

        let new_id = entity.next_fact_id();
        let source = record
            .fact
            .source
            .clone()
            .unwrap_or_else(|| FactSource::conversation(now));
        let fact = Fact::new(
            new_id.clone(),
            content.to_string(),
            category,
            record.fact.related_entities.clone(),
            Some(source),
            today,
        );

        if let Some(old_id) = target {
            if let Some(old) = entity.fact_mut(&old_id) {
                old.supersede(&new_id);
                debug!(entity = %key, old = %old_id, new = %new_id, "superseded fact");
                report.facts_superseded += 1;
            }
        }

        entity.facts.push(fact);
        report.facts_added += 1;
    }

    /// Pick at most one active fact the candidate supersedes: an explicit
    /// hint from the extractor wins; otherwise the update predicate
    /// applies, resolving ambiguity toward the most recently created
    /// match (the minimal edit).
    fn supersession_target(
        &self,
        entity: &Entity,
        record: &EntityFactRecord,
        category: FactCategory,
        content: &str,
    ) -> Option<String> {
        if let Some(id) = &record.supersedes_id {
            match entity.fact(id) {
                Some(f) if f.is_active() => return Some(id.clone()),
                Some(_) => warn!(fact = %id, "supersedes_id names a superseded fact, ignoring"),
                None => warn!(fact = %id, "supersedes_id names an unknown fact, ignoring"),
            }
        }

        entity
            .facts
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_active() && f.category == category)
            .filter(|(_, f)| self.rules.is_update(content, &f.fact))
            .max_by_key(|(i, f)| (f.created, *i))
            .map(|(_, f)| f.id.clone())
    }

    /// Add back-references to entities named in the batch's
    /// `relatedEntities`. Weak links: missing referents, busy or corrupt
    /// entities are skipped with a log line.
    async fn link_related(
        &self,
        groups: &[(EntityKey, Vec<(&EntityFactRecord, FactCategory)>)],
        report: &mut MergeReport,
    ) {
        let mut links: Vec<(EntityKey, String)> = Vec::new();
        for (source, records) in groups {
            for (record, _) in records {
                for rel in &record.fact.related_entities {
                    let Some(target) = EntityKey::parse(rel) else {
                        continue;
                    };
                    if target == *source {
                        continue;
                    }
                    let link = (target, source.reference());
                    if !links.contains(&link) {
                        links.push(link);
                    }
                }
            }
        }

        for (target, back_ref) in links {
            match self.add_back_reference(&target, &back_ref).await {
                Ok(true) => report.cross_links += 1,
                Ok(false) => {}
                Err(e) => warn!(entity = %target, "skipping back-reference: {}", e),
            }
        }
    }

    async fn add_back_reference(&self, key: &EntityKey, back_ref: &str) -> crate::Result<bool> {
        if !self.store.exists(key).await {
            return Ok(false);
        }

        let _lock = self.store.lock(key).await?;
        let mut entity = self.store.load(key).await?;

        let mut changed = false;
        for fact in entity.facts.iter_mut().filter(|f| f.is_active()) {
            if !fact.related_entities.iter().any(|r| r == back_ref) {
                fact.related_entities.push(back_ref.to_string());
                changed = true;
            }
        }

        if changed {
            self.store.save(key, &entity).await?;
        }
        Ok(changed)
    }
}
