//! Run orchestration: checkpoint (merge) runs, decay runs, and the
//! outward-facing touch/view operations.
//!
//! Checkpoint and decay are independent short-lived invocations that may
//! overlap; they only meet at the per-entity locks in the store. Either
//! can be aborted between entities without corruption — every persisted
//! entity is a complete state as of some finished step.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{CheckpointBatch, Entity, EntityKey, EntityType, Fact};
use crate::services::access::{self, AccessLog, AccessTracker};
use crate::services::decay::{self, Tier, TierConfig};
use crate::services::merge::{MatchRules, MergeEngine, MergeReport};
use crate::services::notes::DailyNotes;
use crate::services::store::EntityStore;
use crate::services::summary;

/// Outcome of a decay run.
#[derive(Debug, Default)]
pub struct DecayReport {
    pub entities_processed: usize,
    /// Facts that made it into a summary (Hot + Warm).
    pub facts_in_summaries: usize,
    /// Facts that received backfilled access metadata (full mode only).
    pub backfilled: usize,
    /// Entities skipped because their fact store was unparseable.
    pub quarantined: Vec<String>,
    /// Entities skipped because another writer held their lock.
    pub busy: Vec<String>,
}

impl std::fmt::Display for DecayReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} entities, {} facts in summaries, {} backfilled, {} quarantined, {} busy",
            self.entities_processed,
            self.facts_in_summaries,
            self.backfilled,
            self.quarantined.len(),
            self.busy.len(),
        )
    }
}

/// An entity's tiered, active-only fact view, for external readers.
#[derive(Debug, Serialize)]
pub struct EntityView {
    pub entity: String,
    pub entity_type: EntityType,
    pub created: NaiveDate,
    #[serde(rename = "lastUpdated")]
    pub last_updated: NaiveDate,
    pub facts: Vec<TieredFactView>,
    #[serde(rename = "relatedEntities")]
    pub related_entities: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TieredFactView {
    pub tier: Tier,
    #[serde(flatten)]
    pub fact: Fact,
}

/// Wires the store, tracker, notes and tier thresholds into the run
/// entry points the CLI exposes.
pub struct Runner {
    store: EntityStore,
    tracker: AccessTracker,
    notes: DailyNotes,
    tiers: TierConfig,
}

impl Runner {
    pub fn new(
        store: EntityStore,
        tracker: AccessTracker,
        notes: DailyNotes,
        tiers: TierConfig,
    ) -> Self {
        Self {
            store,
            tracker,
            notes,
            tiers,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let store = EntityStore::new(&config.storage.para_dir).with_lock_timing(
            std::time::Duration::from_millis(config.lock.timeout_ms),
            std::time::Duration::from_millis(config.lock.retry_ms),
        );
        Self::new(
            store,
            AccessTracker::new(&config.storage.cache_dir),
            DailyNotes::new(&config.storage.memory_dir),
            TierConfig::new(
                config.decay.hot_days,
                config.decay.warm_days,
                config.decay.high_freq_threshold,
            ),
        )
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Run a checkpoint: merge a candidate batch, mirror reheats into the
    /// access log, refresh summaries of modified entities, and append any
    /// daily-note material.
    pub async fn checkpoint(
        &self,
        batch: &CheckpointBatch,
        now: DateTime<Utc>,
    ) -> Result<MergeReport> {
        self.checkpoint_with_rules(batch, now, None).await
    }

    /// Checkpoint with a substituted duplicate/update predicate.
    pub async fn checkpoint_with_rules(
        &self,
        batch: &CheckpointBatch,
        now: DateTime<Utc>,
        rules: Option<Box<dyn MatchRules>>,
    ) -> Result<MergeReport> {
        info!(
            candidates = batch.entity_facts.len(),
            new_entities = batch.new_entities.len(),
            "starting checkpoint run"
        );

        let mut engine = MergeEngine::new(&self.store);
        if let Some(rules) = rules {
            engine = engine.with_rules(rules);
        }
        let report = engine.run(batch, now).await;

        let today = now.date_naive();
        for (key, fact_id) in &report.touched {
            if let Err(e) = self
                .tracker
                .record(&key.id, std::slice::from_ref(fact_id), today)
                .await
            {
                warn!(entity = %key, "failed to update access log: {}", e);
            }
        }

        for key in &report.modified {
            if let Err(e) = self.regenerate_summary(key, today).await {
                warn!(entity = %key, "failed to refresh summary: {}", e);
            }
        }

        if let Some(note) = batch.daily_notes.as_deref().filter(|n| !n.trim().is_empty()) {
            self.notes.append(note, now).await?;
        }

        info!(%report, "checkpoint complete");
        Ok(report)
    }

    /// Run decay across the whole corpus.
    ///
    /// Quick mode regenerates summaries from current tiers with no side
    /// effects on the fact stores. Full mode additionally backfills access
    /// metadata from the access log and audits supersession chains — still
    /// idempotent, still non-destructive.
    pub async fn run_decay(&self, now: DateTime<Utc>, quick: bool) -> Result<DecayReport> {
        let today = now.date_naive();
        info!(
            quick,
            hot_days = self.tiers.hot_days,
            warm_days = self.tiers.warm_days,
            high_freq = self.tiers.high_freq_threshold,
            "starting decay run"
        );

        let log = if quick {
            None
        } else {
            Some(self.tracker.load_log().await)
        };

        let mut report = DecayReport::default();
        for key in self.store.list_all().await? {
            match self.decay_entity(&key, today, log.as_ref(), &mut report).await {
                Ok(count) => {
                    report.entities_processed += 1;
                    report.facts_in_summaries += count;
                }
                Err(Error::Busy(k)) => {
                    warn!(entity = %k, "entity busy, retried next run");
                    report.busy.push(k);
                }
                Err(Error::Corrupt { key, reason }) => {
                    warn!(entity = %key, "quarantined corrupt entity: {}", reason);
                    report.quarantined.push(key);
                }
                Err(e) => {
                    warn!(entity = %key, "skipping entity: {}", e);
                    report.quarantined.push(key.to_string());
                }
            }
        }

        info!(%report, "decay run complete");
        Ok(report)
    }

    async fn decay_entity(
        &self,
        key: &EntityKey,
        today: NaiveDate,
        log: Option<&AccessLog>,
        report: &mut DecayReport,
    ) -> Result<usize> {
        // Full mode rewrites fact metadata, so it needs the writer lock;
        // quick mode only replaces the derived summary.
        let entity = match log {
            Some(log) => {
                let _lock = self.store.lock(key).await?;
                let mut entity = self.store.load(key).await?;

                let backfilled = access::backfill(&mut entity, log);
                if backfilled > 0 {
                    report.backfilled += backfilled;
                    self.store.save(key, &entity).await?;
                }

                self.audit(key, &entity);
                entity
            }
            None => self.store.load(key).await?,
        };

        let tiers = decay::partition(&entity.facts, today, &self.tiers);
        let rendered = summary::render_tiered(&entity, &tiers);
        self.store.save_summary(key, &rendered).await?;

        Ok(tiers.hot.len() + tiers.warm.len())
    }

    /// Housekeeping checks: broken supersession chains and entities whose
    /// history dwarfs their active facts.
    fn audit(&self, key: &EntityKey, entity: &Entity) {
        for problem in entity.audit_chains() {
            warn!(entity = %key, "supersession chain problem: {}", problem);
        }

        let active = entity.active_facts().count();
        let superseded = entity.facts.len() - active;
        if superseded > active * 2 {
            info!(entity = %key, active, superseded, "superseded facts dominate this entity");
        }
    }

    /// Reheat a fact on behalf of an external reader.
    pub async fn touch(
        &self,
        key: &EntityKey,
        fact_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Fact> {
        let today = now.date_naive();
        let _lock = self.store.lock(key).await?;
        let mut entity = self.store.load(key).await?;

        let fact = entity
            .fact_mut(fact_id)
            .ok_or_else(|| Error::FactNotFound(format!("{}#{}", key, fact_id)))?;
        access::touch(fact, today);
        let snapshot = fact.clone();

        self.store.save(key, &entity).await?;
        self.tracker
            .record(&key.id, &[fact_id.to_string()], today)
            .await?;

        info!(entity = %key, fact = %fact_id, "fact reheated");
        Ok(snapshot)
    }

    /// Read path for external retrieval collaborators: the entity's
    /// tiered, active-only facts, ordered as the summary orders them.
    pub async fn view(&self, key: &EntityKey, now: DateTime<Utc>) -> Result<EntityView> {
        let today = now.date_naive();
        let entity = self.store.load(key).await?;
        let tiers = decay::partition(&entity.facts, today, &self.tiers);

        let mut hot = tiers.hot;
        summary::sort_hot(&mut hot);
        let mut warm = tiers.warm;
        summary::sort_warm(&mut warm);

        let mut facts = Vec::with_capacity(hot.len() + warm.len() + tiers.cold.len());
        facts.extend(hot.into_iter().map(|fact| TieredFactView {
            tier: Tier::Hot,
            fact,
        }));
        facts.extend(warm.into_iter().map(|fact| TieredFactView {
            tier: Tier::Warm,
            fact,
        }));
        facts.extend(tiers.cold.into_iter().map(|fact| TieredFactView {
            tier: Tier::Cold,
            fact,
        }));

        Ok(EntityView {
            entity: key.to_string(),
            entity_type: entity.entity_type,
            created: entity.created,
            last_updated: entity.last_updated,
            related_entities: entity.related_entities(),
            facts,
        })
    }

    async fn regenerate_summary(&self, key: &EntityKey, today: NaiveDate) -> Result<()> {
        let entity = self.store.load(key).await?;
        let rendered = summary::render(&entity, today, &self.tiers);
        self.store.save_summary(key, &rendered).await
    }
}
