//! Fact tiering from access recency and frequency.
//!
//! Pure functions with no persisted state of their own: tiers are
//! recomputed fresh on every run and never cached on the fact records, so
//! there is no staleness hazard between runs. High access counts resist
//! decay regardless of recency.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::Fact;

/// Default days within which a fact stays Hot.
pub const DEFAULT_HOT_DAYS: i64 = 7;

/// Default days within which a fact stays Warm.
pub const DEFAULT_WARM_DAYS: i64 = 30;

/// Default access count at which a fact resists decay entirely.
pub const DEFAULT_HIGH_FREQ_THRESHOLD: u32 = 10;

/// Hot/Warm/Cold classification of an active fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Hot,
    Warm,
    Cold,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Hot => "hot",
            Tier::Warm => "warm",
            Tier::Cold => "cold",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Thresholds for tier assignment.
#[derive(Debug, Clone)]
pub struct TierConfig {
    pub hot_days: i64,
    pub warm_days: i64,
    pub high_freq_threshold: u32,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            hot_days: DEFAULT_HOT_DAYS,
            warm_days: DEFAULT_WARM_DAYS,
            high_freq_threshold: DEFAULT_HIGH_FREQ_THRESHOLD,
        }
    }
}

impl TierConfig {
    /// Create a config with custom thresholds. The warm window never
    /// shrinks below the hot window.
    pub fn new(hot_days: i64, warm_days: i64, high_freq_threshold: u32) -> Self {
        let hot_days = hot_days.max(0);
        Self {
            hot_days,
            warm_days: warm_days.max(hot_days),
            high_freq_threshold,
        }
    }
}

/// Whole days since a fact was last accessed, clamped to zero for future
/// timestamps. `None` means the timestamp was missing or malformed.
pub fn days_since_access(last_accessed: Option<NaiveDate>, now: NaiveDate) -> Option<i64> {
    last_accessed.map(|d| (now - d).num_days().max(0))
}

/// Assign a tier to a single fact at instant `now`.
pub fn tier_for(fact: &Fact, now: NaiveDate, config: &TierConfig) -> Tier {
    // High frequency resists decay regardless of recency
    if fact.access_count >= config.high_freq_threshold {
        return Tier::Hot;
    }

    match days_since_access(fact.last_accessed, now) {
        // Missing or malformed timestamp reads as very old
        None => Tier::Cold,
        Some(days) if days <= config.hot_days => Tier::Hot,
        Some(days) if days <= config.warm_days => Tier::Warm,
        Some(_) => Tier::Cold,
    }
}

/// An entity's active facts partitioned by tier. Superseded facts are
/// excluded entirely, as if absent.
#[derive(Debug, Clone, Default)]
pub struct TieredFacts {
    pub hot: Vec<Fact>,
    pub warm: Vec<Fact>,
    pub cold: Vec<Fact>,
}

impl TieredFacts {
    pub fn active_count(&self) -> usize {
        self.hot.len() + self.warm.len() + self.cold.len()
    }
}

/// Partition a fact list into tiers, keeping list order within each tier.
pub fn partition(facts: &[Fact], now: NaiveDate, config: &TierConfig) -> TieredFacts {
    let mut tiers = TieredFacts::default();
    for fact in facts.iter().filter(|f| f.is_active()) {
        match tier_for(fact, now, config) {
            Tier::Hot => tiers.hot.push(fact.clone()),
            Tier::Warm => tiers.warm.push(fact.clone()),
            Tier::Cold => tiers.cold.push(fact.clone()),
        }
    }
    tiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FactCategory;
    use chrono::Duration;

    const NOW: &str = "2026-08-07";

    fn now() -> NaiveDate {
        NaiveDate::parse_from_str(NOW, "%Y-%m-%d").unwrap()
    }

    fn fact_accessed(days_ago: i64, access_count: u32) -> Fact {
        let mut fact = Fact::new(
            "tst-001".to_string(),
            "test fact".to_string(),
            FactCategory::Context,
            vec![],
            None,
            now() - Duration::days(days_ago),
        );
        fact.access_count = access_count;
        fact
    }

    #[test]
    fn test_recent_fact_is_hot() {
        let config = TierConfig::default();
        assert_eq!(tier_for(&fact_accessed(0, 0), now(), &config), Tier::Hot);
        assert_eq!(tier_for(&fact_accessed(3, 0), now(), &config), Tier::Hot);
    }

    #[test]
    fn test_tier_boundaries() {
        let config = TierConfig::default();
        // Exactly 7 days is still Hot; 8 is Warm
        assert_eq!(tier_for(&fact_accessed(7, 0), now(), &config), Tier::Hot);
        assert_eq!(tier_for(&fact_accessed(8, 0), now(), &config), Tier::Warm);
        // Exactly 30 days is still Warm; 31 is Cold
        assert_eq!(tier_for(&fact_accessed(30, 0), now(), &config), Tier::Warm);
        assert_eq!(tier_for(&fact_accessed(31, 0), now(), &config), Tier::Cold);
    }

    #[test]
    fn test_frequency_resists_decay() {
        let config = TierConfig::default();
        assert_eq!(tier_for(&fact_accessed(400, 10), now(), &config), Tier::Hot);
        // One below the threshold decays normally
        assert_eq!(tier_for(&fact_accessed(400, 9), now(), &config), Tier::Cold);
    }

    #[test]
    fn test_missing_timestamp_is_cold() {
        let config = TierConfig::default();
        let mut fact = fact_accessed(0, 0);
        fact.last_accessed = None;
        assert_eq!(tier_for(&fact, now(), &config), Tier::Cold);
    }

    #[test]
    fn test_future_timestamp_clamps_to_zero() {
        let config = TierConfig::default();
        let mut fact = fact_accessed(0, 0);
        fact.last_accessed = Some(now() + Duration::days(14));
        assert_eq!(days_since_access(fact.last_accessed, now()), Some(0));
        assert_eq!(tier_for(&fact, now(), &config), Tier::Hot);
    }

    #[test]
    fn test_partition_excludes_superseded() {
        let config = TierConfig::default();
        let mut old = fact_accessed(1, 0);
        old.supersede("tst-002");
        let fresh = fact_accessed(1, 0);

        let tiers = partition(&[old, fresh], now(), &config);
        assert_eq!(tiers.hot.len(), 1);
        assert_eq!(tiers.active_count(), 1);
    }

    #[test]
    fn test_custom_thresholds() {
        let config = TierConfig::new(1, 2, 3);
        assert_eq!(tier_for(&fact_accessed(1, 0), now(), &config), Tier::Hot);
        assert_eq!(tier_for(&fact_accessed(2, 0), now(), &config), Tier::Warm);
        assert_eq!(tier_for(&fact_accessed(3, 0), now(), &config), Tier::Cold);
        assert_eq!(tier_for(&fact_accessed(90, 3), now(), &config), Tier::Hot);
    }
}
