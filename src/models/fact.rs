//! Fact model: an atomic, timestamped, categorized claim about an entity.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Category of a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactCategory {
    /// Personal/professional relationship to the user
    Relationship,
    /// Something achieved or shipped
    Milestone,
    /// Current state of affairs, likely to change
    Status,
    /// A standing preference
    Preference,
    /// Background context
    Context,
}

impl FactCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactCategory::Relationship => "relationship",
            FactCategory::Milestone => "milestone",
            FactCategory::Status => "status",
            FactCategory::Preference => "preference",
            FactCategory::Context => "context",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "relationship" => Some(FactCategory::Relationship),
            "milestone" => Some(FactCategory::Milestone),
            "status" => Some(FactCategory::Status),
            "preference" => Some(FactCategory::Preference),
            "context" => Some(FactCategory::Context),
            _ => None,
        }
    }

    pub fn all() -> &'static [FactCategory] {
        &[
            FactCategory::Relationship,
            FactCategory::Milestone,
            FactCategory::Status,
            FactCategory::Preference,
            FactCategory::Context,
        ]
    }
}

impl std::fmt::Display for FactCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a fact.
///
/// Facts are never deleted: a replaced fact flips to `Superseded` and is
/// retained for audit, invisible to tiering and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactStatus {
    Active,
    Superseded,
}

impl FactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactStatus::Active => "active",
            FactStatus::Superseded => "superseded",
        }
    }
}

impl std::fmt::Display for FactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a fact entered the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Extracted from a conversation by the external checkpoint step
    Conversation,
    /// Imported from a file
    File,
    /// Entered by hand
    Manual,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Conversation => "conversation",
            SourceType::File => "file",
            SourceType::Manual => "manual",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "conversation" => Some(SourceType::Conversation),
            "file" => Some(SourceType::File),
            "manual" => Some(SourceType::Manual),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provenance of a fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactSource {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl FactSource {
    pub fn conversation(timestamp: DateTime<Utc>) -> Self {
        Self {
            source_type: SourceType::Conversation,
            timestamp,
            channel: None,
        }
    }
}

/// A single fact in an entity's store.
///
/// Field names match the persisted `facts.json` schema. Dates are lenient
/// on read: an unparseable `created`/`lastAccessed` deserializes to `None`
/// rather than failing the entity, and tiering treats the fact as very old.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub id: String,
    pub fact: String,
    pub category: FactCategory,
    pub status: FactStatus,
    #[serde(default, with = "lenient_date", skip_serializing_if = "Option::is_none")]
    pub created: Option<NaiveDate>,
    #[serde(
        rename = "lastAccessed",
        default,
        with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_accessed: Option<NaiveDate>,
    #[serde(rename = "accessCount", default)]
    pub access_count: u32,
    #[serde(rename = "supersededBy", default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<String>,
    #[serde(rename = "relatedEntities", default, skip_serializing_if = "Vec::is_empty")]
    pub related_entities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<FactSource>,
}

impl Fact {
    /// Create a fresh active fact as the merge engine does: accessed now,
    /// never retrieved yet.
    pub fn new(
        id: String,
        text: String,
        category: FactCategory,
        related_entities: Vec<String>,
        source: Option<FactSource>,
        now: NaiveDate,
    ) -> Self {
        Self {
            id,
            fact: text,
            category,
            status: FactStatus::Active,
            created: Some(now),
            last_accessed: Some(now),
            access_count: 0,
            superseded_by: None,
            related_entities,
            source,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == FactStatus::Active
    }

    /// Flip this fact to superseded, pointing at its replacement.
    pub fn supersede(&mut self, replacement_id: &str) {
        self.status = FactStatus::Superseded;
        self.superseded_by = Some(replacement_id.to_string());
    }
}

/// Lenient date (de)serialization for fact timestamps.
///
/// Accepts `YYYY-MM-DD` and datetime strings with a date prefix; anything
/// else reads as `None` so a single bad timestamp cannot corrupt an entity.
pub(crate) mod lenient_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_date))
    }

    pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
        let prefix = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_fact_roundtrip() {
        let fact = Fact::new(
            "ali-001".to_string(),
            "Works at Acme".to_string(),
            FactCategory::Status,
            vec!["companies/acme".to_string()],
            Some(FactSource::conversation(
                "2026-08-01T10:30:00Z".parse().unwrap(),
            )),
            date("2026-08-01"),
        );

        let json = serde_json::to_string_pretty(&fact).unwrap();
        assert!(json.contains("\"lastAccessed\": \"2026-08-01\""));
        assert!(json.contains("\"accessCount\": 0"));
        // Unset supersededBy is omitted entirely
        assert!(!json.contains("supersededBy"));

        let back: Fact = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "ali-001");
        assert_eq!(back.category, FactCategory::Status);
        assert_eq!(back.last_accessed, Some(date("2026-08-01")));
    }

    #[test]
    fn test_lenient_date_accepts_datetime_prefix() {
        assert_eq!(
            lenient_date::parse_date("2026-08-01T10:30:00Z"),
            Some(date("2026-08-01"))
        );
        assert_eq!(lenient_date::parse_date("2026-08-01"), Some(date("2026-08-01")));
    }

    #[test]
    fn test_lenient_date_rejects_garbage() {
        assert_eq!(lenient_date::parse_date("not-a-date"), None);
        assert_eq!(lenient_date::parse_date(""), None);
        assert_eq!(lenient_date::parse_date("2026-13-99"), None);
    }

    #[test]
    fn test_malformed_timestamp_does_not_fail_fact() {
        let json = r#"{
            "id": "ali-001",
            "fact": "Works at Acme",
            "category": "status",
            "status": "active",
            "created": "2026-08-01",
            "lastAccessed": "whenever",
            "accessCount": 3
        }"#;
        let fact: Fact = serde_json::from_str(json).unwrap();
        assert_eq!(fact.last_accessed, None);
        assert_eq!(fact.access_count, 3);
    }

    #[test]
    fn test_unknown_category_fails() {
        let json = r#"{
            "id": "ali-001",
            "fact": "x",
            "category": "gossip",
            "status": "active"
        }"#;
        assert!(serde_json::from_str::<Fact>(json).is_err());
    }
}
