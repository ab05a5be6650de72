//! Entity model: a tracked subject (person, company, project, resource
//! topic) with its own fact store.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Fact, FactStatus};

/// Type bucket an entity lives in.
///
/// People and companies nest under `areas/` on disk; projects and
/// resources sit at the top of the corpus directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Projects,
    People,
    Companies,
    Resources,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Projects => "projects",
            EntityType::People => "people",
            EntityType::Companies => "companies",
            EntityType::Resources => "resources",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "projects" => Some(EntityType::Projects),
            "people" => Some(EntityType::People),
            "companies" => Some(EntityType::Companies),
            "resources" => Some(EntityType::Resources),
            _ => None,
        }
    }

    pub fn all() -> &'static [EntityType] {
        &[
            EntityType::Projects,
            EntityType::People,
            EntityType::Companies,
            EntityType::Resources,
        ]
    }

    /// Whether this bucket nests under `areas/` on disk.
    pub fn is_area(&self) -> bool {
        matches!(self, EntityType::People | EntityType::Companies)
    }

    /// Directory holding this bucket's entities.
    pub fn bucket_dir(&self, para_dir: &Path) -> PathBuf {
        if self.is_area() {
            para_dir.join("areas").join(self.as_str())
        } else {
            para_dir.join(self.as_str())
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Path-like key addressing an entity: `<type>/<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub entity_type: EntityType,
    pub id: String,
}

impl EntityKey {
    pub fn new(entity_type: EntityType, id: impl Into<String>) -> Self {
        Self {
            entity_type,
            id: id.into(),
        }
    }

    /// Parse a key from its canonical `<type>/<id>` form or the on-disk
    /// `areas/<type>/<id>` form.
    pub fn parse(key: &str) -> Option<Self> {
        let parts: Vec<&str> = key.split('/').filter(|p| !p.is_empty()).collect();
        let (type_str, id) = match parts.as_slice() {
            ["areas", t, id] => (*t, *id),
            [t, id] => (*t, *id),
            _ => return None,
        };
        let entity_type = EntityType::from_str(type_str)?;
        // areas/projects/x is not a valid layout
        if parts.len() == 3 && !entity_type.is_area() {
            return None;
        }
        Some(Self::new(entity_type, id))
    }

    /// Directory of this entity under the corpus root.
    pub fn storage_path(&self, para_dir: &Path) -> PathBuf {
        self.entity_type.bucket_dir(para_dir).join(&self.id)
    }

    /// The reference form other entities use to point here, matching the
    /// on-disk layout (`areas/people/tara`, `projects/bards-and-cards`).
    pub fn reference(&self) -> String {
        if self.entity_type.is_area() {
            format!("areas/{}/{}", self.entity_type, self.id)
        } else {
            self.to_string()
        }
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.id)
    }
}

/// A tracked entity and its ordered fact list, as persisted in
/// `facts.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "entity")]
    pub id: String,
    pub entity_type: EntityType,
    pub created: NaiveDate,
    #[serde(rename = "lastUpdated")]
    pub last_updated: NaiveDate,
    #[serde(rename = "createdReason", default)]
    pub created_reason: String,
    #[serde(default)]
    pub facts: Vec<Fact>,
}

impl Entity {
    /// Create an empty entity, as the merge engine does on first fact
    /// assignment to an unknown id.
    pub fn new(key: &EntityKey, reason: impl Into<String>, now: NaiveDate) -> Self {
        Self {
            id: key.id.clone(),
            entity_type: key.entity_type,
            created: now,
            last_updated: now,
            created_reason: reason.into(),
            facts: Vec::new(),
        }
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.entity_type, self.id.clone())
    }

    pub fn active_facts(&self) -> impl Iterator<Item = &Fact> {
        self.facts.iter().filter(|f| f.is_active())
    }

    pub fn fact(&self, id: &str) -> Option<&Fact> {
        self.facts.iter().find(|f| f.id == id)
    }

    pub fn fact_mut(&mut self, id: &str) -> Option<&mut Fact> {
        self.facts.iter_mut().find(|f| f.id == id)
    }

    /// Allocate the next fact id: `<slug-prefix(3)>-<NNN>`.
    ///
    /// Scans for the highest existing numeric suffix so ids stay unique
    /// even when a hand-edited file has gaps. Ids are never reused.
    pub fn next_fact_id(&self) -> String {
        let prefix: String = self.id.chars().take(3).collect();
        let max_seq = self
            .facts
            .iter()
            .filter_map(|f| f.id.rsplit('-').next())
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("{}-{:03}", prefix, max_seq + 1)
    }

    /// Follow the supersession chain from a fact to its current active
    /// replacement. Hops are bounded by the fact count, so a corrupted
    /// cycle returns `None` instead of looping.
    pub fn resolve_current(&self, fact_id: &str) -> Option<&Fact> {
        let mut current = self.fact(fact_id)?;
        for _ in 0..=self.facts.len() {
            match current.status {
                FactStatus::Active => return Some(current),
                FactStatus::Superseded => {
                    current = self.fact(current.superseded_by.as_deref()?)?;
                }
            }
        }
        None
    }

    /// Distinct related-entity references across active facts, in
    /// insertion order of first appearance.
    pub fn related_entities(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for fact in self.active_facts() {
            for rel in &fact.related_entities {
                if !seen.contains(rel) {
                    seen.push(rel.clone());
                }
            }
        }
        seen
    }

    /// Check the supersession invariants: every superseded fact points at
    /// an existing fact, and every chain terminates at an active fact.
    pub fn audit_chains(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for fact in &self.facts {
            match fact.status {
                FactStatus::Active => {
                    if fact.superseded_by.is_some() {
                        problems.push(format!("{}: active fact has supersededBy set", fact.id));
                    }
                }
                FactStatus::Superseded => {
                    if fact.superseded_by.is_none() {
                        problems.push(format!("{}: superseded without a replacement", fact.id));
                    } else if self.resolve_current(&fact.id).is_none() {
                        problems.push(format!("{}: supersession chain does not terminate", fact.id));
                    }
                }
            }
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FactCategory;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn entity_with_facts(ids: &[&str]) -> Entity {
        let key = EntityKey::new(EntityType::People, "alice");
        let mut entity = Entity::new(&key, "test", date("2026-08-01"));
        for id in ids {
            entity.facts.push(Fact::new(
                id.to_string(),
                format!("fact {}", id),
                FactCategory::Context,
                vec![],
                None,
                date("2026-08-01"),
            ));
        }
        entity
    }

    #[test]
    fn test_key_parse_forms() {
        let key = EntityKey::parse("people/tara").unwrap();
        assert_eq!(key.entity_type, EntityType::People);
        assert_eq!(key.id, "tara");

        let key = EntityKey::parse("areas/companies/acme").unwrap();
        assert_eq!(key.entity_type, EntityType::Companies);

        assert!(EntityKey::parse("people").is_none());
        assert!(EntityKey::parse("things/x").is_none());
        assert!(EntityKey::parse("areas/projects/x").is_none());
    }

    #[test]
    fn test_storage_path_nesting() {
        let para = Path::new("/w/para");
        let people = EntityKey::new(EntityType::People, "tara");
        assert_eq!(
            people.storage_path(para),
            Path::new("/w/para/areas/people/tara")
        );
        assert_eq!(people.reference(), "areas/people/tara");

        let project = EntityKey::new(EntityType::Projects, "bards-and-cards");
        assert_eq!(
            project.storage_path(para),
            Path::new("/w/para/projects/bards-and-cards")
        );
        assert_eq!(project.reference(), "projects/bards-and-cards");
    }

    #[test]
    fn test_next_fact_id_scans_max_suffix() {
        let mut entity = entity_with_facts(&["ali-001", "ali-005"]);
        assert_eq!(entity.next_fact_id(), "ali-006");

        entity.facts.clear();
        assert_eq!(entity.next_fact_id(), "ali-001");
    }

    #[test]
    fn test_resolve_current_follows_chain() {
        let mut entity = entity_with_facts(&["ali-001", "ali-002", "ali-003"]);
        entity.fact_mut("ali-001").unwrap().supersede("ali-002");
        entity.fact_mut("ali-002").unwrap().supersede("ali-003");

        let current = entity.resolve_current("ali-001").unwrap();
        assert_eq!(current.id, "ali-003");
        assert!(entity.audit_chains().is_empty());
    }

    #[test]
    fn test_resolve_current_detects_cycle() {
        let mut entity = entity_with_facts(&["ali-001", "ali-002"]);
        entity.fact_mut("ali-001").unwrap().supersede("ali-002");
        entity.fact_mut("ali-002").unwrap().supersede("ali-001");

        assert!(entity.resolve_current("ali-001").is_none());
        assert_eq!(entity.audit_chains().len(), 2);
    }

    #[test]
    fn test_related_entities_insertion_order() {
        let mut entity = entity_with_facts(&["ali-001", "ali-002"]);
        entity.fact_mut("ali-001").unwrap().related_entities =
            vec!["projects/zeta".to_string(), "areas/people/tara".to_string()];
        entity.fact_mut("ali-002").unwrap().related_entities =
            vec!["areas/people/tara".to_string(), "companies/acme".to_string()];

        assert_eq!(
            entity.related_entities(),
            vec!["projects/zeta", "areas/people/tara", "companies/acme"]
        );
    }
}
