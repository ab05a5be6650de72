//! Summary regeneration: the human/agent-readable view of an entity.
//!
//! Regeneration is a total replacement derived only from the current fact
//! set, so the view can never drift from the raw store: the same entity
//! always renders to byte-identical output.
//!
//! Hot facts are ordered by descending access count, then by most recent
//! access; Warm facts by most recent access. Cold facts never render —
//! only a count pointing back at `facts.json`.

use chrono::NaiveDate;

use crate::models::{Entity, Fact, FactCategory};
use crate::services::decay::{self, TierConfig, TieredFacts};

/// Regenerate the summary for an entity at instant `now`.
pub fn render(entity: &Entity, now: NaiveDate, config: &TierConfig) -> String {
    let tiers = decay::partition(&entity.facts, now, config);
    render_tiered(entity, &tiers)
}

/// Render from already-partitioned facts.
pub fn render_tiered(entity: &Entity, tiers: &TieredFacts) -> String {
    let mut hot = tiers.hot.clone();
    sort_hot(&mut hot);
    let mut warm = tiers.warm.clone();
    sort_warm(&mut warm);

    let mut lines: Vec<String> = vec![
        format!("# {}", title_case(&entity.id)),
        String::new(),
        format!("*Entity created: {}*", entity.created),
        format!("*Last updated: {}*", entity.last_updated),
    ];

    if !entity.created_reason.is_empty() {
        lines.push(format!("*Reason: {}*", entity.created_reason));
    }

    lines.push(String::new());

    if !hot.is_empty() {
        lines.push("## 🔥 Hot (Recent/Frequent)".to_string());
        for fact in &hot {
            lines.push(bullet(fact));
        }
        lines.push(String::new());
    }

    if !warm.is_empty() {
        lines.push("## 🌡️ Warm (Older)".to_string());
        for fact in &warm {
            lines.push(bullet(fact));
        }
        lines.push(String::new());
    }

    if !tiers.cold.is_empty() {
        lines.push(format!("*(+ {} older facts in facts.json)*", tiers.cold.len()));
    }

    let related = entity.related_entities();
    if !related.is_empty() {
        lines.push(String::new());
        lines.push("## 🔗 Connected To".to_string());
        for rel in related {
            lines.push(format!("- {}", rel));
        }
    }

    lines.join("\n")
}

/// Hot ordering: most retrieved first, most recently accessed breaking ties.
pub fn sort_hot(facts: &mut [Fact]) {
    facts.sort_by(|a, b| {
        b.access_count
            .cmp(&a.access_count)
            .then(b.last_accessed.cmp(&a.last_accessed))
    });
}

/// Warm ordering: most recently accessed first.
pub fn sort_warm(facts: &mut [Fact]) {
    facts.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed));
}

fn bullet(fact: &Fact) -> String {
    let marker = if fact.category == FactCategory::Milestone {
        "📌"
    } else {
        "📎"
    };
    format!("- {} **{}**: {}", marker, fact.category, fact.fact)
}

fn title_case(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
