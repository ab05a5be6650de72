//! para-memory — fact lifecycle and decay engine.
//!
//! A persistent, file-backed knowledge base of discrete facts about
//! entities (people, companies, projects, resource topics) for an agent
//! with no memory across sessions. Candidate facts extracted elsewhere are
//! merged into per-entity stores without duplication; replaced facts are
//! superseded, never deleted. A decay pass tiers active facts into
//! Hot/Warm/Cold from access recency and frequency and regenerates each
//! entity's summary view.

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::config;
pub use error::{Error, Result};
