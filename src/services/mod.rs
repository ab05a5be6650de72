//! Service layer for the memory engine.
//!
//! Contains the business logic around the persisted corpus:
//! - EntityStore (atomic per-entity persistence with advisory locking)
//! - MergeEngine (dedup / supersede / create over candidate batches)
//! - Decay (pure Hot/Warm/Cold tiering)
//! - Summary (deterministic regeneration of the per-entity view)
//! - AccessTracker (touch metadata plus the access-log cache)
//! - DailyNotes (timeline entries from checkpoint runs)
//! - Runner (checkpoint/decay orchestration and the touch/view surface)

pub mod access;
pub mod decay;
pub mod merge;
pub mod notes;
pub mod runner;
pub mod slug;
pub mod store;
pub mod summary;

pub use access::AccessTracker;
pub use merge::{MatchRules, MergeEngine, MergeReport, NormalizedExactMatch};
pub use notes::DailyNotes;
pub use runner::{DecayReport, EntityView, Runner};
pub use store::{EntityLock, EntityStore};
