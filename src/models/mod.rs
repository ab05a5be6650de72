//! Data models for the memory engine.
//!
//! Defines the core types used throughout the system: entities, facts and
//! checkpoint batch records, plus the serde glue that pins the on-disk
//! JSON format (`facts.json` per entity).

mod batch;
mod entity;
mod fact;

pub use batch::*;
pub use entity::*;
pub use fact::*;

pub(crate) use fact::lenient_date;

use chrono::{DateTime, NaiveDate, Utc};

/// Current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Today's calendar date in UTC
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
