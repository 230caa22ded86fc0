//! Repository layer — entity-scoped database operations.
//!
//! Free functions over an explicit `&Connection`; `rusqlite`
//! transactions deref to `Connection`, so every function here can run
//! standalone or inside a caller-owned transaction.

mod bed;
mod department;
mod journey;
mod patient;
mod vital_sign;

use chrono::NaiveDateTime;

pub use bed::*;
pub use department::*;
pub use journey::*;
pub use patient::*;
pub use vital_sign::*;

pub(crate) const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn ts(dt: &NaiveDateTime) -> String {
    dt.format(TS_FORMAT).to_string()
}

pub(crate) fn opt_ts(dt: &Option<NaiveDateTime>) -> Option<String> {
    dt.as_ref().map(ts)
}

pub(crate) fn parse_ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).unwrap_or_default()
}

pub(crate) fn parse_opt_ts(s: Option<String>) -> Option<NaiveDateTime> {
    s.as_deref().map(parse_ts)
}

pub(crate) fn parse_uuid(s: &str, idx: usize) -> Result<uuid::Uuid, rusqlite::Error> {
    uuid::Uuid::parse_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
