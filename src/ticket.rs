//! Sequence allocator — per-day ticket numbers.
//!
//! Computes a candidate optimistically (count-then-recheck) instead of
//! locking a counter row. True uniqueness is enforced by the unique
//! index on `(registration_day, ticket_number)`; the registration
//! transaction retries on conflict.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::{repository, DatabaseError};

/// An allocated ticket: the sequence number plus the human-facing
/// string (`<department code><number>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub number: i64,
    pub formatted: String,
}

/// Produce the next ticket number for the calendar day of `now`.
///
/// Counts every patient registered today regardless of state (voided
/// patients keep their slot), then bumps past the day's maximum issued
/// number. The second check defends against counter drift from
/// void/re-register cycles, where issued numbers can exceed the row
/// count. Read-only; must run inside the caller's registration
/// transaction or the candidate can race.
pub fn next_ticket(
    conn: &Connection,
    department_code: &str,
    now: NaiveDateTime,
) -> Result<Ticket, DatabaseError> {
    let day = now.date();

    let count = repository::count_patients_on(conn, day)?;
    let mut candidate = count + 1;

    if let Some(max) = repository::max_ticket_on(conn, day)? {
        if max >= candidate {
            candidate = max + 1;
        }
    }

    tracing::debug!(day = %day, candidate, "allocated ticket candidate");

    Ok(Ticket {
        number: candidate,
        formatted: format!("{department_code}{candidate}"),
    })
}
