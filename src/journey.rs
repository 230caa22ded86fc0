//! Journey tracker — single-active-journey invariant and milestone
//! timestamps.
//!
//! A journey goes `None → Active → Inactive`, one way. Exactly one
//! active row per patient; a new active row only appears through
//! [`start_journey`], which deactivates every predecessor in the same
//! transaction.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::models::{Journey, Milestone};

/// Outcome of [`end_journey`]. A missing active journey is signalled,
/// not thrown — several legitimate call paths (end-time, discharge,
/// void) may race to end the same journey, and each decides for itself
/// whether that is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JourneyEnd {
    Ended,
    NoActiveJourney,
}

/// Start a fresh active journey, deactivating any prior ones first.
///
/// Must run inside the same transaction as the patient row's
/// creation or re-registration.
pub fn start_journey(
    conn: &Connection,
    patient_id: &Uuid,
    now: NaiveDateTime,
) -> Result<Journey, DatabaseError> {
    let stray = repository::deactivate_journeys(conn, patient_id)?;
    if stray > 0 {
        tracing::debug!(%patient_id, stray, "deactivated prior journeys");
    }

    let journey = Journey {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        is_active: true,
        started_at: now,
        first_call_time: None,
        vitals_time: None,
        assign_dept_time: None,
        second_call_time: None,
        begin_time: None,
        end_time: None,
    };
    repository::insert_journey(conn, &journey)?;
    Ok(journey)
}

/// Stamp a milestone on the active journey. No-op when none exists:
/// the journey record is best-effort history, not authoritative state.
/// Returns whether a journey was stamped.
pub fn record_milestone(
    conn: &Connection,
    patient_id: &Uuid,
    milestone: Milestone,
    at: NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let stamped = repository::set_active_milestone(conn, patient_id, milestone, &at)?;
    if stamped == 0 {
        tracing::debug!(%patient_id, ?milestone, "no active journey; milestone skipped");
    }
    Ok(stamped > 0)
}

/// End the active journey: stamp `end_time`, flip inactive. Idempotent —
/// a second call finds nothing active and reports [`JourneyEnd::NoActiveJourney`].
pub fn end_journey(
    conn: &Connection,
    patient_id: &Uuid,
    end_time: NaiveDateTime,
) -> Result<JourneyEnd, DatabaseError> {
    let closed = repository::close_active_journey(conn, patient_id, &end_time)?;
    if closed == 0 {
        return Ok(JourneyEnd::NoActiveJourney);
    }
    Ok(JourneyEnd::Ended)
}
