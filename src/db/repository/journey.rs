use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{opt_ts, parse_opt_ts, parse_ts, parse_uuid, ts};
use crate::db::DatabaseError;
use crate::models::{Journey, Milestone};

const JOURNEY_COLUMNS: &str = "id, patient_id, is_active, started_at, first_call_time, \
     vitals_time, assign_dept_time, second_call_time, begin_time, end_time";

pub fn insert_journey(conn: &Connection, j: &Journey) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO journeys (id, patient_id, is_active, started_at, first_call_time,
                               vitals_time, assign_dept_time, second_call_time, begin_time, end_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            j.id.to_string(),
            j.patient_id.to_string(),
            j.is_active,
            ts(&j.started_at),
            opt_ts(&j.first_call_time),
            opt_ts(&j.vitals_time),
            opt_ts(&j.assign_dept_time),
            opt_ts(&j.second_call_time),
            opt_ts(&j.begin_time),
            opt_ts(&j.end_time),
        ],
    )?;
    Ok(())
}

/// Get the single active journey for a patient, if one exists.
pub fn get_active_journey(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Option<Journey>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {JOURNEY_COLUMNS} FROM journeys
         WHERE patient_id = ?1 AND is_active = 1"
    ))?;
    let mut rows = stmt.query_map(params![patient_id.to_string()], row_to_journey)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// Full episode history for a patient, oldest first. Audit query —
/// inactive rows are never deleted.
pub fn get_journeys_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Journey>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {JOURNEY_COLUMNS} FROM journeys
         WHERE patient_id = ?1
         ORDER BY started_at ASC"
    ))?;
    let rows = stmt.query_map(params![patient_id.to_string()], row_to_journey)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Deactivate every journey the patient has. Returns rows touched.
pub fn deactivate_journeys(conn: &Connection, patient_id: &Uuid) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "UPDATE journeys SET is_active = 0 WHERE patient_id = ?1 AND is_active = 1",
        params![patient_id.to_string()],
    )?;
    Ok(affected)
}

/// Stamp a milestone on the patient's active journey. Returns 0 when no
/// active journey exists — milestones are best-effort history.
pub fn set_active_milestone(
    conn: &Connection,
    patient_id: &Uuid,
    milestone: Milestone,
    at: &NaiveDateTime,
) -> Result<usize, DatabaseError> {
    // Column names come from the Milestone enum, never from callers.
    let affected = conn.execute(
        &format!(
            "UPDATE journeys SET {} = ?2 WHERE patient_id = ?1 AND is_active = 1",
            milestone.column()
        ),
        params![patient_id.to_string(), ts(at)],
    )?;
    Ok(affected)
}

/// Close the active journey: stamp `end_time` and flip it inactive in
/// one statement. Returns 0 when no active journey exists, so callers
/// can distinguish the already-ended case.
pub fn close_active_journey(
    conn: &Connection,
    patient_id: &Uuid,
    end_time: &NaiveDateTime,
) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "UPDATE journeys SET end_time = ?2, is_active = 0
         WHERE patient_id = ?1 AND is_active = 1",
        params![patient_id.to_string(), ts(end_time)],
    )?;
    Ok(affected)
}

fn row_to_journey(row: &rusqlite::Row) -> Result<Journey, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let patient_str: String = row.get(1)?;
    let started_str: String = row.get(3)?;

    Ok(Journey {
        id: parse_uuid(&id_str, 0)?,
        patient_id: parse_uuid(&patient_str, 1)?,
        is_active: row.get(2)?,
        started_at: parse_ts(&started_str),
        first_call_time: parse_opt_ts(row.get(4)?),
        vitals_time: parse_opt_ts(row.get(5)?),
        assign_dept_time: parse_opt_ts(row.get(6)?),
        second_call_time: parse_opt_ts(row.get(7)?),
        begin_time: parse_opt_ts(row.get(8)?),
        end_time: parse_opt_ts(row.get(9)?),
    })
}
