use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{parse_ts, parse_uuid, ts};
use crate::db::DatabaseError;
use crate::models::VitalSign;

pub fn insert_vital_sign(conn: &Connection, vs: &VitalSign) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO vital_signs (id, patient_id, is_active, temperature, pulse,
                                  respiratory_rate, systolic, diastolic, spo2, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            vs.id.to_string(),
            vs.patient_id.to_string(),
            vs.is_active,
            vs.temperature,
            vs.pulse,
            vs.respiratory_rate,
            vs.systolic,
            vs.diastolic,
            vs.spo2,
            ts(&vs.recorded_at),
        ],
    )?;
    Ok(())
}

/// The patient's current active vital record, if triage has happened
/// this episode. Gates department assignment.
pub fn get_active_vital_sign(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Option<VitalSign>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, is_active, temperature, pulse, respiratory_rate,
                systolic, diastolic, spo2, recorded_at
         FROM vital_signs
         WHERE patient_id = ?1 AND is_active = 1
         ORDER BY recorded_at DESC
         LIMIT 1",
    )?;
    let mut rows = stmt.query_map(params![patient_id.to_string()], row_to_vital_sign)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// Deactivate all vital records for a patient (new measurement or
/// re-registration). Returns rows touched.
pub fn deactivate_vital_signs(conn: &Connection, patient_id: &Uuid) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "UPDATE vital_signs SET is_active = 0 WHERE patient_id = ?1 AND is_active = 1",
        params![patient_id.to_string()],
    )?;
    Ok(affected)
}

fn row_to_vital_sign(row: &rusqlite::Row) -> Result<VitalSign, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let patient_str: String = row.get(1)?;
    let recorded_str: String = row.get(9)?;

    Ok(VitalSign {
        id: parse_uuid(&id_str, 0)?,
        patient_id: parse_uuid(&patient_str, 1)?,
        is_active: row.get(2)?,
        temperature: row.get(3)?,
        pulse: row.get(4)?,
        respiratory_rate: row.get(5)?,
        systolic: row.get(6)?,
        diastolic: row.get(7)?,
        spo2: row.get(8)?,
        recorded_at: parse_ts(&recorded_str),
    })
}
