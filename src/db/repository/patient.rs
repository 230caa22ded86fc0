use chrono::NaiveDate;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{opt_ts, parse_opt_ts, parse_ts, parse_uuid, ts};
use crate::db::DatabaseError;
use crate::models::{Patient, PatientState};

const PATIENT_COLUMNS: &str = "id, name, gender, age, mobile_number, id_number, mrn, \
     chief_complaint, state, call_flag, ticket_number, ticket_string, department_id, \
     bed_id, registered_at, registration_day, begin_time, end_time, remarks, ticket_artifact";

/// Insert a patient row. `registration_day` is derived from
/// `registered_at` so the per-day ticket uniqueness index always sees
/// the same calendar-day scope the allocator counted in.
pub fn insert_patient(conn: &Connection, p: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, name, gender, age, mobile_number, id_number, mrn,
                               chief_complaint, state, call_flag, ticket_number, ticket_string,
                               department_id, bed_id, registered_at, registration_day,
                               begin_time, end_time, remarks, ticket_artifact)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
        params![
            p.id.to_string(),
            p.name,
            p.gender,
            p.age,
            p.mobile_number,
            p.id_number,
            p.mrn,
            p.chief_complaint,
            p.state.as_i64(),
            p.call_flag,
            p.ticket_number,
            p.ticket_string,
            p.department_id.map(|id| id.to_string()),
            p.bed_id.map(|id| id.to_string()),
            ts(&p.registered_at),
            p.registered_at.date().format("%Y-%m-%d").to_string(),
            opt_ts(&p.begin_time),
            opt_ts(&p.end_time),
            p.remarks,
            p.ticket_artifact,
        ],
    )?;
    Ok(())
}

/// Rewrite a patient row in full.
pub fn update_patient(conn: &Connection, p: &Patient) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE patients
         SET name = ?2, gender = ?3, age = ?4, mobile_number = ?5, id_number = ?6, mrn = ?7,
             chief_complaint = ?8, state = ?9, call_flag = ?10, ticket_number = ?11,
             ticket_string = ?12, department_id = ?13, bed_id = ?14, registered_at = ?15,
             registration_day = ?16, begin_time = ?17, end_time = ?18, remarks = ?19,
             ticket_artifact = ?20
         WHERE id = ?1",
        params![
            p.id.to_string(),
            p.name,
            p.gender,
            p.age,
            p.mobile_number,
            p.id_number,
            p.mrn,
            p.chief_complaint,
            p.state.as_i64(),
            p.call_flag,
            p.ticket_number,
            p.ticket_string,
            p.department_id.map(|id| id.to_string()),
            p.bed_id.map(|id| id.to_string()),
            ts(&p.registered_at),
            p.registered_at.date().format("%Y-%m-%d").to_string(),
            opt_ts(&p.begin_time),
            opt_ts(&p.end_time),
            p.remarks,
            p.ticket_artifact,
        ],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "patient".into(),
            id: p.id.to_string(),
        });
    }
    Ok(())
}

/// Get a patient by ID.
pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"
    ))?;
    let mut rows = stmt.query_map(params![id.to_string()], row_to_patient)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// Find a patient by the identifying triple used for the registration
/// idempotency contract. The unique identity index guarantees at most
/// one row per triple.
pub fn find_patient_by_identity(
    conn: &Connection,
    mobile_number: &str,
    id_number: &str,
    mrn: &str,
) -> Result<Option<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients
         WHERE mobile_number = ?1 AND id_number = ?2 AND mrn = ?3
         LIMIT 1"
    ))?;
    let mut rows = stmt.query_map(params![mobile_number, id_number, mrn], row_to_patient)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// Count patients registered on the given calendar day, in any state.
pub fn count_patients_on(conn: &Connection, day: NaiveDate) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM patients WHERE registration_day = ?1",
        params![day.format("%Y-%m-%d").to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Highest ticket number issued on the given calendar day, if any.
pub fn max_ticket_on(conn: &Connection, day: NaiveDate) -> Result<Option<i64>, DatabaseError> {
    let max = conn.query_row(
        "SELECT MAX(ticket_number) FROM patients WHERE registration_day = ?1",
        params![day.format("%Y-%m-%d").to_string()],
        |row| row.get(0),
    )?;
    Ok(max)
}

/// Point a patient at a bed (or detach with `None`).
pub fn set_patient_bed(
    conn: &Connection,
    patient_id: &Uuid,
    bed_id: Option<&Uuid>,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE patients SET bed_id = ?2 WHERE id = ?1",
        params![patient_id.to_string(), bed_id.map(|id| id.to_string())],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "patient".into(),
            id: patient_id.to_string(),
        });
    }
    Ok(())
}

/// Detach whichever patient currently references the bed. Returns the
/// number of rows touched (0 when the bed was not referenced).
pub fn clear_bed_reference(conn: &Connection, bed_id: &Uuid) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "UPDATE patients SET bed_id = NULL WHERE bed_id = ?1",
        params![bed_id.to_string()],
    )?;
    Ok(affected)
}

/// Store the externally rendered ticket artifact reference.
pub fn set_ticket_artifact(
    conn: &Connection,
    patient_id: &Uuid,
    reference: &str,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE patients SET ticket_artifact = ?2 WHERE id = ?1",
        params![patient_id.to_string(), reference],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "patient".into(),
            id: patient_id.to_string(),
        });
    }
    Ok(())
}

fn row_to_patient(row: &rusqlite::Row) -> Result<Patient, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let state_code: i64 = row.get(8)?;
    let dept_str: Option<String> = row.get(12)?;
    let bed_str: Option<String> = row.get(13)?;
    let registered_str: String = row.get(14)?;

    Ok(Patient {
        id: parse_uuid(&id_str, 0)?,
        name: row.get(1)?,
        gender: row.get(2)?,
        age: row.get(3)?,
        mobile_number: row.get(4)?,
        id_number: row.get(5)?,
        mrn: row.get(6)?,
        chief_complaint: row.get(7)?,
        state: PatientState::from_i64(state_code).map_err(|_| {
            rusqlite::Error::IntegralValueOutOfRange(8, state_code)
        })?,
        call_flag: row.get(9)?,
        ticket_number: row.get(10)?,
        ticket_string: row.get(11)?,
        department_id: dept_str.as_deref().map(|s| parse_uuid(s, 12)).transpose()?,
        bed_id: bed_str.as_deref().map(|s| parse_uuid(s, 13)).transpose()?,
        registered_at: parse_ts(&registered_str),
        begin_time: parse_opt_ts(row.get(16)?),
        end_time: parse_opt_ts(row.get(17)?),
        remarks: row.get(18)?,
        ticket_artifact: row.get(19)?,
    })
}
