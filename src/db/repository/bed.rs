use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::{Bed, BedStatus};

pub fn insert_bed(conn: &Connection, bed: &Bed) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO beds (id, bed_number, status) VALUES (?1, ?2, ?3)",
        params![bed.id.to_string(), bed.bed_number, bed.status.as_str()],
    )?;
    Ok(())
}

pub fn get_bed(conn: &Connection, id: &Uuid) -> Result<Option<Bed>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id, bed_number, status FROM beds WHERE id = ?1")?;
    let mut rows = stmt.query_map(params![id.to_string()], row_to_bed)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn get_bed_by_number(conn: &Connection, bed_number: &str) -> Result<Option<Bed>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id, bed_number, status FROM beds WHERE bed_number = ?1")?;
    let mut rows = stmt.query_map(params![bed_number], row_to_bed)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// Flip a bed's occupancy status. Only the bed ledger should call this.
pub fn set_bed_status(conn: &Connection, id: &Uuid, status: BedStatus) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE beds SET status = ?2 WHERE id = ?1",
        params![id.to_string(), status.as_str()],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "bed".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn row_to_bed(row: &rusqlite::Row) -> Result<Bed, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let status_str: String = row.get(2)?;

    Ok(Bed {
        id: parse_uuid(&id_str, 0)?,
        bed_number: row.get(1)?,
        status: BedStatus::from_str(&status_str).unwrap_or(BedStatus::Maintenance),
    })
}
