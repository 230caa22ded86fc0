use rusqlite::{params, Connection};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::Department;

pub fn insert_department(conn: &Connection, dept: &Department) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO departments (id, code, name, is_intake) VALUES (?1, ?2, ?3, ?4)",
        params![dept.id.to_string(), dept.code, dept.name, dept.is_intake],
    )?;
    Ok(())
}

pub fn get_department(conn: &Connection, id: &Uuid) -> Result<Option<Department>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT id, code, name, is_intake FROM departments WHERE id = ?1")?;
    let mut rows = stmt.query_map(params![id.to_string()], row_to_department)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn get_department_by_code(
    conn: &Connection,
    code: &str,
) -> Result<Option<Department>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT id, code, name, is_intake FROM departments WHERE code = ?1")?;
    let mut rows = stmt.query_map(params![code], row_to_department)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// The default intake department assigned at registration.
pub fn get_intake_department(conn: &Connection) -> Result<Option<Department>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, code, name, is_intake FROM departments WHERE is_intake = 1 LIMIT 1",
    )?;
    let mut rows = stmt.query_map([], row_to_department)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

fn row_to_department(row: &rusqlite::Row) -> Result<Department, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    Ok(Department {
        id: parse_uuid(&id_str, 0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        is_intake: row.get(3)?,
    })
}
