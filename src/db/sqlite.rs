use std::path::Path;

use rusqlite::Connection;
use tracing;

use super::DatabaseError;
use crate::config;

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    // busy_timeout bounds how long a worker blocks on a locked database
    // before the operation surfaces as retryable.
    conn.execute_batch(&format!(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;
         PRAGMA busy_timeout={};",
        config::BUSY_TIMEOUT_MS
    ))?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![
        (1, include_str!("../../resources/migrations/001_initial.sql")),
    ];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get::<_, i64>(0),
    )
    .unwrap_or(0)
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_initializes_all_tables() {
        let conn = open_memory_database().unwrap();
        // departments + beds + patients + journeys + vital_signs + schema_version = 6
        let count = count_tables(&conn).unwrap();
        assert_eq!(count, 6, "Expected 6 tables, got {count}");
    }

    #[test]
    fn schema_version_is_current() {
        let conn = open_memory_database().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database().unwrap();
        // Run migrations again — should not error
        let result = run_migrations(&conn);
        assert!(result.is_ok());
    }

    #[test]
    fn foreign_keys_enabled() {
        let conn = open_memory_database().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn busy_timeout_configured() {
        let conn = open_memory_database().unwrap();
        let timeout: i64 = conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, i64::from(config::BUSY_TIMEOUT_MS));
    }

    #[test]
    fn database_opens_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intake.db");
        let conn = open_database(&path).unwrap();
        assert_eq!(count_tables(&conn).unwrap(), 6);

        // Re-open — should be idempotent
        let conn2 = open_database(&path).unwrap();
        assert_eq!(count_tables(&conn2).unwrap(), 6);
    }

    #[test]
    fn day_ticket_uniqueness_enforced() {
        let conn = open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO patients (id, name, mobile_number, id_number, mrn,
                                   ticket_number, ticket_string, registered_at, registration_day)
             VALUES ('p1', 'A', '1', '1', 'MRN1', 1, 'ER1', '2026-08-27 09:00:00', '2026-08-27')",
            [],
        )
        .unwrap();

        // Same day, same ticket number — must be rejected by the index.
        let dup = conn.execute(
            "INSERT INTO patients (id, name, mobile_number, id_number, mrn,
                                   ticket_number, ticket_string, registered_at, registration_day)
             VALUES ('p2', 'B', '2', '2', 'MRN2', 1, 'ER1', '2026-08-27 09:01:00', '2026-08-27')",
            [],
        );
        assert!(dup.is_err());

        // Same identifying triple twice — rejected by the identity index.
        let dup_identity = conn.execute(
            "INSERT INTO patients (id, name, mobile_number, id_number, mrn,
                                   ticket_number, ticket_string, registered_at, registration_day)
             VALUES ('p4', 'A', '1', '1', 'MRN1', 2, 'ER2', '2026-08-27 09:02:00', '2026-08-27')",
            [],
        );
        assert!(dup_identity.is_err());

        // Different day, same number is fine.
        let next_day = conn.execute(
            "INSERT INTO patients (id, name, mobile_number, id_number, mrn,
                                   ticket_number, ticket_string, registered_at, registration_day)
             VALUES ('p3', 'C', '3', '3', 'MRN3', 1, 'ER1', '2026-08-28 09:00:00', '2026-08-28')",
            [],
        );
        assert!(next_day.is_ok());
    }

    #[test]
    fn single_active_journey_enforced() {
        let conn = open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO patients (id, name, mobile_number, id_number, mrn,
                                   ticket_number, ticket_string, registered_at, registration_day)
             VALUES ('p1', 'A', '1', '1', 'MRN1', 1, 'ER1', '2026-08-27 09:00:00', '2026-08-27')",
            [],
        )
        .unwrap();

        conn.execute(
            "INSERT INTO journeys (id, patient_id, is_active, started_at)
             VALUES ('j1', 'p1', 1, '2026-08-27 09:00:00')",
            [],
        )
        .unwrap();

        let second_active = conn.execute(
            "INSERT INTO journeys (id, patient_id, is_active, started_at)
             VALUES ('j2', 'p1', 1, '2026-08-27 10:00:00')",
            [],
        );
        assert!(second_active.is_err());

        // Inactive rows accumulate freely (audit history).
        let inactive = conn.execute(
            "INSERT INTO journeys (id, patient_id, is_active, started_at)
             VALUES ('j3', 'p1', 0, '2026-08-27 10:00:00')",
            [],
        );
        assert!(inactive.is_ok());
    }

    #[test]
    fn bed_status_check_constraint() {
        let conn = open_memory_database().unwrap();
        let ok = conn.execute(
            "INSERT INTO beds (id, bed_number, status) VALUES ('b1', 'ER-01', 'available')",
            [],
        );
        assert!(ok.is_ok());

        let bad = conn.execute(
            "INSERT INTO beds (id, bed_number, status) VALUES ('b2', 'ER-02', 'broken')",
            [],
        );
        assert!(bad.is_err());
    }
}
