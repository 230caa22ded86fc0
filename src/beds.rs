//! Bed ledger — couples bed occupancy to patient occupancy.
//!
//! A bed is Occupied exactly when one patient references it via
//! `bed_id`. Both sides of that invariant flip here, inside the
//! caller's transaction, never independently.

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository;
use crate::intake::IntakeError;
use crate::models::BedStatus;

/// Occupy a bed for a patient. Fails when the bed is occupied or under
/// maintenance; both are surfaced as [`IntakeError::BedOccupied`] since
/// neither is acquirable.
pub fn acquire(conn: &Connection, bed_id: &Uuid, patient_id: &Uuid) -> Result<(), IntakeError> {
    let bed = repository::get_bed(conn, bed_id)?.ok_or(IntakeError::NotFound {
        entity: "bed",
        id: bed_id.to_string(),
    })?;

    if bed.status != BedStatus::Available {
        return Err(IntakeError::BedOccupied {
            bed_number: bed.bed_number,
        });
    }

    repository::set_bed_status(conn, bed_id, BedStatus::Occupied)?;
    repository::set_patient_bed(conn, patient_id, Some(bed_id))?;

    tracing::info!(%bed_id, %patient_id, "bed acquired");
    Ok(())
}

/// Free a bed and detach whichever patient holds it. Called exactly
/// once per terminal transition that holds a bed, inside that
/// transition's transaction.
pub fn release(conn: &Connection, bed_id: &Uuid) -> Result<(), IntakeError> {
    if repository::get_bed(conn, bed_id)?.is_none() {
        return Err(IntakeError::NotFound {
            entity: "bed",
            id: bed_id.to_string(),
        });
    }

    repository::set_bed_status(conn, bed_id, BedStatus::Available)?;
    let detached = repository::clear_bed_reference(conn, bed_id)?;

    tracing::info!(%bed_id, detached, "bed released");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{get_bed, get_patient, insert_bed, insert_patient};
    use crate::db::sqlite::open_memory_database;
    use crate::models::{Bed, Patient, PatientState};
    use chrono::NaiveDateTime;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn seed_patient(conn: &Connection, n: u32) -> Uuid {
        let id = Uuid::new_v4();
        insert_patient(
            conn,
            &Patient {
                id,
                name: format!("P{n}"),
                gender: None,
                age: None,
                mobile_number: format!("m{n}"),
                id_number: format!("i{n}"),
                mrn: format!("MRN{n}"),
                chief_complaint: None,
                state: PatientState::Waiting,
                call_flag: false,
                ticket_number: i64::from(n),
                ticket_string: format!("ER{n}"),
                department_id: None,
                bed_id: None,
                registered_at: dt("2026-08-27 09:00:00"),
                begin_time: None,
                end_time: None,
                remarks: None,
                ticket_artifact: None,
            },
        )
        .unwrap();
        id
    }

    fn seed_bed(conn: &Connection, number: &str, status: BedStatus) -> Uuid {
        let id = Uuid::new_v4();
        insert_bed(
            conn,
            &Bed {
                id,
                bed_number: number.into(),
                status,
            },
        )
        .unwrap();
        id
    }

    #[test]
    fn acquire_flips_both_sides() {
        let conn = open_memory_database().unwrap();
        let pid = seed_patient(&conn, 1);
        let bed_id = seed_bed(&conn, "ER-01", BedStatus::Available);

        acquire(&conn, &bed_id, &pid).unwrap();

        assert_eq!(
            get_bed(&conn, &bed_id).unwrap().unwrap().status,
            BedStatus::Occupied
        );
        assert_eq!(get_patient(&conn, &pid).unwrap().unwrap().bed_id, Some(bed_id));
    }

    #[test]
    fn acquire_occupied_bed_fails() {
        let conn = open_memory_database().unwrap();
        let p1 = seed_patient(&conn, 1);
        let p2 = seed_patient(&conn, 2);
        let bed_id = seed_bed(&conn, "ER-01", BedStatus::Available);

        acquire(&conn, &bed_id, &p1).unwrap();
        let result = acquire(&conn, &bed_id, &p2);
        assert!(matches!(result, Err(IntakeError::BedOccupied { .. })));

        // First occupant untouched.
        assert_eq!(get_patient(&conn, &p1).unwrap().unwrap().bed_id, Some(bed_id));
        assert!(get_patient(&conn, &p2).unwrap().unwrap().bed_id.is_none());
    }

    #[test]
    fn maintenance_bed_is_not_acquirable() {
        let conn = open_memory_database().unwrap();
        let pid = seed_patient(&conn, 1);
        let bed_id = seed_bed(&conn, "ER-01", BedStatus::Maintenance);

        let result = acquire(&conn, &bed_id, &pid);
        assert!(matches!(result, Err(IntakeError::BedOccupied { .. })));
    }

    #[test]
    fn acquire_missing_bed_is_not_found() {
        let conn = open_memory_database().unwrap();
        let pid = seed_patient(&conn, 1);

        let result = acquire(&conn, &Uuid::new_v4(), &pid);
        assert!(matches!(result, Err(IntakeError::NotFound { entity: "bed", .. })));
    }

    #[test]
    fn release_frees_bed_and_detaches_patient() {
        let conn = open_memory_database().unwrap();
        let pid = seed_patient(&conn, 1);
        let bed_id = seed_bed(&conn, "ER-01", BedStatus::Available);
        acquire(&conn, &bed_id, &pid).unwrap();

        release(&conn, &bed_id).unwrap();

        assert_eq!(
            get_bed(&conn, &bed_id).unwrap().unwrap().status,
            BedStatus::Available
        );
        assert!(get_patient(&conn, &pid).unwrap().unwrap().bed_id.is_none());
    }

    #[test]
    fn release_missing_bed_is_not_found() {
        let conn = open_memory_database().unwrap();
        let result = release(&conn, &Uuid::new_v4());
        assert!(matches!(result, Err(IntakeError::NotFound { entity: "bed", .. })));
    }
}
