//! Intake orchestrator — patient lifecycle state machine.
//!
//! Composes the ticket allocator, journey tracker, and bed ledger into
//! the top-level intake operations: register, re-register, triage
//! vitals, department/bed assignment, treatment, and the three
//! terminate paths (end-time, discharge, void). Every multi-entity
//! write runs in one IMMEDIATE transaction; registration retries a
//! bounded number of times when it loses the ticket-allocation race.
//!
//! Lifecycle: `Waiting(0) → Serving(1) → Served(2)`, with `Voided(3)`
//! as a parallel terminal reachable from Waiting or Serving. Terminal
//! states admit no transition except re-registration.

use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use rand::Rng;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::beds;
use crate::config;
use crate::db::{repository, DatabaseError};
use crate::journey::{self, JourneyEnd};
use crate::models::{CallStage, Milestone, Patient, PatientState, VitalSign};
use crate::notify::{CallEvent, CallNotifier};
use crate::ticket;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("an open episode already exists for this patient")]
    DuplicatePendingJourney,

    #[error("the patient's active journey has not been ended")]
    ActiveJourneyNotEnded,

    #[error("department assignment requires a recorded vital sign")]
    NoVitalSigns,

    #[error("bed {bed_number} is not available")]
    BedOccupied { bed_number: String },

    #[error("treatment requires an assigned bed")]
    NoBedAssigned,

    #[error("patient is in a terminal state")]
    TerminalState,

    #[error("state precondition violated: {0}")]
    InvariantViolation(&'static str),

    #[error("registration conflicted {0} times; try again")]
    RetriesExhausted(u32),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for IntakeError {
    fn from(e: rusqlite::Error) -> Self {
        IntakeError::Database(DatabaseError::Sqlite(e))
    }
}

/// Demographic and complaint fields supplied at (re-)registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub gender: Option<String>,
    pub age: Option<i64>,
    pub mobile_number: String,
    pub id_number: String,
    pub mrn: String,
    pub chief_complaint: Option<String>,
}

/// Triage measurements. All fields optional, but at least one must be
/// present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VitalsInput {
    pub temperature: Option<f64>,
    pub pulse: Option<f64>,
    pub respiratory_rate: Option<f64>,
    pub systolic: Option<f64>,
    pub diastolic: Option<f64>,
    pub spo2: Option<f64>,
    pub recorded_at: Option<NaiveDateTime>,
}

// ─── Registration ─────────────────────────────────────────────────────────────

/// Register a walk-in patient: allocate a ticket, create the patient
/// row in Waiting, start an active journey, and assign the default
/// intake department — all in one transaction.
///
/// Identity is the (mobile, id number, MRN) triple. A match with an
/// open episode fails with `DuplicatePendingJourney`; a match with a
/// closed episode reuses the row (new ticket, new journey) so no
/// duplicate patient row is ever created. The lookup runs inside the
/// write transaction: concurrent registrations of one identity
/// serialize on the store, and the unique identity index backstops the
/// losing side.
pub fn register(conn: &Connection, req: &RegisterRequest) -> Result<Patient, IntakeError> {
    validate_request(req)?;

    let patient = with_registration_retry(conn, "register", |tx| {
        match repository::find_patient_by_identity(
            tx,
            &req.mobile_number,
            &req.id_number,
            &req.mrn,
        )? {
            Some(existing) if !existing.state.is_terminal() => {
                Err(IntakeError::DuplicatePendingJourney)
            }
            Some(existing) => {
                tracing::info!(patient_id = %existing.id, "known identity; reusing patient row");
                allocate_and_start(tx, Some(&existing), req)
            }
            None => allocate_and_start(tx, None, req),
        }
    })?;
    tracing::info!(patient_id = %patient.id, ticket = %patient.ticket_string, "patient registered");
    Ok(patient)
}

/// Re-register a returning patient for a new episode. Rejected while
/// the current journey is still open. Reuses the patient row: new
/// ticket, new journey, bed/times/vitals reset, department back to
/// intake default. Prior journeys and vitals stay as audit history.
pub fn re_register(
    conn: &Connection,
    patient_id: &Uuid,
    req: &RegisterRequest,
) -> Result<Patient, IntakeError> {
    validate_request(req)?;
    let existing = load_patient(conn, patient_id)?;

    if repository::get_active_journey(conn, patient_id)?.is_some() {
        return Err(IntakeError::ActiveJourneyNotEnded);
    }

    let patient = with_registration_retry(conn, "re-register", |tx| {
        allocate_and_start(tx, Some(&existing), req)
    })?;
    tracing::info!(patient_id = %patient.id, ticket = %patient.ticket_string, "patient re-registered");
    Ok(patient)
}

/// The one allocate-and-start primitive shared by register and
/// re-register: ticket allocation, patient row write, and journey
/// start, all against the same transaction.
fn allocate_and_start(
    tx: &Transaction<'_>,
    existing: Option<&Patient>,
    req: &RegisterRequest,
) -> Result<Patient, IntakeError> {
    let now = now();
    let dept = repository::get_intake_department(tx)?.ok_or(IntakeError::NotFound {
        entity: "intake department",
        id: "default".into(),
    })?;

    let ticket = ticket::next_ticket(tx, &dept.code, now)?;

    let patient = Patient {
        id: existing.map_or_else(Uuid::new_v4, |p| p.id),
        name: req.name.clone(),
        gender: req.gender.clone(),
        age: req.age,
        mobile_number: req.mobile_number.clone(),
        id_number: req.id_number.clone(),
        mrn: req.mrn.clone(),
        chief_complaint: req.chief_complaint.clone(),
        state: PatientState::Waiting,
        call_flag: false,
        ticket_number: ticket.number,
        ticket_string: ticket.formatted,
        department_id: Some(dept.id),
        bed_id: None,
        registered_at: now,
        begin_time: None,
        end_time: None,
        remarks: None,
        ticket_artifact: None,
    };

    match existing {
        Some(prev) => {
            // A closed episode should never still hold a bed, but if one
            // is referenced the ledger must be the one to free it.
            if let Some(bed_id) = prev.bed_id {
                beds::release(tx, &bed_id)?;
            }
            repository::deactivate_vital_signs(tx, &prev.id)?;
            repository::update_patient(tx, &patient)?;
        }
        None => repository::insert_patient(tx, &patient)?,
    }

    journey::start_journey(tx, &patient.id, now)?;
    Ok(patient)
}

// ─── Triage and assignment ────────────────────────────────────────────────────

/// Record triage vitals: deactivates any prior measurement, inserts the
/// new active one, and stamps the vitals milestone. No state change;
/// this gates department assignment.
pub fn record_vitals(
    conn: &Connection,
    patient_id: &Uuid,
    input: &VitalsInput,
) -> Result<Patient, IntakeError> {
    if [
        input.temperature,
        input.pulse,
        input.respiratory_rate,
        input.systolic,
        input.diastolic,
        input.spo2,
    ]
    .iter()
    .all(Option::is_none)
    {
        return Err(IntakeError::Validation(
            "at least one vital measurement is required".into(),
        ));
    }

    let tx = immediate_tx(conn)?;
    let patient = load_patient(&tx, patient_id)?;
    if patient.state.is_terminal() {
        return Err(IntakeError::TerminalState);
    }

    let at = input.recorded_at.unwrap_or_else(now);
    repository::deactivate_vital_signs(&tx, patient_id)?;
    repository::insert_vital_sign(
        &tx,
        &VitalSign {
            id: Uuid::new_v4(),
            patient_id: *patient_id,
            is_active: true,
            temperature: input.temperature,
            pulse: input.pulse,
            respiratory_rate: input.respiratory_rate,
            systolic: input.systolic,
            diastolic: input.diastolic,
            spo2: input.spo2,
            recorded_at: at,
        },
    )?;
    journey::record_milestone(&tx, patient_id, Milestone::Vitals, at)?;
    tx.commit().map_err(IntakeError::from)?;

    tracing::info!(%patient_id, "vitals recorded");
    Ok(patient)
}

/// Assign the patient to a department. Requires a recorded vital sign
/// for this episode and an existing target department.
pub fn assign_department(
    conn: &Connection,
    patient_id: &Uuid,
    department_id: &Uuid,
) -> Result<Patient, IntakeError> {
    let tx = immediate_tx(conn)?;
    let mut patient = load_patient(&tx, patient_id)?;
    if patient.state.is_terminal() {
        return Err(IntakeError::TerminalState);
    }
    if repository::get_active_vital_sign(&tx, patient_id)?.is_none() {
        return Err(IntakeError::NoVitalSigns);
    }
    let dept = repository::get_department(&tx, department_id)?.ok_or(IntakeError::NotFound {
        entity: "department",
        id: department_id.to_string(),
    })?;

    patient.department_id = Some(dept.id);
    repository::update_patient(&tx, &patient)?;
    journey::record_milestone(&tx, patient_id, Milestone::DepartmentAssigned, now())?;
    tx.commit().map_err(IntakeError::from)?;

    tracing::info!(%patient_id, department = %dept.code, "department assigned");
    Ok(patient)
}

/// Assign a bed through the ledger. The bed must be Available; the
/// patient must not already be terminal. Moving a patient releases
/// their current bed in the same transaction, so no bed is ever left
/// Occupied without a patient referencing it.
pub fn assign_bed(
    conn: &Connection,
    patient_id: &Uuid,
    bed_id: &Uuid,
) -> Result<Patient, IntakeError> {
    let tx = immediate_tx(conn)?;
    let mut patient = load_patient(&tx, patient_id)?;
    if patient.state.is_terminal() {
        return Err(IntakeError::TerminalState);
    }

    if let Some(held) = patient.bed_id {
        if held == *bed_id {
            return Ok(patient);
        }
        beds::release(&tx, &held)?;
    }
    beds::acquire(&tx, bed_id, patient_id)?;
    tx.commit().map_err(IntakeError::from)?;

    patient.bed_id = Some(*bed_id);
    Ok(patient)
}

// ─── Treatment and termination ────────────────────────────────────────────────

/// Begin treatment: Waiting/Serving → Serving. Requires an assigned
/// bed. Sets `begin_time`, clears the call flag, stamps the milestone.
pub fn begin_treatment(
    conn: &Connection,
    patient_id: &Uuid,
    at: Option<NaiveDateTime>,
) -> Result<Patient, IntakeError> {
    let tx = immediate_tx(conn)?;
    let mut patient = load_patient(&tx, patient_id)?;
    if patient.state.is_terminal() {
        return Err(IntakeError::TerminalState);
    }
    if patient.bed_id.is_none() {
        return Err(IntakeError::NoBedAssigned);
    }

    let at = at.unwrap_or_else(now);
    patient.state = PatientState::Serving;
    patient.begin_time = Some(at);
    patient.call_flag = false;
    repository::update_patient(&tx, &patient)?;
    journey::record_milestone(&tx, patient_id, Milestone::BeginTreatment, at)?;
    tx.commit().map_err(IntakeError::from)?;

    tracing::info!(%patient_id, "treatment begun");
    Ok(patient)
}

/// End treatment: Serving → Served. Strict path — requires `begin_time`
/// and an active journey, otherwise the termination is a conflict.
pub fn end_treatment(
    conn: &Connection,
    patient_id: &Uuid,
    at: Option<NaiveDateTime>,
) -> Result<Patient, IntakeError> {
    let tx = immediate_tx(conn)?;
    let mut patient = load_patient(&tx, patient_id)?;
    check_can_end(&patient)?;

    let at = at.unwrap_or_else(now);
    terminate(&tx, &mut patient, PatientState::Served, at, true)?;
    tx.commit().map_err(IntakeError::from)?;

    tracing::info!(%patient_id, "treatment ended");
    Ok(patient)
}

/// Discharge: end treatment with mandatory remarks.
pub fn discharge(
    conn: &Connection,
    patient_id: &Uuid,
    remarks: &str,
    at: Option<NaiveDateTime>,
) -> Result<Patient, IntakeError> {
    if remarks.trim().is_empty() {
        return Err(IntakeError::Validation("discharge remarks are required".into()));
    }

    let tx = immediate_tx(conn)?;
    let mut patient = load_patient(&tx, patient_id)?;
    check_can_end(&patient)?;

    let at = at.unwrap_or_else(now);
    patient.remarks = Some(remarks.trim().to_string());
    terminate(&tx, &mut patient, PatientState::Served, at, true)?;
    tx.commit().map_err(IntakeError::from)?;

    tracing::info!(%patient_id, "patient discharged");
    Ok(patient)
}

/// Void a registration: Waiting/Serving → Voided. Lenient path — a bed
/// is released if held, a journey ended if active; a missing journey is
/// tolerated since void may race the other terminate paths.
pub fn void_patient(
    conn: &Connection,
    patient_id: &Uuid,
    at: Option<NaiveDateTime>,
) -> Result<Patient, IntakeError> {
    let tx = immediate_tx(conn)?;
    let mut patient = load_patient(&tx, patient_id)?;
    if patient.state.is_terminal() {
        return Err(IntakeError::TerminalState);
    }

    let at = at.unwrap_or_else(now);
    terminate(&tx, &mut patient, PatientState::Voided, at, false)?;
    tx.commit().map_err(IntakeError::from)?;

    tracing::info!(%patient_id, "patient voided");
    Ok(patient)
}

fn check_can_end(patient: &Patient) -> Result<(), IntakeError> {
    if patient.state.is_terminal() {
        return Err(IntakeError::TerminalState);
    }
    if patient.state != PatientState::Serving || patient.begin_time.is_none() {
        return Err(IntakeError::InvariantViolation("treatment has not begun"));
    }
    Ok(())
}

/// Shared terminal transition: release the bed if held, end the
/// journey, stamp `end_time`, clear the call flag, set the target
/// state. `strict` decides whether a missing active journey aborts the
/// transaction or is merely logged.
fn terminate(
    tx: &Transaction<'_>,
    patient: &mut Patient,
    target: PatientState,
    at: NaiveDateTime,
    strict: bool,
) -> Result<(), IntakeError> {
    if let Some(bed_id) = patient.bed_id {
        beds::release(tx, &bed_id)?;
        patient.bed_id = None;
    }

    match journey::end_journey(tx, &patient.id, at)? {
        JourneyEnd::Ended => {}
        JourneyEnd::NoActiveJourney if strict => {
            return Err(IntakeError::InvariantViolation("no active journey to end"));
        }
        JourneyEnd::NoActiveJourney => {
            tracing::warn!(patient_id = %patient.id, "terminating with no active journey");
        }
    }

    patient.state = target;
    patient.end_time = Some(at);
    patient.call_flag = false;
    repository::update_patient(tx, patient)?;
    Ok(())
}

// ─── Call toggle and artifacts ────────────────────────────────────────────────

/// Flip the call flag in any non-terminal state. Turning it on stamps
/// the first/second call milestone and pushes a [`CallEvent`] after
/// commit; the push is fire-and-forget and never affects the state
/// change.
pub fn toggle_call(
    conn: &Connection,
    notifier: &dyn CallNotifier,
    patient_id: &Uuid,
    stage: CallStage,
) -> Result<Patient, IntakeError> {
    let tx = immediate_tx(conn)?;
    let mut patient = load_patient(&tx, patient_id)?;
    if patient.state.is_terminal() {
        return Err(IntakeError::TerminalState);
    }

    patient.call_flag = !patient.call_flag;
    let summoned = patient.call_flag;

    let mut department_code = None;
    if summoned {
        let milestone = match stage {
            CallStage::First => Milestone::FirstCall,
            CallStage::Second => Milestone::SecondCall,
        };
        journey::record_milestone(&tx, patient_id, milestone, now())?;
        if let Some(dept_id) = patient.department_id {
            department_code = repository::get_department(&tx, &dept_id)?.map(|d| d.code);
        }
    }
    repository::update_patient(&tx, &patient)?;
    tx.commit().map_err(IntakeError::from)?;

    if summoned {
        notifier.notify(&CallEvent {
            patient_id: patient.id,
            name: patient.name.clone(),
            ticket: patient.ticket_string.clone(),
            department_code,
            stage,
        });
    }

    Ok(patient)
}

/// Store the reference returned by the external ticket-artifact
/// generator. The engine never interprets the artifact itself.
pub fn set_ticket_artifact(
    conn: &Connection,
    patient_id: &Uuid,
    reference: &str,
) -> Result<(), IntakeError> {
    repository::set_ticket_artifact(conn, patient_id, reference)?;
    Ok(())
}

// ─── Internals ────────────────────────────────────────────────────────────────

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn validate_request(req: &RegisterRequest) -> Result<(), IntakeError> {
    for (field, value) in [
        ("name", &req.name),
        ("mobile_number", &req.mobile_number),
        ("id_number", &req.id_number),
        ("mrn", &req.mrn),
    ] {
        if value.trim().is_empty() {
            return Err(IntakeError::Validation(format!("{field} must not be empty")));
        }
    }
    if matches!(req.age, Some(age) if age < 0) {
        return Err(IntakeError::Validation("age must not be negative".into()));
    }
    Ok(())
}

fn load_patient(conn: &Connection, patient_id: &Uuid) -> Result<Patient, IntakeError> {
    repository::get_patient(conn, patient_id)?.ok_or(IntakeError::NotFound {
        entity: "patient",
        id: patient_id.to_string(),
    })
}

fn immediate_tx(conn: &Connection) -> Result<Transaction<'_>, IntakeError> {
    Transaction::new_unchecked(conn, TransactionBehavior::Immediate).map_err(IntakeError::from)
}

/// Run a registration body in an IMMEDIATE transaction, retrying on
/// the ticket-uniqueness race (or a busy store) with jittered backoff.
fn with_registration_retry<F>(
    conn: &Connection,
    op: &'static str,
    mut body: F,
) -> Result<Patient, IntakeError>
where
    F: FnMut(&Transaction<'_>) -> Result<Patient, IntakeError>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        let tx = immediate_tx(conn)?;
        let result = body(&tx).and_then(|patient| {
            tx.commit().map_err(IntakeError::from)?;
            Ok(patient)
        });

        match result {
            Ok(patient) => return Ok(patient),
            Err(e) if is_transient(&e) => {
                if attempts >= config::MAX_REGISTER_ATTEMPTS {
                    tracing::error!(op, attempts, "registration retries exhausted: {e}");
                    return Err(IntakeError::RetriesExhausted(attempts));
                }
                tracing::warn!(op, attempts, "registration conflicted; retrying: {e}");
                backoff();
            }
            Err(e) => return Err(e),
        }
    }
}

/// A conflict is transient when the ticket uniqueness index rejected
/// the commit (another worker won the same number) or the store was
/// busy past its wait budget.
fn is_transient(e: &IntakeError) -> bool {
    match e {
        IntakeError::Database(DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(err, _))) => {
            err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || matches!(
                    err.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                )
        }
        _ => false,
    }
}

fn backoff() {
    let ms = rand::thread_rng()
        .gen_range(config::RETRY_BACKOFF_MIN_MS..=config::RETRY_BACKOFF_MAX_MS);
    std::thread::sleep(Duration::from_millis(ms));
}
