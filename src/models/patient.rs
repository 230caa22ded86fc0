use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::PatientState;

/// A registered patient and their authoritative lifecycle state.
///
/// Invariants maintained by the intake orchestrator:
/// - `bed_id` set implies `state == Serving`
/// - `ticket_number` never changes between (re-)registrations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub gender: Option<String>,
    pub age: Option<i64>,
    pub mobile_number: String,
    pub id_number: String,
    pub mrn: String,
    pub chief_complaint: Option<String>,
    pub state: PatientState,
    /// Has staff summoned the patient (first or second call)?
    pub call_flag: bool,
    /// Sequence number, unique among all patients registered the same day.
    pub ticket_number: i64,
    /// Human-facing ticket: department code + sequence number.
    pub ticket_string: String,
    pub department_id: Option<Uuid>,
    pub bed_id: Option<Uuid>,
    pub registered_at: NaiveDateTime,
    pub begin_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub remarks: Option<String>,
    /// Reference to the externally rendered printable ticket artifact.
    pub ticket_artifact: Option<String>,
}
