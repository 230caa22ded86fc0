use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One registration-to-resolution episode for a patient.
///
/// At most one journey per patient has `is_active = true` at any time.
/// Rows are deactivated, never deleted — history is an audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journey {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub is_active: bool,
    pub started_at: NaiveDateTime,
    pub first_call_time: Option<NaiveDateTime>,
    pub vitals_time: Option<NaiveDateTime>,
    pub assign_dept_time: Option<NaiveDateTime>,
    pub second_call_time: Option<NaiveDateTime>,
    pub begin_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
}

/// A named timestamp within a journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    FirstCall,
    Vitals,
    DepartmentAssigned,
    SecondCall,
    BeginTreatment,
    EndTreatment,
}

impl Milestone {
    /// Journey column holding this milestone's timestamp.
    pub fn column(self) -> &'static str {
        match self {
            Milestone::FirstCall => "first_call_time",
            Milestone::Vitals => "vitals_time",
            Milestone::DepartmentAssigned => "assign_dept_time",
            Milestone::SecondCall => "second_call_time",
            Milestone::BeginTreatment => "begin_time",
            Milestone::EndTreatment => "end_time",
        }
    }
}
