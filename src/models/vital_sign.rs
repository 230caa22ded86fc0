use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A triage vital-sign record. At most one active row per patient;
/// an active row gates department assignment. Re-registration
/// deactivates prior rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalSign {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub is_active: bool,
    pub temperature: Option<f64>,
    pub pulse: Option<f64>,
    pub respiratory_rate: Option<f64>,
    pub systolic: Option<f64>,
    pub diastolic: Option<f64>,
    pub spo2: Option<f64>,
    pub recorded_at: NaiveDateTime,
}
