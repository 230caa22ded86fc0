use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::BedStatus;

/// A treatment bed. Occupancy is owned by the patient row (`bed_id`);
/// the status here flips only through the bed ledger operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bed {
    pub id: Uuid,
    pub bed_number: String,
    pub status: BedStatus,
}
