use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A clinical department. The `code` prefixes ticket strings; exactly
/// one department should carry `is_intake` for default assignment at
/// registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub is_intake: bool,
}
