//! Call notification seam.
//!
//! Summoning a patient pushes an event to an external real-time
//! channel. The push is fire-and-forget: it is not transactionally
//! coupled to the state change, and failures must never roll back or
//! block the call toggle.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::CallStage;

/// Payload pushed when staff summon a patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEvent {
    pub patient_id: Uuid,
    pub name: String,
    pub ticket: String,
    pub department_code: Option<String>,
    pub stage: CallStage,
}

/// Sink for call events. Implementations wrap the real push channel
/// (display board, websocket, SMS); the engine only hands the event
/// over.
pub trait CallNotifier {
    fn notify(&self, event: &CallEvent);
}

/// Default notifier: logs the event and nothing else. Useful when no
/// push channel is wired up and in tests.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl CallNotifier for LogNotifier {
    fn notify(&self, event: &CallEvent) {
        match serde_json::to_string(event) {
            Ok(json) => tracing::info!(payload = %json, "call event"),
            Err(e) => tracing::warn!("call event serialization failed: {e}"),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use super::*;

    /// Collects events so tests can assert on emissions.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        pub events: Mutex<Vec<CallEvent>>,
    }

    impl CallNotifier for RecordingNotifier {
        fn notify(&self, event: &CallEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}
