//! Patient journey and ticket sequencing engine for walk-in clinical intake.
//!
//! The engine owns the authoritative patient lifecycle state
//! (waiting → serving → served, with void as a parallel terminal),
//! issues collision-free per-day ticket numbers, and couples bed
//! occupancy to patient state. All cross-entity writes happen inside a
//! single SQLite transaction; callers hold their own connection and
//! pass it into every operation — there is no shared global handle.

pub mod beds;
pub mod config;
pub mod db;
pub mod intake;
pub mod journey;
pub mod models;
pub mod notify;
pub mod ticket;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for binaries and integration harnesses.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
