use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "IntakeEngine";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "info"
}

/// How long a worker waits on a locked database before the operation is
/// aborted and reported as retryable (milliseconds).
pub const BUSY_TIMEOUT_MS: u32 = 10_000;

/// Bounded retry count for registration transactions that lose the
/// ticket-allocation race.
pub const MAX_REGISTER_ATTEMPTS: u32 = 3;

/// Jittered backoff window between registration retries (milliseconds).
pub const RETRY_BACKOFF_MIN_MS: u64 = 10;
pub const RETRY_BACKOFF_MAX_MS: u64 = 30;

/// Application data directory, when a home directory can be resolved.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_NAME))
}

/// Default on-disk database path.
pub fn database_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("intake.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir().unwrap();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with(APP_NAME));
    }

    #[test]
    fn database_path_under_app_data() {
        let db = database_path().unwrap();
        assert!(db.starts_with(app_data_dir().unwrap()));
        assert!(db.ends_with("intake.db"));
    }

    #[test]
    fn retry_bounds_sane() {
        assert!(MAX_REGISTER_ATTEMPTS >= 1);
        assert!(RETRY_BACKOFF_MIN_MS <= RETRY_BACKOFF_MAX_MS);
    }
}
