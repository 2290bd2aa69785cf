use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identity and start time of one matching run
///
/// Created once per trigger and handed to every component that logs or
/// writes run-scoped output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }

    /// Start time formatted for file names, e.g. `20240301_12_00_00_000000`
    pub fn file_stamp(&self) -> String {
        self.started_at.format("%Y%m%d_%H_%M_%S_%6f").to_string()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
