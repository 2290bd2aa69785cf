use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::models::domain::RunSummary;

/// Outcome of one pipeline run, returned to the trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub summary: RunSummary,
    pub rejected_rows: usize,
    pub emails_attempted: usize,
    pub emails_sent: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
