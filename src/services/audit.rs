use crate::core::RunContext;
use crate::services::delivery::AuditEntry;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Persists which samples were emailed and when
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, ctx: &RunContext, entries: &[AuditEntry]) -> Result<(), AuditError>;
}

/// Writes `successful_sends_<stamp>.csv` into a report directory
pub struct CsvAuditSink {
    report_dir: PathBuf,
}

impl CsvAuditSink {
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
        }
    }

    pub fn report_path(&self, ctx: &RunContext) -> PathBuf {
        self.report_dir
            .join(format!("successful_sends_{}.csv", ctx.file_stamp()))
    }
}

#[async_trait]
impl AuditSink for CsvAuditSink {
    async fn record(&self, ctx: &RunContext, entries: &[AuditEntry]) -> Result<(), AuditError> {
        tokio::fs::create_dir_all(&self.report_dir).await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["sample_id", "email_sent"])?;
        for entry in entries {
            let sent = entry.email_sent.to_rfc3339();
            writer.write_record([entry.sample_id.as_str(), sent.as_str()])?;
        }
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;

        let path = self.report_path(ctx);
        tokio::fs::write(&path, bytes).await?;

        tracing::info!("Recorded {} sent samples to {}", entries.len(), path.display());
        Ok(())
    }
}
