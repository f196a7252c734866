//! Run-level reporting
//!
//! Every artifact a run touches gets an [`ArtifactReport`], so partial
//! failures are visible to the caller instead of only in the log.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::archive::BackupReport;
use crate::identity::TableIdentity;
use crate::table_store::PersistOutcome;
use crate::transform::TransformKind;

/// What happened to an artifact's relational table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Created { rows: usize },
    AlreadyExists,
    Failed { reason: String },
    /// Never attempted because an earlier step failed
    Skipped,
}

impl From<PersistOutcome> for TableOutcome {
    fn from(outcome: PersistOutcome) -> Self {
        match outcome {
            PersistOutcome::Created { rows } => TableOutcome::Created { rows },
            PersistOutcome::AlreadyExists => TableOutcome::AlreadyExists,
        }
    }
}

/// What happened to an artifact's CSV snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishOutcome {
    Published { key: String },
    Failed { reason: String },
    Skipped,
}

/// Outcome for one table identity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactReport {
    /// Table name, `{base}` or `{base}_{Suffix}`
    pub identity: String,
    /// `None` for the base table
    pub transform: Option<TransformKind>,
    /// Rows in the frame; `None` when the transform failed
    pub rows: Option<usize>,
    pub table: TableOutcome,
    pub publish: PublishOutcome,
}

impl ArtifactReport {
    pub(crate) fn new(identity: &TableIdentity, rows: Option<usize>) -> Self {
        Self {
            identity: identity.name(),
            transform: identity.transform(),
            rows,
            table: TableOutcome::Skipped,
            publish: PublishOutcome::Skipped,
        }
    }

    /// Report for a step that failed before touching either store
    pub(crate) fn failed(
        identity: String,
        transform: Option<TransformKind>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            transform,
            rows: None,
            table: TableOutcome::Failed {
                reason: reason.into(),
            },
            publish: PublishOutcome::Skipped,
        }
    }

    /// Table persisted (or already present) and snapshot published
    pub fn is_success(&self) -> bool {
        matches!(
            self.table,
            TableOutcome::Created { .. } | TableOutcome::AlreadyExists
        ) && matches!(self.publish, PublishOutcome::Published { .. })
    }

    /// Reasons for every failed step
    pub fn failure_reasons(&self) -> Vec<&str> {
        let mut reasons = Vec::new();
        if let TableOutcome::Failed { reason } = &self.table {
            reasons.push(reason.as_str());
        }
        if let PublishOutcome::Failed { reason } = &self.publish {
            reasons.push(reason.as_str());
        }
        reasons
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Base table name
    pub table: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub base: ArtifactReport,
    /// One report per transform, in catalog order
    pub artifacts: Vec<ArtifactReport>,
    /// `None` when the backup was disabled
    pub backup: Option<BackupReport>,
}

impl RunSummary {
    /// Check whether every artifact and the backup succeeded
    pub fn is_success(&self) -> bool {
        self.base.is_success()
            && self.artifacts.iter().all(ArtifactReport::is_success)
            && self.backup.as_ref().is_none_or(BackupReport::is_success)
    }

    /// Reports with at least one failed or skipped step
    pub fn failures(&self) -> Vec<&ArtifactReport> {
        std::iter::once(&self.base)
            .chain(&self.artifacts)
            .filter(|report| !report.is_success())
            .collect()
    }

    /// Report for one transform
    pub fn artifact(&self, kind: TransformKind) -> Option<&ArtifactReport> {
        self.artifacts.iter().find(|r| r.transform == Some(kind))
    }

    /// Wall-clock duration of the run in milliseconds
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

fn table_cell(outcome: &TableOutcome) -> String {
    match outcome {
        TableOutcome::Created { rows } => format!("created ({} rows)", rows),
        TableOutcome::AlreadyExists => "exists".to_string(),
        TableOutcome::Failed { .. } => "FAILED".to_string(),
        TableOutcome::Skipped => "skipped".to_string(),
    }
}

fn publish_cell(outcome: &PublishOutcome) -> String {
    match outcome {
        PublishOutcome::Published { key } => key.clone(),
        PublishOutcome::Failed { .. } => "FAILED".to_string(),
        PublishOutcome::Skipped => "skipped".to_string(),
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {} for table {}", self.run_id, self.table)?;
        writeln!(
            f,
            "{:<28} {:>6}  {:<20} PUBLISHED",
            "TABLE", "ROWS", "PERSISTED"
        )?;
        for report in std::iter::once(&self.base).chain(&self.artifacts) {
            let rows = report
                .rows
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                f,
                "{:<28} {:>6}  {:<20} {}",
                report.identity,
                rows,
                table_cell(&report.table),
                publish_cell(&report.publish)
            )?;
        }

        match &self.backup {
            Some(BackupReport::Uploaded { key, entries, .. }) => {
                writeln!(f, "Backup: {} ({} files)", key, entries)?
            }
            Some(BackupReport::Failed { key, reason }) => {
                writeln!(f, "Backup: FAILED {} ({})", key, reason)?
            }
            None => writeln!(f, "Backup: disabled")?,
        }

        let failures = self.failures();
        if failures.is_empty() {
            write!(f, "All artifacts succeeded in {} ms", self.duration_ms())
        } else {
            writeln!(f, "{} artifact(s) failed:", failures.len())?;
            for report in failures {
                for reason in report.failure_reasons() {
                    writeln!(f, "  {}: {}", report.identity, reason)?;
                }
            }
            Ok(())
        }
    }
}
