//! Pipeline orchestration
//!
//! A [`Pipeline`] owns one database handle and one object-store handle for
//! the lifetime of a run and walks a fixed sequence of states:
//!
//! ```text
//! Idle -> Ingested -> BaseSnapshotPublished -> TransformApplied(kind) x 8 -> Closed
//! ```
//!
//! Only ingestion and the base fetch are fatal. Bootstrapping the base table
//! and every derived artifact are best-effort: their failures are recorded in
//! the [`RunSummary`] and the run moves on.

mod connect;
mod summary;

use std::fmt;
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::archive::upload_backup;
use crate::config::{PipelineConfig, SourceSection};
use crate::database::{DatabaseBackend, DatabaseError};
use crate::frame::{FrameError, TabularFrame, read_csv, read_csv_path};
use crate::identity::TableIdentity;
use crate::publisher::{ArtifactFolder, ArtifactPublisher};
use crate::storage::{ObjectStore, StorageError};
use crate::table_store::{StoreError, TableStore};
use crate::transform::{TransformCatalog, TransformKind};
use crate::validation::ValidationError;

pub use connect::{open_database, open_object_store};
pub use summary::{ArtifactReport, PublishOutcome, RunSummary, TableOutcome};

/// Fatal pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database connection failed: {0}")]
    Connection(DatabaseError),

    #[error("Invalid table name: {0}")]
    InvalidTable(#[from] ValidationError),

    #[error("Failed to download source {key}: {source}")]
    Download { key: String, source: StorageError },

    #[error("Failed to read source {origin}: {source}")]
    Read { origin: String, source: FrameError },

    #[error("Failed to fetch base table: {0}")]
    Fetch(StoreError),

    #[error("Failed to close database: {0}")]
    Close(DatabaseError),

    #[error("Pipeline is closed")]
    Closed,
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Where the source CSV comes from
#[derive(Debug, Clone, PartialEq)]
pub enum IngestSource {
    /// Object in the pipeline's bucket, downloaded to `local_path` first
    Object { key: String, local_path: PathBuf },
    /// File already on disk
    File(PathBuf),
    /// CSV bytes in memory
    Bytes(Vec<u8>),
}

impl IngestSource {
    /// The object described by a `[source]` section
    pub fn from_config(section: &SourceSection) -> Self {
        IngestSource::Object {
            key: section.key.clone(),
            local_path: section.local_path.clone(),
        }
    }
}

impl fmt::Display for IngestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestSource::Object { key, .. } => write!(f, "object {}", key),
            IngestSource::File(path) => write!(f, "file {}", path.display()),
            IngestSource::Bytes(bytes) => write!(f, "{} bytes", bytes.len()),
        }
    }
}

/// Where a run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "transform", rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Ingested,
    BaseSnapshotPublished,
    TransformApplied(TransformKind),
    Closed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => f.write_str("idle"),
            PipelineState::Ingested => f.write_str("ingested"),
            PipelineState::BaseSnapshotPublished => f.write_str("base snapshot published"),
            PipelineState::TransformApplied(kind) => write!(f, "{} applied", kind),
            PipelineState::Closed => f.write_str("closed"),
        }
    }
}

/// The ETL pipeline
pub struct Pipeline {
    db: Box<dyn DatabaseBackend>,
    store: Box<dyn ObjectStore>,
    config: PipelineConfig,
    catalog: TransformCatalog,
    state: PipelineState,
}

impl Pipeline {
    /// Create a pipeline over injected handles
    pub fn new(
        db: Box<dyn DatabaseBackend>,
        store: Box<dyn ObjectStore>,
        config: PipelineConfig,
    ) -> Self {
        let catalog = TransformCatalog::new(config.transforms.clone());
        Self {
            db,
            store,
            config,
            catalog,
            state: PipelineState::Idle,
        }
    }

    /// Open the configured database and object store
    pub async fn connect(config: PipelineConfig) -> PipelineResult<Self> {
        let db = open_database(&config).await?;
        let store = open_object_store(&config).await?;
        Ok(Self::new(db, store, config))
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The database handle, for inspection between `run` and `close`
    pub fn database(&self) -> &dyn DatabaseBackend {
        self.db.as_ref()
    }

    pub fn object_store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    fn transition(&mut self, state: PipelineState) {
        info!(from = %self.state, to = %state, "Pipeline state");
        self.state = state;
    }

    /// Run ingestion, every transform and the backup
    pub async fn run(&mut self, source: &IngestSource) -> PipelineResult<RunSummary> {
        if self.state == PipelineState::Closed {
            return Err(PipelineError::Closed);
        }

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let base_identity = TableIdentity::base(self.config.source.table.clone())?;
        info!(%run_id, table = %base_identity, %source, "Starting pipeline run");

        let ingested = self.ingest(source).await?;
        self.transition(PipelineState::Ingested);

        let table_store = TableStore::new(self.db.as_ref());
        let persisted = match table_store.persist(&base_identity, &ingested).await {
            Ok(outcome) => outcome.into(),
            Err(e) => {
                warn!(table = %base_identity, "Bootstrap failed, fetching existing table");
                TableOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        drop(ingested);

        let base = table_store
            .fetch(&base_identity)
            .await
            .map_err(PipelineError::Fetch)?;

        let mut base_report = ArtifactReport::new(&base_identity, Some(base.row_count()));
        base_report.table = persisted;
        base_report.publish = self
            .publish(&base, &base_identity, ArtifactFolder::OriginalData)
            .await;
        self.transition(PipelineState::BaseSnapshotPublished);

        let mut artifacts = Vec::with_capacity(TransformKind::ALL.len());
        for &kind in self.catalog.kinds() {
            let report = self.derive(&base, &base_identity, kind).await;
            artifacts.push(report);
            self.transition(PipelineState::TransformApplied(kind));
        }

        let backup = if self.config.backup.enabled {
            let bucket = &self.config.storage.bucket;
            Some(upload_backup(self.store.as_ref(), bucket, &self.config.backup).await)
        } else {
            None
        };

        let summary = RunSummary {
            run_id,
            table: base_identity.name(),
            started_at,
            finished_at: Utc::now(),
            base: base_report,
            artifacts,
            backup,
        };

        let failures = summary.failures().len();
        if failures == 0 {
            info!(%run_id, duration_ms = summary.duration_ms(), "Pipeline run succeeded");
        } else {
            warn!(%run_id, failures, "Pipeline run finished with failures");
        }

        Ok(summary)
    }

    /// Run, then close the database whether or not the run succeeded
    pub async fn run_to_completion(mut self, source: &IngestSource) -> PipelineResult<RunSummary> {
        let result = self.run(source).await;
        let closed = self.close().await;

        let summary = result?;
        closed?;
        Ok(summary)
    }

    /// Release the database connection
    pub async fn close(&mut self) -> PipelineResult<()> {
        if self.state == PipelineState::Closed {
            return Ok(());
        }

        let result = self.db.close().await.map_err(PipelineError::Close);
        if let Err(e) = &result {
            error!("{}", e);
        }
        self.transition(PipelineState::Closed);
        result
    }

    async fn ingest(&self, source: &IngestSource) -> PipelineResult<TabularFrame> {
        let frame = match source {
            IngestSource::Object { key, local_path } => {
                self.store
                    .download_to(&self.config.storage.bucket, key, local_path)
                    .await
                    .map_err(|source| PipelineError::Download {
                        key: key.clone(),
                        source,
                    })?;
                info!(key = %key, path = %local_path.display(), "Downloaded source");
                read_csv_path(local_path).map_err(|source| PipelineError::Read {
                    origin: local_path.display().to_string(),
                    source,
                })?
            }
            IngestSource::File(path) => read_csv_path(path).map_err(|source| PipelineError::Read {
                origin: path.display().to_string(),
                source,
            })?,
            IngestSource::Bytes(bytes) => {
                read_csv(bytes.as_slice()).map_err(|source| PipelineError::Read {
                    origin: "memory".to_string(),
                    source,
                })?
            }
        };

        info!(
            rows = frame.row_count(),
            columns = frame.column_count(),
            "Ingested source"
        );
        Ok(frame)
    }

    /// Apply one transform to the base frame, then persist and publish it
    async fn derive(
        &self,
        base: &TabularFrame,
        base_identity: &TableIdentity,
        kind: TransformKind,
    ) -> ArtifactReport {
        let identity = match base_identity.derived(kind) {
            Ok(identity) => identity,
            Err(e) => {
                let name = format!("{}_{}", base_identity, kind.suffix());
                error!(table = %name, "Invalid derived table name: {}", e);
                return ArtifactReport::failed(name, Some(kind), e.to_string());
            }
        };

        let frame = match self.catalog.apply(kind, base) {
            Ok(frame) => frame,
            Err(e) => {
                error!(table = %identity, "Transform failed: {}", e);
                return ArtifactReport::failed(identity.name(), Some(kind), e.to_string());
            }
        };

        let mut report = ArtifactReport::new(&identity, Some(frame.row_count()));
        report.table = match TableStore::new(self.db.as_ref())
            .persist(&identity, &frame)
            .await
        {
            Ok(outcome) => outcome.into(),
            Err(e) => TableOutcome::Failed {
                reason: e.to_string(),
            },
        };
        report.publish = self
            .publish(&frame, &identity, ArtifactFolder::ProcessedData)
            .await;
        report
    }

    async fn publish(
        &self,
        frame: &TabularFrame,
        identity: &TableIdentity,
        folder: ArtifactFolder,
    ) -> PublishOutcome {
        let publisher = ArtifactPublisher::new(self.store.as_ref(), &self.config.storage.bucket);
        match publisher.publish(frame, &identity.file_name(), folder).await {
            Ok(key) => PublishOutcome::Published { key },
            Err(e) => PublishOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}
