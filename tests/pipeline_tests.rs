//! End-to-end pipeline runs against DuckDB and an in-memory object store

#![cfg(feature = "duckdb-backend")]

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use etl_pipeline::config::PipelineConfig;
use etl_pipeline::database::{
    ColumnInfo, DatabaseBackend, DatabaseError, DatabaseResult, DuckDBBackend, QueryResult,
};
use etl_pipeline::frame::Value;
use etl_pipeline::pipeline::{IngestSource, Pipeline, PublishOutcome, RunSummary, TableOutcome};
use etl_pipeline::storage::{InMemoryObjectStore, ObjectStore, StorageError, StorageResult};
use etl_pipeline::transform::TransformKind;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;

const TITANIC: &str = "PassengerId,Survived,Pclass,Sex,Age,SibSp,Parch,Ticket,Fare\n\
1,0,3,male,22,1,0,A/5 21171,7.25\n\
2,1,1,female,38,1,0,PC 17599,71.2833\n\
3,1,3,female,26,0,0,STON/O2. 3101282,7.925\n\
4,1,1,female,35,1,0,113803,53.1\n\
5,0,3,male,35,0,0,373450,8.05\n\
6,0,3,male,,0,0,330877,8.4583\n\
7,0,1,male,54,0,0,113803,51.8625\n\
8,1,2,female,27,0,2,PC 17599,30.5\n";

/// Database wrapper recording every statement it is asked to run
struct RecordingBackend {
    inner: DuckDBBackend,
    log: Arc<Mutex<Vec<String>>>,
    /// Every catalog lookup errors
    blind: bool,
}

impl RecordingBackend {
    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait(?Send)]
impl DatabaseBackend for RecordingBackend {
    async fn execute(&self, sql: &str, params: &[Value]) -> DatabaseResult<u64> {
        self.record(sql.to_string());
        self.inner.execute(sql, params).await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DatabaseResult<QueryResult> {
        self.inner.query(sql, params).await
    }

    async fn table_exists(&self, name: &str) -> DatabaseResult<bool> {
        if self.blind {
            return Err(DatabaseError::QueryFailed(format!("catalog unavailable: {}", name)));
        }
        self.inner.table_exists(name).await
    }

    async fn table_columns(&self, name: &str) -> DatabaseResult<Vec<ColumnInfo>> {
        self.inner.table_columns(name).await
    }

    async fn insert_rows(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> DatabaseResult<u64> {
        self.record(format!("INSERT INTO {}", table));
        self.inner.insert_rows(table, columns, rows).await
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        self.inner.health_check().await
    }

    fn backend_type(&self) -> &'static str {
        "recording"
    }

    async fn close(&self) -> DatabaseResult<()> {
        self.inner.close().await
    }
}

/// Object store counting writes, optionally refusing all of them
struct CountingStore {
    inner: InMemoryObjectStore,
    puts: Mutex<Vec<String>>,
    fail: bool,
}

impl CountingStore {
    fn new(fail: bool) -> Self {
        Self {
            inner: InMemoryObjectStore::new(),
            puts: Mutex::new(Vec::new()),
            fail,
        }
    }

    fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait(?Send)]
impl ObjectStore for CountingStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()> {
        self.puts.lock().unwrap().push(key.to_string());
        if self.fail {
            return Err(StorageError::PermissionDenied(format!("{}/{}", bucket, key)));
        }
        self.inner.put_object(bucket, key, body).await
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        self.inner.get_object(bucket, key).await
    }

    fn store_type(&self) -> &'static str {
        "counting"
    }
}

/// ERROR events, with their `key` field if any
#[derive(Clone, Default)]
struct ErrorEvents(Arc<Mutex<Vec<Option<String>>>>);

impl ErrorEvents {
    fn keys(&self) -> Vec<Option<String>> {
        self.0.lock().unwrap().clone()
    }
}

struct KeyVisitor(Option<String>);

impl Visit for KeyVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "key" {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "key" {
            self.0 = Some(format!("{:?}", value));
        }
    }
}

impl<S: Subscriber> Layer<S> for ErrorEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            let mut visitor = KeyVisitor(None);
            event.record(&mut visitor);
            self.0.lock().unwrap().push(visitor.0);
        }
    }
}

fn config(table: &str) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.source.table = table.to_string();
    config.storage.bucket = "etl".to_string();
    config.backup.enabled = false;
    config
}

fn recording_pipeline(
    db_path: &Path,
    store: Arc<CountingStore>,
    table: &str,
) -> (Pipeline, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let backend = RecordingBackend {
        inner: DuckDBBackend::new(db_path).unwrap(),
        log: log.clone(),
        blind: false,
    };
    let pipeline = Pipeline::new(Box::new(backend), Box::new(store), config(table));
    (pipeline, log)
}

async fn row_count(pipeline: &Pipeline, table: &str) -> Value {
    pipeline
        .database()
        .query(&format!("SELECT COUNT(*) FROM \"{}\"", table), &[])
        .await
        .unwrap()
        .scalar()
        .cloned()
        .unwrap()
}

fn titanic_source() -> IngestSource {
    IngestSource::Bytes(TITANIC.as_bytes().to_vec())
}

#[tokio::test]
async fn test_drop_missing_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(CountingStore::new(false));
    let (pipeline, log) = recording_pipeline(&dir.path().join("etl.duckdb"), store.clone(), "Base");

    let source = IngestSource::Bytes(
        b"id,score,name\n1,10,a\n2,20,b\n3,,c\n4,40,d\n5,50,e\n".to_vec(),
    );
    let summary = pipeline.run_to_completion(&source).await.unwrap();

    let drop_na = summary.artifact(TransformKind::DropNa).unwrap();
    assert_eq!(drop_na.identity, "Base_DropNa");
    assert_eq!(drop_na.rows, Some(4));
    assert_eq!(drop_na.table, TableOutcome::Created { rows: 4 });

    let creates: Vec<_> = log
        .lock()
        .unwrap()
        .iter()
        .filter(|sql| sql.starts_with("CREATE TABLE \"Base_DropNa\""))
        .cloned()
        .collect();
    assert_eq!(creates.len(), 1);

    let publishes = store
        .puts()
        .into_iter()
        .filter(|key| key == "processed_data/Base_DropNa.csv")
        .count();
    assert_eq!(publishes, 1);

    let body = store
        .inner
        .object("etl", "processed_data/Base_DropNa.csv")
        .unwrap();
    assert_eq!(
        String::from_utf8(body).unwrap(),
        "id,score,name\n1,10,a\n2,20,b\n4,40,d\n5,50,e\n"
    );
}

#[tokio::test]
async fn test_full_catalog_then_rerun_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("etl.duckdb");

    let store = Arc::new(CountingStore::new(false));
    let (pipeline, log) = recording_pipeline(&db_path, store.clone(), "Titanic");
    let first: RunSummary = pipeline.run_to_completion(&titanic_source()).await.unwrap();

    assert!(first.is_success(), "{}", first);
    assert_eq!(first.base.table, TableOutcome::Created { rows: 8 });
    assert_eq!(log.lock().unwrap().len(), 18);
    assert_eq!(store.puts().len(), 9);

    let keys = store.inner.keys("etl");
    for kind in TransformKind::ALL {
        let key = format!("processed_data/Titanic_{}.csv", kind.suffix());
        assert!(keys.contains(&key), "missing {}", key);
    }
    assert!(keys.contains(&"original_data/Titanic.csv".to_string()));

    let rerun_store = Arc::new(CountingStore::new(false));
    let (pipeline, log) = recording_pipeline(&db_path, rerun_store.clone(), "Titanic");
    let second = pipeline.run_to_completion(&titanic_source()).await.unwrap();

    assert!(second.is_success(), "{}", second);
    let statements = log.lock().unwrap().clone();
    assert!(statements.is_empty(), "{:?}", statements);
    assert_eq!(second.base.table, TableOutcome::AlreadyExists);
    assert!(
        second
            .artifacts
            .iter()
            .all(|r| r.table == TableOutcome::AlreadyExists)
    );
    assert_eq!(rerun_store.puts().len(), 9);

    for (before, after) in first.artifacts.iter().zip(&second.artifacts) {
        assert_eq!(before.rows, after.rows, "{}", before.identity);
    }
}

#[tokio::test]
async fn test_failing_object_store_does_not_stop_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(CountingStore::new(true));
    let (mut pipeline, _log) =
        recording_pipeline(&dir.path().join("etl.duckdb"), store.clone(), "Titanic");

    let errors = ErrorEvents::default();
    let _subscriber = tracing::subscriber::set_default(
        tracing_subscriber::registry().with(errors.clone()),
    );

    let summary = pipeline.run(&titanic_source()).await.unwrap();

    assert_eq!(store.puts().len(), 9);
    assert_eq!(summary.failures().len(), 9);

    // One error record per failed publish, and nothing else at ERROR
    let keys = errors.keys();
    assert_eq!(keys.len(), 9, "{:?}", keys);
    assert!(keys.iter().all(|key| key.as_deref().is_some_and(|k| {
        k.starts_with("original_data/") || k.starts_with("processed_data/")
    })));
    assert!(matches!(summary.base.publish, PublishOutcome::Failed { .. }));
    for report in &summary.artifacts {
        assert!(
            matches!(report.table, TableOutcome::Created { .. }),
            "{}",
            report.identity
        );
        assert!(matches!(report.publish, PublishOutcome::Failed { .. }));
        assert_eq!(report.failure_reasons().len(), 1);

        let rows = report.rows.unwrap() as i64;
        assert_eq!(row_count(&pipeline, &report.identity).await, Value::Int(rows));
    }

    pipeline.close().await.unwrap();
}

#[tokio::test]
async fn test_unreadable_catalog_still_fetches_existing_base() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("etl.duckdb");

    let (pipeline, _log) =
        recording_pipeline(&db_path, Arc::new(CountingStore::new(false)), "Base");
    let first = pipeline.run_to_completion(&titanic_source()).await.unwrap();
    assert_eq!(first.base.table, TableOutcome::Created { rows: 8 });

    let store = Arc::new(CountingStore::new(false));
    let backend = RecordingBackend {
        inner: DuckDBBackend::new(&db_path).unwrap(),
        log: Arc::new(Mutex::new(Vec::new())),
        blind: true,
    };
    let pipeline = Pipeline::new(Box::new(backend), Box::new(store.clone()), config("Base"));
    let second = pipeline.run_to_completion(&titanic_source()).await.unwrap();

    // CREATE on an existing table fails; the run carries on with the stored rows
    assert!(matches!(second.base.table, TableOutcome::Failed { .. }));
    assert_eq!(second.base.rows, Some(8));
    assert!(matches!(second.base.publish, PublishOutcome::Published { .. }));
    for report in &second.artifacts {
        assert!(matches!(report.table, TableOutcome::Failed { .. }), "{}", report.identity);
        assert!(matches!(report.publish, PublishOutcome::Published { .. }));
    }
    assert_eq!(store.puts().len(), 9);
    assert!(!second.is_success());

    let snapshot = store.inner.object("etl", "original_data/Base.csv").unwrap();
    assert_eq!(String::from_utf8(snapshot).unwrap().lines().count(), 9);
}

#[tokio::test]
async fn test_derived_row_counts() {
    let store = Arc::new(InMemoryObjectStore::new());
    let pipeline = Pipeline::new(
        Box::new(DuckDBBackend::in_memory().unwrap()),
        Box::new(store.clone()),
        config("Titanic"),
    );

    let summary = pipeline.run_to_completion(&titanic_source()).await.unwrap();
    let rows = |kind| summary.artifact(kind).and_then(|r| r.rows);

    assert_eq!(rows(TransformKind::DropNa), Some(7));
    // (1, female), (1, male), (2, female), (3, female), (3, male)
    assert_eq!(rows(TransformKind::GroupBy), Some(5));
    assert_eq!(rows(TransformKind::Pivot), Some(3));
    assert_eq!(rows(TransformKind::Melt), Some(32));
    // one missing Age is dropped by stacking
    assert_eq!(rows(TransformKind::Stack), Some(31));
    assert_eq!(rows(TransformKind::Merge), Some(4));
    assert_eq!(rows(TransformKind::Concat), Some(8));
    assert_eq!(rows(TransformKind::Union), Some(16));

    let pivot = String::from_utf8(
        store
            .object("etl", "processed_data/Titanic_Pivot.csv")
            .unwrap(),
    )
    .unwrap();
    assert_eq!(pivot.lines().next(), Some("Pclass,female,male"));
}
