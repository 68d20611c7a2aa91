use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use sluice_artifact::{ObjectStore, StoreError};
use sluice_task::{Task, TaskContext, TaskError, TaskOutput};
use sluice_transform::TransformError;
use sluice_warehouse::{Query, QueryError, QueryExecutor, QueryRequest, sql};
use tracing::{info, instrument};

use crate::settings::{LoadSettings, STAGED_OBJECT_KEY, nodes, params};

fn transform_failure(err: TransformError) -> TaskError {
  TaskError::fatal(err.to_string())
}

fn store_failure(err: StoreError) -> TaskError {
  if err.is_retryable() {
    TaskError::transient(err.to_string())
  } else {
    TaskError::fatal(err.to_string())
  }
}

fn query_failure(err: QueryError) -> TaskError {
  match err {
    QueryError::Transient { message } => TaskError::transient(message),
    QueryError::Fatal { message } => TaskError::fatal(message),
  }
}

/// Reads the CSV named by `csv_file_path` and produces Parquet bytes.
#[derive(Debug, Clone, Default)]
pub struct ConvertCsvTask;

#[async_trait]
impl Task for ConvertCsvTask {
  #[instrument(name = "convert_csv", skip_all, fields(run_id = %ctx.run_id))]
  async fn execute(&self, ctx: TaskContext) -> Result<TaskOutput, TaskError> {
    let path = PathBuf::from(ctx.parameter(params::CSV_FILE_PATH)?);

    // csv and parquet are blocking; keep them off the scheduler threads.
    let bytes = tokio::task::spawn_blocking(move || sluice_transform::csv_to_parquet(path))
      .await
      .map_err(|e| TaskError::fatal(format!("conversion worker failed: {}", e)))?
      .map_err(transform_failure)?;

    Ok(TaskOutput::Bytes(bytes))
  }
}

/// Stages the upstream Parquet payload under the fixed object key.
pub struct UploadTask {
  store: Arc<dyn ObjectStore>,
}

impl UploadTask {
  pub fn new(store: Arc<dyn ObjectStore>) -> Self {
    Self { store }
  }
}

#[async_trait]
impl Task for UploadTask {
  #[instrument(name = "upload_parquet", skip_all, fields(run_id = %ctx.run_id, attempt = ctx.attempt))]
  async fn execute(&self, ctx: TaskContext) -> Result<TaskOutput, TaskError> {
    let data = ctx.upstream_bytes(nodes::CONVERT_CSV_TO_PARQUET)?;
    let bucket = ctx.parameter(params::S3_BUCKET)?;
    let size = data.len();

    self
      .store
      .put(bucket, STAGED_OBJECT_KEY, data)
      .await
      .map_err(store_failure)?;

    info!(bucket = %bucket, key = STAGED_OBJECT_KEY, bytes = size, "parquet_staged");
    Ok(TaskOutput::Value(json!({
      "bucket": bucket,
      "key": STAGED_OBJECT_KEY,
      "bytes": size,
    })))
  }
}

/// Which warehouse statement a [`QueryTask`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
  CreateExternalTable,
  CreateFactTable,
  InsertIntoFactTable,
}

impl QueryKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::CreateExternalTable => "create_external_table",
      Self::CreateFactTable => "create_fact_table",
      Self::InsertIntoFactTable => "insert_into_fact_table",
    }
  }

  pub fn render(&self, settings: &LoadSettings) -> Query {
    match self {
      Self::CreateExternalTable => {
        sql::create_external_table(&settings.external_table, &settings.bucket, &settings.aws)
      }
      Self::CreateFactTable => sql::create_fact_table(&settings.fact_table),
      Self::InsertIntoFactTable => sql::insert_into(&settings.fact_table, &settings.external_table),
    }
  }
}

/// Renders one statement from the run's parameters and submits it.
///
/// Rendering happens on every attempt; it is pure, so every attempt submits
/// the same text.
pub struct QueryTask {
  kind: QueryKind,
  executor: Arc<dyn QueryExecutor>,
}

impl QueryTask {
  pub fn new(kind: QueryKind, executor: Arc<dyn QueryExecutor>) -> Self {
    Self { kind, executor }
  }
}

#[async_trait]
impl Task for QueryTask {
  #[instrument(
    name = "warehouse_query",
    skip_all,
    fields(run_id = %ctx.run_id, statement = self.kind.as_str(), attempt = ctx.attempt)
  )]
  async fn execute(&self, ctx: TaskContext) -> Result<TaskOutput, TaskError> {
    let settings = LoadSettings::resolve(ctx.parameters(), ctx.secrets())?;

    let request = QueryRequest {
      query: self.kind.render(&settings),
      database: settings.database,
      engine_name: settings.engine_name,
      credentials: settings.warehouse,
    };

    let result = self
      .executor
      .execute(&request)
      .await
      .map_err(query_failure)?;

    let mut output = json!({ "statement": self.kind.as_str() });
    if let Some(rows) = result.get("rows") {
      output["rows"] = rows.clone();
    }
    Ok(TaskOutput::Value(output))
  }
}
