use std::sync::Arc;
use std::time::Duration;

use sluice_artifact::ObjectStore;
use sluice_config::{Parameters, Secrets};
use sluice_runtime::{ExecutionNotifier, NoopNotifier, Orchestrator, RunReport, RuntimeConfig};
use sluice_warehouse::QueryExecutor;
use sluice_workflow::{RetryPolicy, Workflow, WorkflowError};
use tracing::{info, instrument};

use crate::error::PipelineError;
use crate::settings::{LoadSettings, nodes};
use crate::tasks::{ConvertCsvTask, QueryKind, QueryTask, UploadTask};

const WORKFLOW_NAME: &str = "load_sales_into_warehouse";

/// Retry policy for every node that talks to a remote service.
fn remote_retry() -> RetryPolicy {
  RetryPolicy::new(3, Duration::from_secs(5))
}

/// Build the five-node sales-load graph.
pub fn build_workflow(
  store: Arc<dyn ObjectStore>,
  executor: Arc<dyn QueryExecutor>,
) -> Result<Workflow, WorkflowError> {
  let query = |kind| QueryTask::new(kind, executor.clone());

  let mut workflow = Workflow::new(WORKFLOW_NAME);
  workflow
    .define(nodes::CONVERT_CSV_TO_PARQUET, ConvertCsvTask, &[])?
    .define_with_retry(
      nodes::UPLOAD_PARQUET,
      UploadTask::new(store),
      &[nodes::CONVERT_CSV_TO_PARQUET],
      remote_retry(),
    )?
    .define_with_retry(
      nodes::CREATE_EXTERNAL_TABLE,
      query(QueryKind::CreateExternalTable),
      &[],
      remote_retry(),
    )?
    .define_with_retry(
      nodes::CREATE_FACT_TABLE,
      query(QueryKind::CreateFactTable),
      &[],
      remote_retry(),
    )?
    .define_with_retry(
      nodes::INSERT_INTO_FACT_TABLE,
      query(QueryKind::InsertIntoFactTable),
      &[
        nodes::UPLOAD_PARQUET,
        nodes::CREATE_EXTERNAL_TABLE,
        nodes::CREATE_FACT_TABLE,
      ],
      remote_retry(),
    )?;

  Ok(workflow)
}

/// The sales-load flow bound to a store and a query executor.
pub struct SalesLoad {
  workflow: Workflow,
  config: RuntimeConfig,
}

impl SalesLoad {
  pub fn new(
    store: Arc<dyn ObjectStore>,
    executor: Arc<dyn QueryExecutor>,
  ) -> Result<Self, PipelineError> {
    Ok(Self {
      workflow: build_workflow(store, executor)?,
      config: RuntimeConfig::default(),
    })
  }

  pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
    self.config = config;
    self
  }

  pub fn workflow(&self) -> &Workflow {
    &self.workflow
  }

  /// Run the flow once.
  ///
  /// Parameters and secrets are checked before any node starts; a missing
  /// or malformed value fails the call instead of producing a report.
  pub async fn run(
    &self,
    parameters: &Parameters,
    secrets: &Secrets,
  ) -> Result<RunReport, PipelineError> {
    self
      .run_with_notifier(parameters, secrets, NoopNotifier)
      .await
  }

  #[instrument(name = "sales_load", skip_all)]
  pub async fn run_with_notifier<N: ExecutionNotifier + 'static>(
    &self,
    parameters: &Parameters,
    secrets: &Secrets,
    notifier: N,
  ) -> Result<RunReport, PipelineError> {
    let settings = LoadSettings::resolve(parameters, secrets)?;
    info!(
      database = %settings.database,
      engine = %settings.engine_name,
      bucket = %settings.bucket,
      csv = %settings.csv_file_path.display(),
      fact_table = %settings.fact_table,
      external_table = %settings.external_table,
      "settings_resolved"
    );

    let orchestrator =
      Orchestrator::with_notifier(self.workflow.clone(), self.config.clone(), notifier);
    Ok(orchestrator.run(parameters, secrets).await)
  }
}
