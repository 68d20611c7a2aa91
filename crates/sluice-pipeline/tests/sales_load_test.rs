//! End-to-end tests of the sales-load flow with in-memory collaborators.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use sluice_artifact::{ObjectStore, StoreError};
use sluice_config::{ConfigError, Parameters, Secrets};
use sluice_pipeline::{PipelineError, STAGED_OBJECT_KEY, SalesLoad, nodes, params, secrets};
use sluice_runtime::{FailureKind, NodeStatus};
use sluice_warehouse::{QueryError, QueryExecutor, QueryRequest};

const CSV: &str = "\
transaction_number,purchase_date,product_number,product_name,price,quantity,revenue,customer_number,country
581482,12/9/2019,22485,Set Of 2 Wooden Market Crates,2147,12,25764,17490,United Kingdom
581475,12/9/2019,22596,Christmas Star Wish List Chalkboard,1065,36,38340,13069,United Kingdom
581476,12/9/2019,23235,Storage Tin Vintage Leaf,1253,12,15036,12433,Norway
";

/// Object store that keeps objects in memory and can be scripted to fail.
#[derive(Default)]
struct MemoryStore {
  objects: Mutex<HashMap<(String, String), Bytes>>,
  failures: Mutex<VecDeque<StoreError>>,
  puts: Mutex<u32>,
}

impl MemoryStore {
  fn failing_with(errors: Vec<StoreError>) -> Self {
    Self {
      failures: Mutex::new(errors.into()),
      ..Self::default()
    }
  }

  fn puts(&self) -> u32 {
    *self.puts.lock().unwrap()
  }

  fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
    self
      .objects
      .lock()
      .unwrap()
      .get(&(bucket.to_string(), key.to_string()))
      .cloned()
  }
}

#[async_trait]
impl ObjectStore for MemoryStore {
  async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), StoreError> {
    *self.puts.lock().unwrap() += 1;
    if let Some(err) = self.failures.lock().unwrap().pop_front() {
      return Err(err);
    }
    self
      .objects
      .lock()
      .unwrap()
      .insert((bucket.to_string(), key.to_string()), data);
    Ok(())
  }

  async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
    self.object(bucket, key).ok_or_else(|| StoreError::NotFound {
      bucket: bucket.to_string(),
      key: key.to_string(),
    })
  }
}

/// Query executor that records submitted SQL and fails statements whose text
/// starts with a scripted prefix.
#[derive(Default)]
struct RecordingExecutor {
  submitted: Mutex<Vec<String>>,
  failures: Mutex<Vec<(&'static str, VecDeque<QueryError>)>>,
}

impl RecordingExecutor {
  fn failing(prefix: &'static str, errors: Vec<QueryError>) -> Self {
    Self {
      failures: Mutex::new(vec![(prefix, errors.into())]),
      ..Self::default()
    }
  }

  fn submitted(&self) -> Vec<String> {
    self.submitted.lock().unwrap().clone()
  }

  fn count(&self, prefix: &str) -> usize {
    self
      .submitted()
      .iter()
      .filter(|sql| sql.starts_with(prefix))
      .count()
  }
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
  async fn execute(&self, request: &QueryRequest) -> Result<serde_json::Value, QueryError> {
    let sql = request.query.as_str().to_string();
    self.submitted.lock().unwrap().push(sql.clone());

    let mut failures = self.failures.lock().unwrap();
    for (prefix, errors) in failures.iter_mut() {
      if sql.starts_with(*prefix) {
        if let Some(err) = errors.pop_front() {
          return Err(err);
        }
      }
    }
    Ok(serde_json::Value::Null)
  }
}

struct Fixture {
  _dir: tempfile::TempDir,
  parameters: Parameters,
  secrets: Secrets,
}

fn fixture(csv: &str) -> Fixture {
  let dir = tempfile::tempdir().unwrap();
  let csv_path = dir.path().join("business_sales_transaction.csv");
  std::fs::write(&csv_path, csv).unwrap();

  let parameters = Parameters::new()
    .with(params::FIREBOLT_DATABASE, "business_sales_transactions")
    .with(params::FIREBOLT_ENGINE_NAME, "general_purpose")
    .with(params::S3_BUCKET, "sales-staging")
    .with(params::CSV_FILE_PATH, csv_path.to_string_lossy())
    .with(params::FACT_TABLE_NAME, "business_sales_transaction")
    .with(params::EXTERNAL_TABLE_NAME, "ex_business_sales_transaction");

  let secrets = Secrets::new()
    .with(secrets::FIREBOLT_USERNAME, "loader@example.com")
    .with(secrets::FIREBOLT_PASSWORD, "hunter2")
    .with(
      secrets::AWS_CREDENTIALS,
      r#"{"ACCESS_KEY": "AKIAEXAMPLE", "SECRET_ACCESS_KEY": "s3cr3t"}"#,
    );

  Fixture {
    _dir: dir,
    parameters,
    secrets,
  }
}

#[tokio::test]
async fn test_full_success() {
  let fixture = fixture(CSV);
  let store = Arc::new(MemoryStore::default());
  let executor = Arc::new(RecordingExecutor::default());

  let report = SalesLoad::new(store.clone(), executor.clone())
    .unwrap()
    .run(&fixture.parameters, &fixture.secrets)
    .await
    .unwrap();

  assert!(report.succeeded);
  assert_eq!(report.count(NodeStatus::Succeeded), 5);
  for node in report.nodes.values() {
    assert_eq!(node.attempts, 1, "{}", node.node_id);
  }

  let staged = store.object("sales-staging", STAGED_OBJECT_KEY).unwrap();
  let rows = sluice_transform::read_parquet(&staged).unwrap();
  assert_eq!(rows.len(), 3);
  assert_eq!(rows[0].revenue, 25764);

  let submitted = executor.submitted();
  assert_eq!(submitted.len(), 3);
  assert_eq!(
    submitted.last().unwrap(),
    "INSERT INTO business_sales_transaction SELECT * FROM ex_business_sales_transaction;"
  );
  assert_eq!(executor.count("CREATE EXTERNAL TABLE"), 1);
  assert_eq!(executor.count("CREATE FACT TABLE"), 1);

  let external = submitted
    .iter()
    .find(|sql| sql.starts_with("CREATE EXTERNAL TABLE"))
    .unwrap();
  assert!(external.contains("URL = 's3://sales-staging/'"));
  assert!(external.contains("AWS_KEY_ID = 'AKIAEXAMPLE'"));

  // Secrets never reach the serialized report.
  let json = serde_json::to_string(&report).unwrap();
  assert!(!json.contains("s3cr3t"));
  assert!(!json.contains("hunter2"));
}

#[tokio::test(start_paused = true)]
async fn test_upload_recovers_after_two_transient_failures() {
  let fixture = fixture(CSV);
  let store = Arc::new(MemoryStore::failing_with(vec![
    StoreError::transient("503 slow down"),
    StoreError::transient("connection reset"),
  ]));
  let executor = Arc::new(RecordingExecutor::default());

  let report = SalesLoad::new(store.clone(), executor.clone())
    .unwrap()
    .run(&fixture.parameters, &fixture.secrets)
    .await
    .unwrap();

  assert!(report.succeeded);
  assert_eq!(store.puts(), 3);
  assert_eq!(report.node(nodes::UPLOAD_PARQUET).unwrap().attempts, 3);
  assert_eq!(
    report.status(nodes::INSERT_INTO_FACT_TABLE),
    Some(NodeStatus::Succeeded)
  );
}

#[tokio::test(start_paused = true)]
async fn test_upload_exhausting_retries_skips_insert() {
  let fixture = fixture(CSV);
  let store = Arc::new(MemoryStore::failing_with(vec![
    StoreError::transient("timeout"),
    StoreError::transient("timeout"),
    StoreError::transient("timeout"),
  ]));
  let executor = Arc::new(RecordingExecutor::default());

  let report = SalesLoad::new(store.clone(), executor.clone())
    .unwrap()
    .run(&fixture.parameters, &fixture.secrets)
    .await
    .unwrap();

  assert!(!report.succeeded);
  assert_eq!(store.puts(), 3);

  let upload = report.node(nodes::UPLOAD_PARQUET).unwrap();
  assert_eq!(upload.status, NodeStatus::Failed);
  assert_eq!(upload.failure.as_ref().unwrap().kind, FailureKind::Transient);

  let insert = report.node(nodes::INSERT_INTO_FACT_TABLE).unwrap();
  assert_eq!(insert.status, NodeStatus::Skipped);
  assert_eq!(insert.skipped_because.as_deref(), Some(nodes::UPLOAD_PARQUET));
  assert_eq!(executor.count("INSERT"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_external_table_fatal_failure() {
  let fixture = fixture(CSV);
  let store = Arc::new(MemoryStore::default());
  let executor = Arc::new(RecordingExecutor::failing(
    "CREATE EXTERNAL TABLE",
    vec![QueryError::fatal("access denied to s3://sales-staging/")],
  ));

  let report = SalesLoad::new(store.clone(), executor.clone())
    .unwrap()
    .run(&fixture.parameters, &fixture.secrets)
    .await
    .unwrap();

  assert!(!report.succeeded);

  let external = report.node(nodes::CREATE_EXTERNAL_TABLE).unwrap();
  assert_eq!(external.status, NodeStatus::Failed);
  assert_eq!(external.attempts, 1);
  assert_eq!(external.failure.as_ref().unwrap().kind, FailureKind::Fatal);

  assert_eq!(
    report.status(nodes::CREATE_FACT_TABLE),
    Some(NodeStatus::Succeeded)
  );
  assert_eq!(
    report.status(nodes::UPLOAD_PARQUET),
    Some(NodeStatus::Succeeded)
  );
  assert_eq!(
    report.status(nodes::INSERT_INTO_FACT_TABLE),
    Some(NodeStatus::Skipped)
  );
  assert_eq!(executor.count("CREATE EXTERNAL TABLE"), 1);
  assert_eq!(executor.count("CREATE FACT TABLE"), 1);
  assert_eq!(executor.count("INSERT"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_transient_query_failure_is_retried() {
  let fixture = fixture(CSV);
  let store = Arc::new(MemoryStore::default());
  let executor = Arc::new(RecordingExecutor::failing(
    "INSERT INTO",
    vec![QueryError::transient("engine is starting")],
  ));

  let report = SalesLoad::new(store, executor.clone())
    .unwrap()
    .run(&fixture.parameters, &fixture.secrets)
    .await
    .unwrap();

  assert!(report.succeeded);
  assert_eq!(report.node(nodes::INSERT_INTO_FACT_TABLE).unwrap().attempts, 2);
  assert_eq!(executor.count("INSERT INTO"), 2);
}

#[tokio::test]
async fn test_malformed_csv_fails_conversion_once() {
  let fixture = fixture("transaction_number,price\nT1,abc\n");
  let store = Arc::new(MemoryStore::default());
  let executor = Arc::new(RecordingExecutor::default());

  let report = SalesLoad::new(store.clone(), executor.clone())
    .unwrap()
    .run(&fixture.parameters, &fixture.secrets)
    .await
    .unwrap();

  assert!(!report.succeeded);

  let convert = report.node(nodes::CONVERT_CSV_TO_PARQUET).unwrap();
  assert_eq!(convert.status, NodeStatus::Failed);
  assert_eq!(convert.attempts, 1);
  assert!(convert.failure.as_ref().unwrap().message.contains("missing columns"));

  assert_eq!(
    report.status(nodes::UPLOAD_PARQUET),
    Some(NodeStatus::Skipped)
  );
  assert_eq!(
    report.status(nodes::INSERT_INTO_FACT_TABLE),
    Some(NodeStatus::Skipped)
  );
  assert_eq!(store.puts(), 0);
  // The table-creation branches do not depend on the conversion.
  assert_eq!(executor.count("CREATE"), 2);
}

#[tokio::test]
async fn test_missing_parameter_stops_before_any_node() {
  let mut fixture = fixture(CSV);
  let mut parameters = Parameters::new();
  for (name, value) in fixture.parameters.iter() {
    if name != params::FACT_TABLE_NAME {
      parameters.insert(name, value);
    }
  }
  fixture.parameters = parameters;

  let store = Arc::new(MemoryStore::default());
  let executor = Arc::new(RecordingExecutor::default());

  let err = SalesLoad::new(store.clone(), executor.clone())
    .unwrap()
    .run(&fixture.parameters, &fixture.secrets)
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    PipelineError::Config(ConfigError::MissingParameter { ref name }) if name == "fact_table_name"
  ));
  assert_eq!(store.puts(), 0);
  assert!(executor.submitted().is_empty());
}

#[tokio::test]
async fn test_malformed_aws_bundle_stops_before_any_node() {
  let mut fixture = fixture(CSV);
  fixture.secrets = fixture
    .secrets
    .clone()
    .with(secrets::AWS_CREDENTIALS, "not json");

  let executor = Arc::new(RecordingExecutor::default());
  let err = SalesLoad::new(Arc::new(MemoryStore::default()), executor.clone())
    .unwrap()
    .run(&fixture.parameters, &fixture.secrets)
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    PipelineError::Config(ConfigError::InvalidSecret { .. })
  ));
  assert!(!err.to_string().contains("not json"));
  assert!(executor.submitted().is_empty());
}

#[test]
fn test_graph_shape() {
  let load = SalesLoad::new(
    Arc::new(MemoryStore::default()),
    Arc::new(RecordingExecutor::default()),
  )
  .unwrap();
  let workflow = load.workflow();

  assert_eq!(workflow.len(), 5);

  let graph = workflow.graph();
  for id in [
    nodes::CONVERT_CSV_TO_PARQUET,
    nodes::CREATE_EXTERNAL_TABLE,
    nodes::CREATE_FACT_TABLE,
  ] {
    assert!(graph.upstream(id).is_empty(), "{id}");
  }
  assert_eq!(
    graph.upstream(nodes::UPLOAD_PARQUET),
    [nodes::CONVERT_CSV_TO_PARQUET.to_string()]
  );
  assert_eq!(
    graph.upstream(nodes::INSERT_INTO_FACT_TABLE),
    [
      nodes::UPLOAD_PARQUET.to_string(),
      nodes::CREATE_EXTERNAL_TABLE.to_string(),
      nodes::CREATE_FACT_TABLE.to_string(),
    ]
  );

  let convert = workflow.get_node(nodes::CONVERT_CSV_TO_PARQUET).unwrap();
  assert_eq!(convert.retry.max_attempts(), 1);

  for id in [
    nodes::UPLOAD_PARQUET,
    nodes::CREATE_EXTERNAL_TABLE,
    nodes::CREATE_FACT_TABLE,
    nodes::INSERT_INTO_FACT_TABLE,
  ] {
    let node = workflow.get_node(id).unwrap();
    assert_eq!(node.retry.max_attempts(), 3, "{id}");
    assert_eq!(node.retry.retry_delay(), std::time::Duration::from_secs(5), "{id}");
  }
}
