//! Per-attempt execution context.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use sluice_config::{Parameters, Secrets};

use crate::error::TaskError;
use crate::output::TaskOutput;

/// Everything a task attempt may read.
///
/// Parameters and secrets are shared, read-only, across all nodes of a run.
/// `upstream` holds the outputs of the node's declared upstream nodes only.
#[derive(Debug, Clone)]
pub struct TaskContext {
  /// Run this attempt belongs to.
  pub run_id: String,
  /// Node being executed.
  pub node_id: String,
  /// 1-based attempt number.
  pub attempt: u32,
  parameters: Arc<Parameters>,
  secrets: Arc<Secrets>,
  upstream: Arc<HashMap<String, TaskOutput>>,
}

impl TaskContext {
  pub fn new(
    run_id: impl Into<String>,
    node_id: impl Into<String>,
    attempt: u32,
    parameters: Arc<Parameters>,
    secrets: Arc<Secrets>,
    upstream: Arc<HashMap<String, TaskOutput>>,
  ) -> Self {
    Self {
      run_id: run_id.into(),
      node_id: node_id.into(),
      attempt,
      parameters,
      secrets,
      upstream,
    }
  }

  pub fn parameters(&self) -> &Parameters {
    &self.parameters
  }

  pub fn secrets(&self) -> &Secrets {
    &self.secrets
  }

  /// Get a required parameter. A missing parameter is a fatal task error.
  pub fn parameter(&self, name: &str) -> Result<&str, TaskError> {
    Ok(self.parameters.require(name)?)
  }

  /// Output of a direct upstream node.
  pub fn upstream(&self, node_id: &str) -> Option<&TaskOutput> {
    self.upstream.get(node_id)
  }

  /// Binary output of a direct upstream node.
  pub fn upstream_bytes(&self, node_id: &str) -> Result<Bytes, TaskError> {
    match self.upstream(node_id) {
      Some(TaskOutput::Bytes(bytes)) => Ok(bytes.clone()),
      Some(_) => Err(TaskError::fatal(format!(
        "upstream node '{}' did not produce a binary payload",
        node_id
      ))),
      None => Err(TaskError::fatal(format!(
        "no output from upstream node '{}'",
        node_id
      ))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn context_with(upstream: HashMap<String, TaskOutput>) -> TaskContext {
    TaskContext::new(
      "run-1",
      "upload",
      1,
      Arc::new(Parameters::new().with("s3_bucket", "staging")),
      Arc::new(Secrets::new()),
      Arc::new(upstream),
    )
  }

  #[test]
  fn test_upstream_bytes() {
    let ctx = context_with(HashMap::from([(
      "convert".to_string(),
      TaskOutput::Bytes(Bytes::from_static(b"PAR1")),
    )]));

    assert_eq!(ctx.upstream_bytes("convert").unwrap(), Bytes::from_static(b"PAR1"));
  }

  #[test]
  fn test_upstream_bytes_wrong_kind_is_fatal() {
    let ctx = context_with(HashMap::from([("convert".to_string(), TaskOutput::Empty)]));

    let err = ctx.upstream_bytes("convert").unwrap_err();
    assert!(!err.is_retryable());
  }

  #[test]
  fn test_missing_upstream_is_fatal() {
    let ctx = context_with(HashMap::new());
    assert!(matches!(
      ctx.upstream_bytes("convert"),
      Err(TaskError::Fatal { .. })
    ));
  }

  #[test]
  fn test_missing_parameter_is_fatal() {
    let ctx = context_with(HashMap::new());

    assert_eq!(ctx.parameter("s3_bucket").unwrap(), "staging");
    let err = ctx.parameter("fact_table_name").unwrap_err();
    assert!(matches!(err, TaskError::Fatal { .. }));
    assert!(err.message().contains("fact_table_name"));
  }
}
