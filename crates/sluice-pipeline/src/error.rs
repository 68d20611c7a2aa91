use sluice_config::ConfigError;
use sluice_workflow::WorkflowError;
use thiserror::Error;

/// Errors that stop the flow before any node runs.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("invalid workflow definition: {0}")]
  Workflow(#[from] WorkflowError),
}
