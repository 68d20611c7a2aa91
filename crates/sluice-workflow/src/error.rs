use thiserror::Error;

/// Graph definition errors. Raised by `define`, before anything executes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
  #[error("duplicate node id: {node_id}")]
  DuplicateNode { node_id: String },

  #[error("node '{node_id}' depends on unknown node '{dependency}'")]
  UnknownDependency { node_id: String, dependency: String },
}
