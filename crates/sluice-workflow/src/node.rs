use std::fmt;
use std::sync::Arc;

use sluice_task::Task;

use crate::retry::RetryPolicy;

/// A registered graph node.
#[derive(Clone)]
pub struct Node {
  pub node_id: String,
  pub task: Arc<dyn Task>,
  /// Upstream node ids, deduplicated, in declaration order.
  pub depends_on: Vec<String>,
  pub retry: RetryPolicy,
}

impl fmt::Debug for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Node")
      .field("node_id", &self.node_id)
      .field("depends_on", &self.depends_on)
      .field("retry", &self.retry)
      .finish_non_exhaustive()
  }
}
