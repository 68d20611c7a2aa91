use std::collections::HashMap;
use std::sync::Arc;

use sluice_task::Task;

use crate::error::WorkflowError;
use crate::graph::Graph;
use crate::node::Node;
use crate::retry::RetryPolicy;

/// A validated task graph ready for execution.
#[derive(Debug, Clone)]
pub struct Workflow {
  name: String,
  /// Nodes in registration order.
  nodes: Vec<Node>,
  /// node_id -> index into `nodes`.
  index: HashMap<String, usize>,
}

impl Workflow {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      nodes: Vec::new(),
      index: HashMap::new(),
    }
  }

  /// Register a node that runs once with no retries.
  pub fn define<T>(
    &mut self,
    node_id: impl Into<String>,
    task: T,
    depends_on: &[&str],
  ) -> Result<&mut Self, WorkflowError>
  where
    T: Task + 'static,
  {
    self.define_with_retry(node_id, task, depends_on, RetryPolicy::once())
  }

  /// Register a node with an explicit retry policy.
  ///
  /// Every id in `depends_on` must already be registered.
  pub fn define_with_retry<T>(
    &mut self,
    node_id: impl Into<String>,
    task: T,
    depends_on: &[&str],
    retry: RetryPolicy,
  ) -> Result<&mut Self, WorkflowError>
  where
    T: Task + 'static,
  {
    self.define_node(node_id.into(), Arc::new(task), depends_on, retry)
  }

  /// Register a node whose task is already shared.
  pub fn define_node(
    &mut self,
    node_id: String,
    task: Arc<dyn Task>,
    depends_on: &[&str],
    retry: RetryPolicy,
  ) -> Result<&mut Self, WorkflowError> {
    if self.index.contains_key(&node_id) {
      return Err(WorkflowError::DuplicateNode { node_id });
    }

    let mut upstream: Vec<String> = Vec::with_capacity(depends_on.len());
    for dependency in depends_on {
      if !self.index.contains_key(*dependency) {
        return Err(WorkflowError::UnknownDependency {
          node_id,
          dependency: dependency.to_string(),
        });
      }
      if !upstream.iter().any(|id| id == *dependency) {
        upstream.push(dependency.to_string());
      }
    }

    self.index.insert(node_id.clone(), self.nodes.len());
    self.nodes.push(Node {
      node_id,
      task,
      depends_on: upstream,
      retry,
    });

    Ok(self)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Nodes in registration (topological) order.
  pub fn nodes(&self) -> &[Node] {
    &self.nodes
  }

  /// Get a node by ID.
  pub fn get_node(&self, node_id: &str) -> Option<&Node> {
    self.index.get(node_id).map(|&i| &self.nodes[i])
  }

  pub fn contains(&self, node_id: &str) -> bool {
    self.index.contains_key(node_id)
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Build the graph structure for traversal.
  pub fn graph(&self) -> Graph {
    Graph::new(&self.nodes)
  }
}
