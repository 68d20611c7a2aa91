//! Run result types.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use sluice_task::TaskOutput;

use crate::status::{NodeFailure, NodeStatus};

/// Terminal state of a single node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
  pub node_id: String,
  pub status: NodeStatus,
  /// Number of times the node's work was invoked. Zero for skipped nodes.
  pub attempts: u32,
  pub depends_on: Vec<String>,
  /// Summary of the success value.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub output: Option<serde_json::Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub failure: Option<NodeFailure>,
  /// The failed or skipped upstream node that prevented this node from running.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub skipped_because: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<u64>,
}

/// Result of one complete run.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunReport {
  pub run_id: String,
  pub workflow: String,
  /// True when no node ended `failed`.
  pub succeeded: bool,
  /// Reports of all nodes, keyed by node_id.
  pub nodes: BTreeMap<String, NodeReport>,
  /// Full success values, keyed by node_id.
  #[serde(skip)]
  pub(crate) outputs: HashMap<String, TaskOutput>,
}

impl RunReport {
  pub fn node(&self, node_id: &str) -> Option<&NodeReport> {
    self.nodes.get(node_id)
  }

  pub fn status(&self, node_id: &str) -> Option<NodeStatus> {
    self.node(node_id).map(|node| node.status)
  }

  /// Success value of a node.
  pub fn output(&self, node_id: &str) -> Option<&TaskOutput> {
    self.outputs.get(node_id)
  }

  /// Number of nodes in the given status.
  pub fn count(&self, status: NodeStatus) -> usize {
    self
      .nodes
      .values()
      .filter(|node| node.status == status)
      .count()
  }

  /// Ids of nodes in the given status, sorted.
  pub fn nodes_with(&self, status: NodeStatus) -> Vec<&str> {
    self
      .nodes
      .values()
      .filter(|node| node.status == status)
      .map(|node| node.node_id.as_str())
      .collect()
  }
}
