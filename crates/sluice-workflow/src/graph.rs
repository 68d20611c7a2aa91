use std::collections::{HashMap, HashSet};

use crate::node::Node;

/// Graph structure for traversal and analysis.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Adjacency list: node_id -> list of downstream node_ids.
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: node_id -> list of upstream node_ids.
  reverse_adjacency: HashMap<String, Vec<String>>,
}

impl Graph {
  /// Build a graph from registered nodes, in registration order.
  pub fn new(nodes: &[Node]) -> Self {
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();

    // Initialize all nodes
    for node in nodes {
      adjacency.entry(node.node_id.clone()).or_default();
      reverse_adjacency.entry(node.node_id.clone()).or_default();
    }

    for node in nodes {
      for upstream in &node.depends_on {
        adjacency
          .entry(upstream.clone())
          .or_default()
          .push(node.node_id.clone());
        reverse_adjacency
          .entry(node.node_id.clone())
          .or_default()
          .push(upstream.clone());
      }
    }

    Self {
      adjacency,
      reverse_adjacency,
    }
  }

  /// Get downstream nodes for a given node.
  pub fn downstream(&self, node_id: &str) -> &[String] {
    self
      .adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get upstream nodes for a given node.
  pub fn upstream(&self, node_id: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// All transitive dependents of a node, excluding the node itself.
  pub fn descendants(&self, node_id: &str) -> HashSet<String> {
    let mut seen = HashSet::new();
    let mut stack: Vec<&str> = self.downstream(node_id).iter().map(String::as_str).collect();

    while let Some(id) = stack.pop() {
      if seen.insert(id.to_string()) {
        stack.extend(self.downstream(id).iter().map(String::as_str));
      }
    }

    seen
  }
}
