//! Node lifecycle states.

use serde::{Deserialize, Serialize};
use sluice_task::TaskError;

/// Status of a node within one run.
///
/// ```text
/// pending -> waiting -> running -> succeeded
///                          |  ^
///                          v  |
///                        retrying
///                          |
///                          v
///                        failed ---> (dependents) skipped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
  Pending,
  /// At least one upstream node has not finished yet.
  Waiting,
  Running,
  /// A transient failure occurred; sleeping before the next attempt.
  Retrying,
  Succeeded,
  Failed,
  /// Never started because an upstream node failed or was skipped.
  Skipped,
}

impl NodeStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
  }
}

/// Why a node failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
  /// Transient failures until the retry policy ran out of attempts.
  Transient,
  /// A non-retryable failure.
  Fatal,
  /// The task panicked.
  Panicked,
}

/// Terminal failure cause recorded for a failed node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFailure {
  pub kind: FailureKind,
  pub message: String,
}

impl NodeFailure {
  pub(crate) fn panicked(message: impl Into<String>) -> Self {
    Self {
      kind: FailureKind::Panicked,
      message: message.into(),
    }
  }
}

impl From<&TaskError> for NodeFailure {
  fn from(err: &TaskError) -> Self {
    let kind = if err.is_retryable() {
      FailureKind::Transient
    } else {
      FailureKind::Fatal
    };
    Self {
      kind,
      message: err.message().to_string(),
    }
  }
}
