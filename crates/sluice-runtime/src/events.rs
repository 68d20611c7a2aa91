//! Execution events and notifiers for observability.
//!
//! Events are emitted during a run so consumers can observe progress, stream
//! it to a UI, persist it, etc.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  RunStarted {
    run_id: String,
    workflow: String,
  },

  /// A node attempt has started.
  NodeStarted {
    run_id: String,
    node_id: String,
    attempt: u32,
  },

  /// A node attempt failed transiently and will be retried after `delay_ms`.
  NodeRetrying {
    run_id: String,
    node_id: String,
    attempt: u32,
    delay_ms: u64,
    error: String,
  },

  NodeSucceeded {
    run_id: String,
    node_id: String,
    attempts: u32,
  },

  NodeFailed {
    run_id: String,
    node_id: String,
    attempts: u32,
    error: String,
  },

  NodeSkipped {
    run_id: String,
    node_id: String,
    upstream: String,
  },

  RunCompleted {
    run_id: String,
    succeeded: bool,
  },
}

/// Trait for receiving execution events.
///
/// The orchestrator calls `notify` for each event, possibly from several
/// worker tasks at once.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Event volume is a handful per node, so an unbounded channel never blocks
  // the orchestrator on a slow consumer.
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with its receiving end.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
