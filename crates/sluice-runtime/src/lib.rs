//! Sluice Runtime
//!
//! This crate executes a [`Workflow`](sluice_workflow::Workflow) defined with
//! `sluice-workflow`. The [`Orchestrator`] owns the workflow and provides
//! `run(parameters, secrets)`:
//!
//! - nodes start only after every upstream node has succeeded
//! - ready nodes run concurrently on a bounded worker pool
//! - transient failures are retried per node, fatal failures are not
//! - a failed node marks all of its transitive dependents as skipped
//!
//! A run never returns an opaque error; the [`RunReport`] records the terminal
//! status of every node so callers can see which stage broke and why.

mod events;
mod report;
mod runtime;
mod status;

pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use report::{NodeReport, RunReport};
pub use runtime::{Orchestrator, RuntimeConfig};
pub use status::{FailureKind, NodeFailure, NodeStatus};
