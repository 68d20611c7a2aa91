//! Task contract for sluice.
//!
//! A [`Task`] is the unit of work behind a graph node. The orchestrator hands
//! it a [`TaskContext`] per attempt and expects either a [`TaskOutput`] or a
//! [`TaskError`]. The error kind decides the retry behavior: transient errors
//! are retried according to the node's policy, fatal errors never are.

mod context;
mod error;
mod output;
mod task;

pub use context::TaskContext;
pub use error::TaskError;
pub use output::TaskOutput;
pub use task::{FnTask, Task, task_fn};
