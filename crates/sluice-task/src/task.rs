use std::future::Future;

use async_trait::async_trait;

use crate::context::TaskContext;
use crate::error::TaskError;
use crate::output::TaskOutput;

/// A unit of work executed by a graph node.
///
/// `execute` is called once per attempt, so implementations must tolerate
/// being invoked again after a transient failure.
#[async_trait]
pub trait Task: Send + Sync {
  async fn execute(&self, ctx: TaskContext) -> Result<TaskOutput, TaskError>;
}

/// A [`Task`] backed by an async closure.
pub struct FnTask<F> {
  f: F,
}

/// Wrap an async closure as a [`Task`].
///
/// ```ignore
/// let task = task_fn(|ctx| async move {
///   Ok(TaskOutput::Value(serde_json::json!({ "node": ctx.node_id })))
/// });
/// ```
pub fn task_fn<F, Fut>(f: F) -> FnTask<F>
where
  F: Fn(TaskContext) -> Fut + Send + Sync,
  Fut: Future<Output = Result<TaskOutput, TaskError>> + Send + 'static,
{
  FnTask { f }
}

#[async_trait]
impl<F, Fut> Task for FnTask<F>
where
  F: Fn(TaskContext) -> Fut + Send + Sync,
  Fut: Future<Output = Result<TaskOutput, TaskError>> + Send + 'static,
{
  async fn execute(&self, ctx: TaskContext) -> Result<TaskOutput, TaskError> {
    (self.f)(ctx).await
  }
}
