//! Orchestrator.
//!
//! The [`Orchestrator`] owns a workflow and executes it with
//! `run(parameters, secrets)`. Each ready node is spawned on a [`JoinSet`];
//! a [`Semaphore`] bounds how many of them do work at once. The scheduler
//! wakes whenever a node finishes and records the result. A failure skips
//! every transitive dependent at once; a success launches whatever became
//! ready.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use sluice_config::{Parameters, Secrets};
use sluice_task::{TaskContext, TaskOutput};
use sluice_workflow::{Graph, Node, Workflow};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::report::{NodeReport, RunReport};
use crate::status::{NodeFailure, NodeStatus};

/// Configuration for the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
  /// Maximum number of nodes doing work at the same time.
  pub max_concurrency: usize,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self { max_concurrency: 4 }
  }
}

/// Mutable per-node state for one run.
#[derive(Debug, Clone)]
struct NodeState {
  status: NodeStatus,
  attempts: u32,
  failure: Option<NodeFailure>,
  skipped_because: Option<String>,
  duration: Option<Duration>,
}

impl NodeState {
  fn pending() -> Self {
    Self {
      status: NodeStatus::Pending,
      attempts: 0,
      failure: None,
      skipped_because: None,
      duration: None,
    }
  }
}

/// Node status table shared between the scheduler and running nodes.
#[derive(Debug, Clone)]
struct StatusTable {
  inner: Arc<Mutex<HashMap<String, NodeState>>>,
}

impl StatusTable {
  fn new(workflow: &Workflow) -> Self {
    let states = workflow
      .nodes()
      .iter()
      .map(|node| (node.node_id.clone(), NodeState::pending()))
      .collect();
    Self {
      inner: Arc::new(Mutex::new(states)),
    }
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, NodeState>> {
    // A panicking writer cannot leave a state half-updated; every write is a
    // plain field assignment.
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn update(&self, node_id: &str, f: impl FnOnce(&mut NodeState)) {
    if let Some(state) = self.lock().get_mut(node_id) {
      f(state);
    }
  }
}

/// How a launched node ended.
enum Outcome {
  Succeeded(TaskOutput),
  Failed(NodeFailure),
}

/// Message from a finished node back to the scheduler.
struct Completion {
  node_id: String,
  attempts: u32,
  elapsed: Duration,
  outcome: Outcome,
}

/// The workflow orchestrator.
///
/// Generic over `N: ExecutionNotifier` to allow different notification
/// strategies. Use [`Orchestrator::new`] for no-op notifications or
/// [`Orchestrator::with_notifier`] to observe events.
pub struct Orchestrator<N: ExecutionNotifier = NoopNotifier> {
  workflow: Workflow,
  graph: Graph,
  config: RuntimeConfig,
  notifier: Arc<N>,
}

impl Orchestrator<NoopNotifier> {
  pub fn new(workflow: Workflow, config: RuntimeConfig) -> Self {
    Self::with_notifier(workflow, config, NoopNotifier)
  }
}

impl<N: ExecutionNotifier + 'static> Orchestrator<N> {
  pub fn with_notifier(workflow: Workflow, config: RuntimeConfig, notifier: N) -> Self {
    let graph = workflow.graph();
    Self {
      workflow,
      graph,
      config,
      notifier: Arc::new(notifier),
    }
  }

  /// Get a reference to the workflow.
  pub fn workflow(&self) -> &Workflow {
    &self.workflow
  }

  /// Execute the graph to completion.
  ///
  /// Parameters and secrets are copied once into shared, read-only storage
  /// visible to every node.
  #[instrument(
    name = "orchestrator_run",
    skip(self, parameters, secrets),
    fields(workflow = %self.workflow.name())
  )]
  pub async fn run(&self, parameters: &Parameters, secrets: &Secrets) -> RunReport {
    let run_id = uuid::Uuid::new_v4().to_string();
    let parameters = Arc::new(parameters.clone());
    let secrets = Arc::new(secrets.clone());

    info!(
      run_id = %run_id,
      nodes = self.workflow.len(),
      "run_started"
    );
    self.notifier.notify(ExecutionEvent::RunStarted {
      run_id: run_id.clone(),
      workflow: self.workflow.name().to_string(),
    });

    let table = StatusTable::new(&self.workflow);
    let workers = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
    let mut outputs: HashMap<String, TaskOutput> = HashMap::new();
    let mut launched: HashSet<String> = HashSet::new();
    let mut in_flight: JoinSet<Completion> = JoinSet::new();

    loop {
      for node in self.advance(&table, &launched) {
        launched.insert(node.node_id.clone());

        let upstream: HashMap<String, TaskOutput> = self
          .graph
          .upstream(&node.node_id)
          .iter()
          .filter_map(|id| outputs.get(id).map(|output| (id.clone(), output.clone())))
          .collect();

        let job = NodeJob {
          run_id: run_id.clone(),
          node,
          parameters: parameters.clone(),
          secrets: secrets.clone(),
          upstream: Arc::new(upstream),
          table: table.clone(),
          workers: workers.clone(),
          notifier: self.notifier.clone(),
        };
        in_flight.spawn(job.run());
      }

      let Some(joined) = in_flight.join_next().await else {
        break;
      };

      match joined {
        Ok(completion) => self.record_completion(&run_id, &table, completion, &mut outputs),
        Err(e) => {
          error!(run_id = %run_id, error = %e, "node_join_failed");
        }
      }
    }

    self.fail_abandoned(&run_id, &table);
    let report = self.build_report(run_id, &table, outputs);

    info!(
      run_id = %report.run_id,
      succeeded = report.succeeded,
      nodes_succeeded = report.count(NodeStatus::Succeeded),
      nodes_failed = report.count(NodeStatus::Failed),
      nodes_skipped = report.count(NodeStatus::Skipped),
      "run_completed"
    );
    self.notifier.notify(ExecutionEvent::RunCompleted {
      run_id: report.run_id.clone(),
      succeeded: report.succeeded,
    });

    report
  }

  /// Nodes whose upstreams have all succeeded and that were not launched
  /// yet. Everything else still open is marked waiting.
  fn advance(&self, table: &StatusTable, launched: &HashSet<String>) -> Vec<Node> {
    let mut states = table.lock();
    let mut ready = Vec::new();

    for node in self.workflow.nodes() {
      if launched.contains(&node.node_id) {
        continue;
      }
      let is_terminal = states
        .get(&node.node_id)
        .is_none_or(|state| state.status.is_terminal());
      if is_terminal {
        continue;
      }

      let all_succeeded = self.graph.upstream(&node.node_id).iter().all(|up| {
        states
          .get(up)
          .is_some_and(|state| state.status == NodeStatus::Succeeded)
      });

      if all_succeeded {
        ready.push(node.clone());
      } else if let Some(state) = states.get_mut(&node.node_id) {
        state.status = NodeStatus::Waiting;
      }
    }

    ready
  }

  /// Skip every transitive dependent of a node that just failed.
  ///
  /// Dependents are visited in registration order, which is topological, so
  /// each one names its nearest upstream that failed or was skipped.
  fn skip_dependents(&self, run_id: &str, table: &StatusTable, failed: &str) {
    let dependents = self.graph.descendants(failed);
    if dependents.is_empty() {
      return;
    }

    let mut skipped = Vec::new();
    {
      let mut states = table.lock();
      for node in self.workflow.nodes() {
        if !dependents.contains(&node.node_id) {
          continue;
        }
        let is_terminal = states
          .get(&node.node_id)
          .is_none_or(|state| state.status.is_terminal());
        if is_terminal {
          continue;
        }

        let blocked_by = self
          .graph
          .upstream(&node.node_id)
          .iter()
          .find(|up| {
            states
              .get(*up)
              .is_some_and(|state| matches!(state.status, NodeStatus::Failed | NodeStatus::Skipped))
          })
          .cloned();
        let Some(upstream) = blocked_by else {
          continue;
        };

        if let Some(state) = states.get_mut(&node.node_id) {
          state.status = NodeStatus::Skipped;
          state.skipped_because = Some(upstream.clone());
        }
        skipped.push((node.node_id.clone(), upstream));
      }
    }

    self.report_skips(run_id, skipped);
  }

  fn report_skips(&self, run_id: &str, skipped: Vec<(String, String)>) {
    for (node_id, upstream) in skipped {
      warn!(
        run_id = %run_id,
        node_id = %node_id,
        upstream = %upstream,
        "node_skipped"
      );
      self.notifier.notify(ExecutionEvent::NodeSkipped {
        run_id: run_id.to_string(),
        node_id,
        upstream,
      });
    }
  }

  fn record_completion(
    &self,
    run_id: &str,
    table: &StatusTable,
    completion: Completion,
    outputs: &mut HashMap<String, TaskOutput>,
  ) {
    let Completion {
      node_id,
      attempts,
      elapsed,
      outcome,
    } = completion;

    match outcome {
      Outcome::Succeeded(output) => {
        table.update(&node_id, |state| {
          state.status = NodeStatus::Succeeded;
          state.attempts = attempts;
          state.duration = Some(elapsed);
        });
        info!(
          run_id = %run_id,
          node_id = %node_id,
          attempts,
          output = %output.summary(),
          "node_succeeded"
        );
        self.notifier.notify(ExecutionEvent::NodeSucceeded {
          run_id: run_id.to_string(),
          node_id: node_id.clone(),
          attempts,
        });
        outputs.insert(node_id, output);
      }
      Outcome::Failed(failure) => {
        error!(
          run_id = %run_id,
          node_id = %node_id,
          attempts,
          kind = ?failure.kind,
          error = %failure.message,
          "node_failed"
        );
        self.notifier.notify(ExecutionEvent::NodeFailed {
          run_id: run_id.to_string(),
          node_id: node_id.clone(),
          attempts,
          error: failure.message.clone(),
        });
        table.update(&node_id, |state| {
          state.status = NodeStatus::Failed;
          state.attempts = attempts;
          state.failure = Some(failure);
          state.duration = Some(elapsed);
        });
        self.skip_dependents(run_id, table, &node_id);
      }
    }
  }

  /// Fail nodes whose worker vanished without reporting back, then skip
  /// their dependents.
  fn fail_abandoned(&self, run_id: &str, table: &StatusTable) {
    let abandoned: Vec<String> = {
      let mut states = table.lock();
      states
        .iter_mut()
        .filter(|(_, state)| matches!(state.status, NodeStatus::Running | NodeStatus::Retrying))
        .map(|(node_id, state)| {
          state.status = NodeStatus::Failed;
          state.failure = Some(NodeFailure::panicked("worker terminated before reporting"));
          node_id.clone()
        })
        .collect()
    };

    if abandoned.is_empty() {
      return;
    }
    error!(run_id = %run_id, nodes = ?abandoned, "nodes_abandoned");

    for node_id in &abandoned {
      self.skip_dependents(run_id, table, node_id);
    }
  }

  fn build_report(
    &self,
    run_id: String,
    table: &StatusTable,
    outputs: HashMap<String, TaskOutput>,
  ) -> RunReport {
    let states = table.lock();

    let nodes = self
      .workflow
      .nodes()
      .iter()
      .map(|node| {
        let state = states
          .get(&node.node_id)
          .cloned()
          .unwrap_or_else(NodeState::pending);
        let report = NodeReport {
          node_id: node.node_id.clone(),
          status: state.status,
          attempts: state.attempts,
          depends_on: node.depends_on.clone(),
          output: outputs.get(&node.node_id).map(TaskOutput::summary),
          failure: state.failure,
          skipped_because: state.skipped_because,
          duration_ms: state.duration.map(|d| d.as_millis() as u64),
        };
        (node.node_id.clone(), report)
      })
      .collect::<std::collections::BTreeMap<_, _>>();

    let succeeded = nodes
      .values()
      .all(|node| node.status != NodeStatus::Failed);

    RunReport {
      run_id,
      workflow: self.workflow.name().to_string(),
      succeeded,
      nodes,
      outputs,
    }
  }
}

/// Everything a spawned node needs, owned so the future is `'static`.
struct NodeJob<N> {
  run_id: String,
  node: Node,
  parameters: Arc<Parameters>,
  secrets: Arc<Secrets>,
  upstream: Arc<HashMap<String, TaskOutput>>,
  table: StatusTable,
  workers: Arc<Semaphore>,
  notifier: Arc<N>,
}

impl<N: ExecutionNotifier> NodeJob<N> {
  /// Run attempts until success, a fatal error, or the retry policy is spent.
  async fn run(self) -> Completion {
    // The semaphore is never closed, so acquisition only fails if that changes.
    let _permit = self.workers.clone().acquire_owned().await.ok();
    let started = Instant::now();
    let policy = self.node.retry;
    let mut attempt = 0;

    let outcome = loop {
      attempt += 1;
      self.table.update(&self.node.node_id, |state| {
        state.status = NodeStatus::Running;
        state.attempts = attempt;
      });
      info!(
        run_id = %self.run_id,
        node_id = %self.node.node_id,
        attempt,
        max_attempts = policy.max_attempts(),
        "node_started"
      );
      self.notifier.notify(ExecutionEvent::NodeStarted {
        run_id: self.run_id.clone(),
        node_id: self.node.node_id.clone(),
        attempt,
      });

      let ctx = TaskContext::new(
        self.run_id.clone(),
        self.node.node_id.clone(),
        attempt,
        self.parameters.clone(),
        self.secrets.clone(),
        self.upstream.clone(),
      );

      let result = AssertUnwindSafe(self.node.task.execute(ctx))
        .catch_unwind()
        .await;

      match result {
        Ok(Ok(output)) => break Outcome::Succeeded(output),
        Ok(Err(err)) if err.is_retryable() && policy.allows_retry_after(attempt) => {
          let delay = policy.retry_delay();
          self.table.update(&self.node.node_id, |state| {
            state.status = NodeStatus::Retrying;
          });
          warn!(
            run_id = %self.run_id,
            node_id = %self.node.node_id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "node_retrying"
          );
          self.notifier.notify(ExecutionEvent::NodeRetrying {
            run_id: self.run_id.clone(),
            node_id: self.node.node_id.clone(),
            attempt,
            delay_ms: delay.as_millis() as u64,
            error: err.to_string(),
          });
          tokio::time::sleep(delay).await;
        }
        Ok(Err(err)) => break Outcome::Failed(NodeFailure::from(&err)),
        Err(panic) => break Outcome::Failed(NodeFailure::panicked(panic_message(&*panic))),
      }
    };

    Completion {
      node_id: self.node.node_id,
      attempts: attempt,
      elapsed: started.elapsed(),
      outcome,
    }
  }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  if let Some(message) = panic.downcast_ref::<&str>() {
    format!("task panicked: {}", message)
  } else if let Some(message) = panic.downcast_ref::<String>() {
    format!("task panicked: {}", message)
  } else {
    "task panicked".to_string()
  }
}
