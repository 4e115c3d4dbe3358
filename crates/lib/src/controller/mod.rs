//! Event-driven controller loop.
//!
//! The controller turns watch events into reconciliation passes:
//!
//! - instance events queue the instance itself
//! - related-resource events are routed through the [`InstanceMapper`]
//! - up to `workers` passes run at once, each on a blocking task
//! - failed passes are retried after an exponential backoff
//!
//! [`Controller::run`] returns once the event channel is closed and every
//! running pass has finished. Retries that are still waiting are dropped.

pub mod queue;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{self, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::mapper::InstanceMapper;
use crate::reconcile::{Reconcile, ReconcileError, ReconcileOutcome};
use crate::reference::{ObjectKey, Resource};

pub use queue::{Backoff, WorkQueue};

/// A change notification delivered to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
  /// A primary instance changed.
  Instance(ObjectKey),
  /// A secondary resource changed; its current labels are included.
  Related(Resource),
}

/// Counters for one [`Controller::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
  /// Passes that completed successfully.
  pub passes: usize,
  /// Passes that failed and were scheduled for retry.
  pub failures: usize,
}

type PassResult = Result<Result<ReconcileOutcome, ReconcileError>, JoinError>;

pub struct Controller {
  reconciler: Arc<dyn Reconcile>,
  mapper: InstanceMapper,
  workers: usize,
  backoff: Backoff,
}

impl Controller {
  pub fn new(reconciler: Arc<dyn Reconcile>, mapper: InstanceMapper, workers: usize) -> Self {
    Self {
      reconciler,
      mapper,
      workers: workers.max(1),
      backoff: Backoff::default(),
    }
  }

  pub fn with_backoff(mut self, backoff: Backoff) -> Self {
    self.backoff = backoff;
    self
  }

  pub async fn run(&self, mut events: mpsc::Receiver<WatchEvent>) -> RunSummary {
    let mut queue = WorkQueue::new(self.backoff);
    let mut tasks: JoinSet<Result<ReconcileOutcome, ReconcileError>> = JoinSet::new();
    let mut running: HashMap<task::Id, ObjectKey> = HashMap::new();
    let (retry_tx, mut retry_rx) = mpsc::unbounded_channel::<ObjectKey>();
    let mut summary = RunSummary::default();
    let mut closed = false;

    info!(workers = self.workers, "controller started");

    loop {
      while tasks.len() < self.workers {
        let Some(key) = queue.next() else {
          break;
        };
        let reconciler = Arc::clone(&self.reconciler);
        let pass_key = key.clone();
        let handle = tasks.spawn_blocking(move || reconciler.reconcile(&pass_key));
        running.insert(handle.id(), key);
      }

      if closed && tasks.is_empty() {
        break;
      }

      tokio::select! {
        event = events.recv(), if !closed => match event {
          Some(event) => self.enqueue(&mut queue, event),
          None => {
            debug!(running = tasks.len(), "event channel closed, draining");
            closed = true;
          }
        },
        Some(joined) = tasks.join_next_with_id(), if !tasks.is_empty() => {
          let (id, result) = match joined {
            Ok((id, result)) => (id, Ok(result)),
            Err(e) => {
              error!(error = %e, "reconcile task panicked");
              (e.id(), Err(e))
            }
          };
          if let Some(key) = running.remove(&id) {
            match self.finish(&mut queue, &mut summary, &key, result) {
              Some(delay) if !closed => schedule_retry(&retry_tx, key, delay),
              _ => {}
            }
          }
        },
        Some(key) = retry_rx.recv() => queue.add(key),
      }
    }

    info!(passes = summary.passes, failures = summary.failures, "controller stopped");
    summary
  }

  fn enqueue(&self, queue: &mut WorkQueue, event: WatchEvent) {
    match event {
      WatchEvent::Instance(key) => queue.add(key),
      WatchEvent::Related(resource) => {
        for request in self.mapper.map(&resource) {
          queue.add(request.key);
        }
      }
    }
  }

  /// Record the result of a pass. Returns the retry delay if it failed.
  fn finish(
    &self,
    queue: &mut WorkQueue,
    summary: &mut RunSummary,
    key: &ObjectKey,
    result: PassResult,
  ) -> Option<Duration> {
    let error = match result {
      Ok(Ok(outcome)) => {
        debug!(instance = %key, ?outcome, "pass complete");
        queue.forget(key);
        queue.done(key);
        summary.passes += 1;
        return None;
      }
      Ok(Err(e)) => e.to_string(),
      Err(e) => e.to_string(),
    };

    let delay = queue.backoff(key);
    warn!(instance = %key, error = %error, failures = queue.failures(key), retry_in = ?delay, "reconcile failed");
    queue.done(key);
    summary.failures += 1;
    Some(delay)
  }
}

fn schedule_retry(retry_tx: &mpsc::UnboundedSender<ObjectKey>, key: ObjectKey, delay: Duration) {
  let retry_tx = retry_tx.clone();
  tokio::spawn(async move {
    tokio::time::sleep(delay).await;
    // The controller may have stopped meanwhile.
    let _ = retry_tx.send(key);
  });
}
