//! Bounded hand-off from admission intake to the single recorder worker.
//!
//! Intake must always answer the API server, so enqueueing never waits
//! without limit. When the queue is full the overflow policy decides whether
//! to wait a bounded time or drop straight away; dropped requests are
//! counted and logged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};
use tokio::task::JoinHandle;

use super::RecordRequest;
use crate::coverage::{RecordOutcome, Recorder};

/// Behavior when the intake queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Wait up to the configured timeout for room, then drop.
    #[default]
    Block,
    /// Drop the incoming request immediately.
    DropNewest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    /// The queue stayed full.
    Dropped,
    /// The recorder worker is gone.
    Closed,
}

/// Counters for queue activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IntakeStats {
    pub queued: u64,
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    dropped: AtomicU64,
}

/// Sending side of the intake queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct IntakeQueue {
    sender: mpsc::Sender<RecordRequest>,
    policy: OverflowPolicy,
    block_timeout: Duration,
    counters: Arc<Counters>,
}

impl IntakeQueue {
    /// Creates a queue and the receiver for [`spawn_recorder`].
    pub fn new(
        capacity: usize,
        policy: OverflowPolicy,
        block_timeout: Duration,
    ) -> (Self, mpsc::Receiver<RecordRequest>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let queue = Self {
            sender,
            policy,
            block_timeout,
            counters: Arc::new(Counters::default()),
        };
        (queue, receiver)
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub async fn enqueue(&self, request: RecordRequest) -> EnqueueOutcome {
        let outcome = match self.policy {
            OverflowPolicy::DropNewest => match self.sender.try_send(request) {
                Ok(()) => EnqueueOutcome::Queued,
                Err(TrySendError::Full(request)) => {
                    tracing::warn!(resource = %request.key, "intake queue full, dropping request");
                    EnqueueOutcome::Dropped
                }
                Err(TrySendError::Closed(_)) => EnqueueOutcome::Closed,
            },
            OverflowPolicy::Block => {
                match self.sender.send_timeout(request, self.block_timeout).await {
                    Ok(()) => EnqueueOutcome::Queued,
                    Err(SendTimeoutError::Timeout(request)) => {
                        tracing::warn!(
                            resource = %request.key,
                            timeout_ms = self.block_timeout.as_millis() as u64,
                            "intake queue stayed full, dropping request"
                        );
                        EnqueueOutcome::Dropped
                    }
                    Err(SendTimeoutError::Closed(_)) => EnqueueOutcome::Closed,
                }
            }
        };

        match outcome {
            EnqueueOutcome::Queued => {
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
            }
            EnqueueOutcome::Dropped => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            }
            EnqueueOutcome::Closed => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::error!("recorder worker has stopped, dropping request");
            }
        }
        outcome
    }

    pub fn stats(&self) -> IntakeStats {
        IntakeStats {
            queued: self.counters.queued.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Runs the single recorder worker until every sender is dropped.
pub fn spawn_recorder(
    recorder: Recorder,
    mut receiver: mpsc::Receiver<RecordRequest>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("recorder worker started");
        while let Some(request) = receiver.recv().await {
            match recorder.record(&request.key, &request.raw) {
                Ok(RecordOutcome::Recorded { leaves }) => {
                    tracing::info!(resource = %request.key, leaves, "recorded coverage");
                }
                Ok(RecordOutcome::Unregistered) => {
                    tracing::debug!(resource = %request.key, "no tree for resource");
                }
                Err(e) => {
                    tracing::error!(resource = %request.key, error = %e, "failed to record instance");
                }
            }
        }
        tracing::info!("recorder worker stopped");
    })
}
