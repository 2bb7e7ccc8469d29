//! Worker pool abstraction and its thread-backed implementation.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use raylace_core::{RaylaceError, RaylaceResult};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use crate::engine::EngineFactory;
use crate::protocol::{WorkerEnvelope, WorkerJob};
use crate::worker::{self, WorkerState};

/// A fixed set of render workers addressed by index.
///
/// `post` never blocks; results arrive through `next_message` in the order
/// the workers finish.
#[async_trait]
pub trait WorkerPool: Send {
    fn amount_workers(&self) -> usize;

    fn post(&mut self, worker_index: usize, job: WorkerJob) -> RaylaceResult<()>;

    /// Wait for the next message from any worker. `None` once every worker is gone.
    async fn next_message(&mut self) -> Option<WorkerEnvelope>;
}

/// How long drop waits for busy workers before detaching them.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

/// Reports a worker's index when its thread exits, including by panic.
struct ExitNotice {
    index: usize,
    exits: Sender<usize>,
}

impl Drop for ExitNotice {
    fn drop(&mut self) {
        let _ = self.exits.send(self.index);
    }
}

/// One OS thread per worker, each owning its engine.
pub struct ThreadWorkerPool {
    senders: Vec<Option<Sender<WorkerJob>>>,
    handles: Vec<Option<JoinHandle<()>>>,
    responses: UnboundedReceiver<WorkerEnvelope>,
    exits: Receiver<usize>,
    shutdown_grace: Duration,
}

impl ThreadWorkerPool {
    /// Spawn `amount_workers` threads. Each builds its engine with `factory`
    /// and announces itself with an `InitAck`.
    pub fn spawn(amount_workers: usize, factory: EngineFactory) -> RaylaceResult<Self> {
        if amount_workers == 0 {
            return Err(RaylaceError::InvalidArgument(
                "worker pool needs at least one worker".into(),
            ));
        }

        let (response_tx, responses) = unbounded_channel();
        let (exit_tx, exits) = mpsc::channel();
        let mut senders = Vec::with_capacity(amount_workers);
        let mut handles = Vec::with_capacity(amount_workers);

        for index in 0..amount_workers {
            let (job_tx, job_rx) = mpsc::channel::<WorkerJob>();
            let response_tx = response_tx.clone();
            let factory = factory.clone();
            let notice = ExitNotice {
                index,
                exits: exit_tx.clone(),
            };
            let handle = thread::Builder::new()
                .name(format!("render-worker-{}", index))
                .spawn(move || {
                    let _notice = notice;
                    let state = WorkerState::new(index, factory(index));
                    worker::run(state, job_rx, response_tx);
                })
                .map_err(|e| {
                    RaylaceError::WorkerPool(format!("failed to spawn worker {}: {}", index, e))
                })?;
            senders.push(Some(job_tx));
            handles.push(Some(handle));
        }

        tracing::info!("spawned {} render workers", amount_workers);
        Ok(Self {
            senders,
            handles,
            responses,
            exits,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        })
    }

    /// Bound on how long drop waits for workers still inside a job.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

#[async_trait]
impl WorkerPool for ThreadWorkerPool {
    fn amount_workers(&self) -> usize {
        self.senders.len()
    }

    fn post(&mut self, worker_index: usize, job: WorkerJob) -> RaylaceResult<()> {
        let sender = self
            .senders
            .get(worker_index)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                RaylaceError::WorkerPool(format!("no worker with index {}", worker_index))
            })?;
        sender.send(job).map_err(|_| {
            RaylaceError::WorkerPool(format!("worker {} has disconnected", worker_index))
        })
    }

    async fn next_message(&mut self) -> Option<WorkerEnvelope> {
        self.responses.recv().await
    }
}

impl Drop for ThreadWorkerPool {
    fn drop(&mut self) {
        // Hanging up the job channels ends each worker loop once its current job is done.
        for sender in &mut self.senders {
            sender.take();
        }

        let started = Instant::now();
        let mut running = self.handles.iter().filter(|h| h.is_some()).count();
        while running > 0 {
            let remaining = self.shutdown_grace.saturating_sub(started.elapsed());
            let Ok(index) = self.exits.recv_timeout(remaining) else {
                break;
            };
            if let Some(handle) = self.handles.get_mut(index).and_then(Option::take) {
                running -= 1;
                if handle.join().is_err() {
                    tracing::error!("render worker {} panicked", index);
                }
            }
        }

        for (index, handle) in self.handles.iter_mut().enumerate() {
            if handle.take().is_some() {
                tracing::warn!("render worker {} did not stop in time, detaching", index);
            }
        }
    }
}
