use std::sync::mpsc::Receiver;
use std::time::Instant;

use tokio::sync::mpsc::UnboundedSender;

use crate::engine::RenderEngine;
use crate::protocol::{RenderResponse, WorkerCommand, WorkerEnvelope, WorkerJob};

/// State owned by one worker thread for its whole lifetime.
pub(crate) struct WorkerState {
    index: usize,
    amount_workers: usize,
    initialized: bool,
    engine: Box<dyn RenderEngine>,
}

impl WorkerState {
    pub(crate) fn new(index: usize, engine: Box<dyn RenderEngine>) -> Self {
        Self {
            index,
            amount_workers: 1,
            initialized: false,
            engine,
        }
    }

    fn apply(&mut self, command: &WorkerCommand) {
        match command {
            WorkerCommand::Init {
                index,
                amount_workers,
                scene,
                width,
                height,
            } => {
                if *index != self.index {
                    tracing::warn!(
                        "worker {} received Init for slot {}; keeping its own slot",
                        self.index,
                        index
                    );
                }
                self.amount_workers = (*amount_workers).max(1);
                self.engine.resize(*width, *height);
                if let Err(e) = self.engine.set_scene(scene) {
                    tracing::error!("worker {}: scene '{}' rejected: {}", self.index, scene.key, e);
                }
                self.initialized = true;
            }
            WorkerCommand::SetScene { scene } => {
                if let Err(e) = self.engine.set_scene(scene) {
                    tracing::error!("worker {}: scene '{}' rejected: {}", self.index, scene.key, e);
                }
            }
            WorkerCommand::Resize { width, height } => self.engine.resize(*width, *height),
            WorkerCommand::TurnCamera {
                drag_begin,
                drag_end,
            } => self.engine.turn_camera(*drag_begin, *drag_end),
        }
    }

    /// Apply the job's command, render this worker's rows and give the buffer back.
    pub(crate) fn handle(&mut self, job: WorkerJob) -> RenderResponse {
        let start = Instant::now();
        let WorkerJob {
            cycle,
            command,
            mut buffer,
        } = job;

        tracing::debug!("worker {}: received '{}' for {}", self.index, command.name(), cycle);
        if !self.initialized && !matches!(command, WorkerCommand::Init { .. }) {
            tracing::warn!(
                "worker {}: '{}' before Init, rendering with defaults",
                self.index,
                command.name()
            );
        }
        self.apply(&command);

        if let Err(e) =
            self.engine
                .render_interlaced(buffer.as_bytes_mut(), self.index, self.amount_workers)
        {
            tracing::error!("worker {}: render failed: {}", self.index, e);
        }

        let render_time = start.elapsed();
        tracing::debug!(
            "worker {}: responding for {} - render time {} ms",
            self.index,
            cycle,
            render_time.as_millis()
        );
        RenderResponse {
            cycle,
            buffer,
            render_time,
        }
    }
}

/// Thread body: announce readiness, then serve jobs until the pool hangs up.
pub(crate) fn run(
    mut state: WorkerState,
    jobs: Receiver<WorkerJob>,
    responses: UnboundedSender<WorkerEnvelope>,
) {
    let index = state.index;
    tracing::debug!("worker {}: started", index);
    if responses.send(WorkerEnvelope::init_ack(index)).is_err() {
        return;
    }

    while let Ok(job) = jobs.recv() {
        let response = state.handle(job);
        if responses.send(WorkerEnvelope::response(index, response)).is_err() {
            break;
        }
    }
    tracing::debug!("worker {}: stopped", index);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GradientEngine;
    use crate::protocol::CycleId;
    use raylace_assets::{AssetBytes, AssetKey, SceneAssets};
    use raylace_core::ScratchBuffer;

    fn scene(bytes: &[u8]) -> SceneAssets {
        SceneAssets {
            key: AssetKey::new("w.json"),
            scene: AssetBytes::from(bytes),
            meshes: Vec::new(),
        }
    }

    fn init(index: usize, amount_workers: usize) -> WorkerCommand {
        WorkerCommand::Init {
            index,
            amount_workers,
            scene: scene(b"{}"),
            width: 2,
            height: 6,
        }
    }

    #[test]
    fn test_worker_renders_its_rows_and_returns_buffer() {
        let mut state = WorkerState::new(1, Box::new(GradientEngine::new()));
        let response = state.handle(WorkerJob {
            cycle: CycleId(4),
            command: init(1, 3),
            buffer: ScratchBuffer::new(2, 6, 9),
        });

        assert_eq!(response.cycle, CycleId(4));
        assert_eq!(response.buffer.generation(), 9);
        for y in 0..6 {
            let touched = response.buffer.row(y).iter().any(|&b| b != 0);
            assert_eq!(touched, y % 3 == 1, "row {y}");
        }
    }

    #[test]
    fn test_bad_scene_still_produces_a_response() {
        let mut state = WorkerState::new(0, Box::new(GradientEngine::new()));
        state.handle(WorkerJob {
            cycle: CycleId(1),
            command: init(0, 1),
            buffer: ScratchBuffer::new(2, 6, 0),
        });
        let response = state.handle(WorkerJob {
            cycle: CycleId(2),
            command: WorkerCommand::SetScene { scene: scene(b"") },
            buffer: ScratchBuffer::new(2, 6, 0),
        });
        assert_eq!(response.cycle, CycleId(2));
        assert!(response.buffer.row(0).iter().any(|&b| b != 0));
    }

    #[test]
    fn test_run_acks_then_serves_jobs_in_order() {
        let (job_tx, job_rx) = std::sync::mpsc::channel();
        let (resp_tx, mut resp_rx) = tokio::sync::mpsc::unbounded_channel();
        let state = WorkerState::new(0, Box::new(GradientEngine::new()));

        job_tx
            .send(WorkerJob {
                cycle: CycleId(1),
                command: init(0, 1),
                buffer: ScratchBuffer::new(2, 6, 0),
            })
            .unwrap();
        job_tx
            .send(WorkerJob {
                cycle: CycleId(2),
                command: WorkerCommand::Resize { width: 1, height: 1 },
                buffer: ScratchBuffer::new(1, 1, 1),
            })
            .unwrap();
        drop(job_tx);

        run(state, job_rx, resp_tx);

        let ack = resp_rx.try_recv().unwrap();
        assert!(matches!(ack.message, crate::WorkerMessage::InitAck));
        let cycles: Vec<CycleId> = std::iter::from_fn(|| resp_rx.try_recv().ok())
            .map(|env| match env.message {
                crate::WorkerMessage::RenderResponse(r) => r.cycle,
                other => panic!("unexpected {}", other.name()),
            })
            .collect();
        assert_eq!(cycles, vec![CycleId(1), CycleId(2)]);
    }
}
