//! The render coordinator: owns the frame, the scratch buffers and the state
//! machine, and executes its effects against the worker pool and the UI.

use std::sync::Arc;
use std::time::{Duration, Instant};

use raylace_assets::{AssetCache, AssetKey, SceneAssets};
use raylace_core::{FrameBuffer, Point2D, RaylaceConfig, RaylaceError, RaylaceResult, ScratchBuffer};
use raylace_render::{
    CycleId, FrameCompositor, WorkerCommand, WorkerEnvelope, WorkerJob, WorkerPool,
};

use crate::display::DisplaySink;
use crate::gate::InputGate;
use crate::state::{CoordinatorState, DidHandle, DispatchKind, Effect, Event, StateMachine};

/// Startup parameters of a coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub initial_scene: AssetKey,
    pub width: u32,
    pub height: u32,
    /// Bounded wait per render cycle. `None` waits forever.
    pub timeout: Option<Duration>,
    pub progressive_preview: bool,
}

impl CoordinatorSettings {
    pub fn from_config(config: &RaylaceConfig) -> Self {
        Self {
            initial_scene: AssetKey::new(config.viewer.initial_scene.clone()),
            width: config.viewer.width,
            height: config.viewer.height,
            timeout: config.worker_timeout(),
            progressive_preview: config.render.progressive_preview,
        }
    }
}

/// Counters kept across a coordinator's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub completed_cycles: u64,
    pub abandoned_cycles: u64,
    /// User requests refused because a cycle was in flight.
    pub rejected_requests: u64,
    /// Worker messages that were stale, duplicated or out of place.
    pub unhandled_messages: u64,
    pub last_render_time: Option<Duration>,
}

pub struct RenderCoordinator {
    machine: StateMachine,
    pool: Box<dyn WorkerPool>,
    cache: Arc<AssetCache>,
    compositor: FrameCompositor,
    /// Scratch buffers held between cycles, one per worker.
    slots: Vec<Option<ScratchBuffer>>,
    scene: SceneAssets,
    gate: Box<dyn InputGate>,
    sink: Box<dyn DisplaySink>,
    progressive_preview: bool,
    stats: RenderStats,
}

impl RenderCoordinator {
    /// Resolve the initial scene, then wait for the workers' handshake.
    ///
    /// Input stays disabled until the first frame is painted.
    pub async fn start(
        cache: Arc<AssetCache>,
        pool: Box<dyn WorkerPool>,
        mut gate: Box<dyn InputGate>,
        sink: Box<dyn DisplaySink>,
        settings: CoordinatorSettings,
    ) -> RaylaceResult<Self> {
        if settings.width == 0 || settings.height == 0 {
            return Err(RaylaceError::InvalidArgument(format!(
                "viewport {}x{} has no pixels",
                settings.width, settings.height
            )));
        }
        let amount_workers = pool.amount_workers();
        if amount_workers == 0 {
            return Err(RaylaceError::WorkerPool("pool has no workers".into()));
        }

        let scene = cache
            .put_scene(&settings.initial_scene)
            .await
            .inspect_err(|e| {
                tracing::error!("failed to load initial scene '{}': {}", settings.initial_scene, e)
            })?;
        gate.disable();

        let compositor = FrameCompositor::new(settings.width, settings.height, amount_workers);
        let slots = (0..amount_workers)
            .map(|_| Some(compositor.allocate_scratch()))
            .collect();

        tracing::info!(
            "coordinator started: {} workers, {}x{}, scene '{}'",
            amount_workers,
            settings.width,
            settings.height,
            scene.key
        );
        Ok(Self {
            machine: StateMachine::new(amount_workers, settings.timeout),
            pool,
            cache,
            compositor,
            slots,
            scene,
            gate,
            sink,
            progressive_preview: settings.progressive_preview,
            stats: RenderStats::default(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> DidHandle {
        self.submit(Event::Resize { width, height })
    }

    /// Load `key` with its meshes and render it.
    ///
    /// Busy coordinators answer `Ok(DidHandle::No)` without fetching. A failed
    /// load returns the error and leaves the previous scene in place.
    pub async fn set_scene(&mut self, key: impl Into<AssetKey>) -> RaylaceResult<DidHandle> {
        let key = key.into();
        if !self.machine.is_idle() {
            tracing::warn!(
                "{}: did not handle SetScene '{}'",
                self.machine.state().name(),
                key
            );
            self.stats.rejected_requests += 1;
            return Ok(DidHandle::No);
        }

        let scene = match self.cache.put_scene(&key).await {
            Ok(scene) => scene,
            Err(e) => {
                tracing::error!("failed to load scene '{}': {}", key, e);
                return Err(e);
            }
        };
        Ok(self.submit(Event::SetScene(scene)))
    }

    pub fn turn_camera(&mut self, drag_begin: Point2D, drag_end: Point2D) -> DidHandle {
        self.submit(Event::TurnCamera {
            drag_begin,
            drag_end,
        })
    }

    pub fn on_worker_message(&mut self, envelope: WorkerEnvelope) -> DidHandle {
        self.submit(Event::Worker(envelope))
    }

    /// Wait for one worker message, or for the current cycle's deadline.
    pub async fn pump(&mut self) -> RaylaceResult<DidHandle> {
        let deadline = self
            .machine
            .current_cycle()
            .and_then(|cycle| cycle.deadline().map(|at| (cycle.id(), at)));

        let message = match deadline {
            Some((cycle, at)) => {
                let waited = tokio::time::timeout_at(at.into(), self.pool.next_message()).await;
                match waited {
                    Ok(message) => message,
                    Err(_) => return Ok(self.submit(Event::Deadline(cycle))),
                }
            }
            None => self.pool.next_message().await,
        };

        match message {
            Some(envelope) => Ok(self.on_worker_message(envelope)),
            None => Err(RaylaceError::WorkerPool(
                "all workers have disconnected".into(),
            )),
        }
    }

    pub async fn run_until_idle(&mut self) -> RaylaceResult<()> {
        while !self.machine.is_idle() {
            self.pump().await?;
        }
        Ok(())
    }

    pub fn state(&self) -> &CoordinatorState {
        self.machine.state()
    }

    pub fn is_idle(&self) -> bool {
        self.machine.is_idle()
    }

    pub fn frame(&self) -> &FrameBuffer {
        self.compositor.frame()
    }

    pub fn scene(&self) -> &SceneAssets {
        &self.scene
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    pub fn amount_workers(&self) -> usize {
        self.machine.amount_workers()
    }

    pub fn input_enabled(&self) -> bool {
        self.gate.is_enabled()
    }

    pub fn cache(&self) -> &Arc<AssetCache> {
        &self.cache
    }

    fn submit(&mut self, event: Event) -> DidHandle {
        let user_input = event.is_user_input();
        let transition = self.machine.handle(event, Instant::now());
        if !transition.handled.is_handled() {
            if user_input {
                self.stats.rejected_requests += 1;
            } else {
                self.stats.unhandled_messages += 1;
            }
        }
        for effect in transition.effects {
            self.execute(effect);
        }
        transition.handled
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::DisableInput => self.gate.disable(),
            Effect::EnableInput => self.gate.enable(),
            Effect::Reallocate { width, height } => {
                self.compositor.resize(width, height);
                for slot in &mut self.slots {
                    *slot = Some(self.compositor.allocate_scratch());
                }
            }
            Effect::RenderStarted { cycle } => {
                tracing::debug!("{} dispatched to {} workers", cycle, self.slots.len());
                self.sink.render_started();
            }
            Effect::Dispatch { cycle, kind } => self.dispatch(cycle, kind),
            Effect::Merge {
                worker_index,
                response,
            } => {
                tracing::debug!(
                    "worker {} answered {} ({} ms)",
                    worker_index,
                    response.cycle,
                    response.render_time.as_millis()
                );
                if let Err(e) = self.compositor.merge_slice(worker_index, &response.buffer) {
                    tracing::warn!("dropping slice from worker {}: {}", worker_index, e);
                }
                if self.progressive_preview {
                    self.sink.preview(self.compositor.frame());
                }
                self.reclaim(worker_index, response.buffer);
            }
            Effect::Reclaim {
                worker_index,
                buffer,
            } => self.reclaim(worker_index, buffer),
            Effect::Paint { cycle, duration } => {
                self.sink.paint(self.compositor.frame());
                self.sink.render_finished(duration);
                self.stats.completed_cycles += 1;
                self.stats.last_render_time = Some(duration);
                tracing::info!("{} rendered in {} ms", cycle, duration.as_millis());
            }
            Effect::Abandon { cycle, missing } => {
                tracing::warn!("{} abandoned, no response from workers {:?}", cycle, missing);
                self.sink.render_abandoned(&missing);
                self.stats.abandoned_cycles += 1;
            }
        }
    }

    fn dispatch(&mut self, cycle: CycleId, kind: DispatchKind) {
        if let DispatchKind::SetScene(scene) = &kind {
            tracing::info!("scene '{}' selected ({} bytes)", scene.key, scene.byte_size());
            self.scene = scene.clone();
        }

        let amount_workers = self.slots.len();
        for index in 0..amount_workers {
            let buffer = match self.slots[index].take() {
                Some(buffer) if self.compositor.accepts(&buffer) => buffer,
                _ => self.compositor.allocate_scratch(),
            };
            let command = match &kind {
                DispatchKind::Init => WorkerCommand::Init {
                    index,
                    amount_workers,
                    scene: self.scene.clone(),
                    width: self.compositor.width(),
                    height: self.compositor.height(),
                },
                DispatchKind::SetScene(scene) => WorkerCommand::SetScene {
                    scene: scene.clone(),
                },
                DispatchKind::Resize { width, height } => WorkerCommand::Resize {
                    width: *width,
                    height: *height,
                },
                DispatchKind::TurnCamera {
                    drag_begin,
                    drag_end,
                } => WorkerCommand::TurnCamera {
                    drag_begin: *drag_begin,
                    drag_end: *drag_end,
                },
            };
            if let Err(e) = self.pool.post(
                index,
                WorkerJob {
                    cycle,
                    command,
                    buffer,
                },
            ) {
                tracing::error!("failed to post {} to worker {}: {}", cycle, index, e);
            }
        }
    }

    /// Put a returned buffer back in its slot if it still matches the frame.
    fn reclaim(&mut self, worker_index: usize, buffer: ScratchBuffer) {
        if !self.compositor.accepts(&buffer) {
            tracing::trace!("dropping outdated buffer from worker {}", worker_index);
            return;
        }
        match self.slots.get_mut(worker_index) {
            Some(slot) if slot.is_none() => *slot = Some(buffer),
            _ => tracing::trace!("worker {} already has a buffer", worker_index),
        }
    }
}
