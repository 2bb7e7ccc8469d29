//! The coordinator's busy/idle state machine.
//!
//! [`StateMachine::handle`] is a pure transition `(state, event) -> (state,
//! effects)`. It never touches the pool, the frame or the UI; the
//! coordinator executes the returned [`Effect`]s in order.

use std::time::{Duration, Instant};

use raylace_assets::SceneAssets;
use raylace_core::{Point2D, ScratchBuffer};
use raylace_render::{CycleId, RenderResponse, WorkerEnvelope, WorkerMessage};

/// Whether an operation or message was acted upon. `No` is a normal outcome,
/// not an error: the coordinator was busy or the message was stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DidHandle {
    Yes,
    No,
}

impl DidHandle {
    pub fn is_handled(self) -> bool {
        self == DidHandle::Yes
    }
}

#[derive(Debug)]
pub enum Event {
    Worker(WorkerEnvelope),
    Resize { width: u32, height: u32 },
    SetScene(SceneAssets),
    TurnCamera { drag_begin: Point2D, drag_end: Point2D },
    /// The bounded wait of a cycle ran out.
    Deadline(CycleId),
}

impl Event {
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            Event::Resize { .. } | Event::SetScene(_) | Event::TurnCamera { .. }
        )
    }

    fn describe(&self) -> String {
        match self {
            Event::Worker(WorkerEnvelope {
                worker_index,
                message: WorkerMessage::InitAck,
            }) => format!("InitAck from worker {}", worker_index),
            Event::Worker(WorkerEnvelope {
                worker_index,
                message: WorkerMessage::RenderResponse(r),
            }) => format!("RenderResponse({}) from worker {}", r.cycle, worker_index),
            Event::Resize { width, height } => format!("Resize {}x{}", width, height),
            Event::SetScene(scene) => format!("SetScene '{}'", scene.key),
            Event::TurnCamera {
                drag_begin,
                drag_end,
            } => format!("TurnCamera {} -> {}", drag_begin, drag_end),
            Event::Deadline(cycle) => format!("Deadline({})", cycle),
        }
    }
}

/// The per-worker job a cycle starts with.
#[derive(Debug, Clone)]
pub enum DispatchKind {
    /// Uses the coordinator's current scene and frame size.
    Init,
    SetScene(SceneAssets),
    Resize { width: u32, height: u32 },
    TurnCamera { drag_begin: Point2D, drag_end: Point2D },
}

#[derive(Debug)]
pub enum Effect {
    DisableInput,
    EnableInput,
    /// Replace the frame and every scratch buffer with new ones of this size.
    Reallocate { width: u32, height: u32 },
    RenderStarted { cycle: CycleId },
    /// Post one job of this kind to every worker.
    Dispatch { cycle: CycleId, kind: DispatchKind },
    Merge { worker_index: usize, response: RenderResponse },
    /// Return a buffer that is not merged to its slot, if it still fits.
    Reclaim { worker_index: usize, buffer: ScratchBuffer },
    Paint { cycle: CycleId, duration: Duration },
    Abandon { cycle: CycleId, missing: Vec<usize> },
}

/// Book-keeping of the cycle in flight.
#[derive(Debug, Clone)]
pub struct RenderCycle {
    id: CycleId,
    responded: Vec<bool>,
    responses_received: usize,
    started: Instant,
    deadline: Option<Instant>,
}

impl RenderCycle {
    pub fn id(&self) -> CycleId {
        self.id
    }

    pub fn responses_received(&self) -> usize {
        self.responses_received
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Workers that have not answered yet.
    pub fn missing(&self) -> Vec<usize> {
        self.responded
            .iter()
            .enumerate()
            .filter(|(_, &done)| !done)
            .map(|(index, _)| index)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub enum CoordinatorState {
    /// Waiting for every worker's `InitAck`.
    InitHandshake { acked: Vec<bool> },
    Rendering(RenderCycle),
    /// Accepting user control.
    Idle,
}

impl CoordinatorState {
    pub fn name(&self) -> &'static str {
        match self {
            CoordinatorState::InitHandshake { .. } => "InitHandshake",
            CoordinatorState::Rendering(_) => "Rendering",
            CoordinatorState::Idle => "Idle",
        }
    }
}

#[derive(Debug)]
pub struct Transition {
    pub handled: DidHandle,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn handled(effects: Vec<Effect>) -> Self {
        Self {
            handled: DidHandle::Yes,
            effects,
        }
    }

    fn not_handled(effects: Vec<Effect>) -> Self {
        Self {
            handled: DidHandle::No,
            effects,
        }
    }
}

#[derive(Debug)]
pub struct StateMachine {
    state: CoordinatorState,
    amount_workers: usize,
    next_cycle: u64,
    timeout: Option<Duration>,
}

impl StateMachine {
    pub fn new(amount_workers: usize, timeout: Option<Duration>) -> Self {
        Self {
            state: CoordinatorState::InitHandshake {
                acked: vec![false; amount_workers],
            },
            amount_workers,
            next_cycle: 0,
            timeout,
        }
    }

    pub fn state(&self) -> &CoordinatorState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, CoordinatorState::Idle)
    }

    pub fn amount_workers(&self) -> usize {
        self.amount_workers
    }

    pub fn current_cycle(&self) -> Option<&RenderCycle> {
        match &self.state {
            CoordinatorState::Rendering(cycle) => Some(cycle),
            _ => None,
        }
    }

    pub fn handle(&mut self, event: Event, now: Instant) -> Transition {
        let state = std::mem::replace(&mut self.state, CoordinatorState::Idle);
        let before = state.name();
        let (state, transition) = match state {
            CoordinatorState::InitHandshake { acked } => self.on_handshake(acked, event, now),
            CoordinatorState::Rendering(cycle) => self.on_rendering(cycle, event, now),
            CoordinatorState::Idle => self.on_idle(event, now),
        };
        self.state = state;

        let after = self.state.name();
        if before != after {
            tracing::debug!("{} -> {}", before, after);
        }
        transition
    }

    fn on_handshake(
        &mut self,
        mut acked: Vec<bool>,
        event: Event,
        now: Instant,
    ) -> (CoordinatorState, Transition) {
        match event {
            Event::Worker(WorkerEnvelope {
                worker_index,
                message: WorkerMessage::InitAck,
            }) if acked.get(worker_index) == Some(&false) => {
                acked[worker_index] = true;
                let count = acked.iter().filter(|&&done| done).count();
                tracing::debug!(
                    "init ack from worker {} ({}/{})",
                    worker_index,
                    count,
                    self.amount_workers
                );
                if count == self.amount_workers {
                    self.start_cycle(DispatchKind::Init, now, Vec::new())
                } else {
                    (
                        CoordinatorState::InitHandshake { acked },
                        Transition::handled(Vec::new()),
                    )
                }
            }
            other => reject(CoordinatorState::InitHandshake { acked }, other),
        }
    }

    fn on_rendering(
        &mut self,
        mut cycle: RenderCycle,
        event: Event,
        now: Instant,
    ) -> (CoordinatorState, Transition) {
        match event {
            Event::Worker(WorkerEnvelope {
                worker_index,
                message: WorkerMessage::RenderResponse(response),
            }) if response.cycle == cycle.id
                && cycle.responded.get(worker_index) == Some(&false) =>
            {
                cycle.responded[worker_index] = true;
                cycle.responses_received += 1;
                let mut effects = vec![Effect::Merge {
                    worker_index,
                    response,
                }];

                if cycle.responses_received < self.amount_workers {
                    return (CoordinatorState::Rendering(cycle), Transition::handled(effects));
                }
                effects.push(Effect::Paint {
                    cycle: cycle.id,
                    duration: now.saturating_duration_since(cycle.started),
                });
                effects.push(Effect::EnableInput);
                (CoordinatorState::Idle, Transition::handled(effects))
            }
            Event::Deadline(id) if id == cycle.id => {
                let effects = vec![
                    Effect::Abandon {
                        cycle: id,
                        missing: cycle.missing(),
                    },
                    Effect::EnableInput,
                ];
                (CoordinatorState::Idle, Transition::handled(effects))
            }
            other => reject(CoordinatorState::Rendering(cycle), other),
        }
    }

    fn on_idle(&mut self, event: Event, now: Instant) -> (CoordinatorState, Transition) {
        match event {
            Event::Resize { width, height } if width > 0 && height > 0 => self.start_cycle(
                DispatchKind::Resize { width, height },
                now,
                vec![Effect::Reallocate { width, height }],
            ),
            Event::SetScene(scene) => self.start_cycle(DispatchKind::SetScene(scene), now, Vec::new()),
            Event::TurnCamera {
                drag_begin,
                drag_end,
            } => self.start_cycle(
                DispatchKind::TurnCamera {
                    drag_begin,
                    drag_end,
                },
                now,
                Vec::new(),
            ),
            other => reject(CoordinatorState::Idle, other),
        }
    }

    fn start_cycle(
        &mut self,
        kind: DispatchKind,
        now: Instant,
        mut effects: Vec<Effect>,
    ) -> (CoordinatorState, Transition) {
        let id = CycleId(self.next_cycle);
        self.next_cycle += 1;

        effects.push(Effect::Dispatch { cycle: id, kind });
        effects.push(Effect::DisableInput);
        effects.push(Effect::RenderStarted { cycle: id });

        let cycle = RenderCycle {
            id,
            responded: vec![false; self.amount_workers],
            responses_received: 0,
            started: now,
            deadline: self.timeout.and_then(|timeout| now.checked_add(timeout)),
        };
        (CoordinatorState::Rendering(cycle), Transition::handled(effects))
    }
}

fn reject(state: CoordinatorState, event: Event) -> (CoordinatorState, Transition) {
    tracing::warn!("{}: did not handle {}", state.name(), event.describe());
    let effects = match event {
        Event::Worker(WorkerEnvelope {
            worker_index,
            message: WorkerMessage::RenderResponse(response),
        }) => vec![Effect::Reclaim {
            worker_index,
            buffer: response.buffer,
        }],
        _ => Vec::new(),
    };
    (state, Transition::not_handled(effects))
}
