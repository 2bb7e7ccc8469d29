//! Messages exchanged between the coordinator and its render workers.
//!
//! Every job carries a [`ScratchBuffer`] and every render response hands it
//! back, so the worker holds a buffer only between receiving a job and
//! answering it.

use std::time::Duration;

use raylace_assets::SceneAssets;
use raylace_core::{Point2D, ScratchBuffer};

/// Identifies one render cycle. Monotonic per coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleId(pub u64);

impl std::fmt::Display for CycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cycle#{}", self.0)
    }
}

/// What a worker must change before it renders its slice.
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    /// First job of a worker: adopt its slot, viewport and scene.
    Init {
        index: usize,
        amount_workers: usize,
        scene: SceneAssets,
        width: u32,
        height: u32,
    },
    SetScene {
        scene: SceneAssets,
    },
    /// The new buffer handle travels as the job's buffer.
    Resize {
        width: u32,
        height: u32,
    },
    TurnCamera {
        drag_begin: Point2D,
        drag_end: Point2D,
    },
}

impl WorkerCommand {
    pub fn name(&self) -> &'static str {
        match self {
            WorkerCommand::Init { .. } => "Init",
            WorkerCommand::SetScene { .. } => "SetScene",
            WorkerCommand::Resize { .. } => "Resize",
            WorkerCommand::TurnCamera { .. } => "TurnCamera",
        }
    }
}

/// One unit of work for one worker.
#[derive(Debug)]
pub struct WorkerJob {
    pub cycle: CycleId,
    pub command: WorkerCommand,
    pub buffer: ScratchBuffer,
}

#[derive(Debug)]
pub struct RenderResponse {
    pub cycle: CycleId,
    pub buffer: ScratchBuffer,
    /// Time the worker spent applying the command and rendering.
    pub render_time: Duration,
}

#[derive(Debug)]
pub enum WorkerMessage {
    /// Sent once when a worker thread is up.
    InitAck,
    RenderResponse(RenderResponse),
}

impl WorkerMessage {
    pub fn name(&self) -> &'static str {
        match self {
            WorkerMessage::InitAck => "InitAck",
            WorkerMessage::RenderResponse(_) => "RenderResponse",
        }
    }
}

/// A worker message tagged with the index of the worker that sent it.
#[derive(Debug)]
pub struct WorkerEnvelope {
    pub worker_index: usize,
    pub message: WorkerMessage,
}

impl WorkerEnvelope {
    pub fn init_ack(worker_index: usize) -> Self {
        Self {
            worker_index,
            message: WorkerMessage::InitAck,
        }
    }

    pub fn response(worker_index: usize, response: RenderResponse) -> Self {
        Self {
            worker_index,
            message: WorkerMessage::RenderResponse(response),
        }
    }
}
