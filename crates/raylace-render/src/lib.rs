//! # raylace-render
//!
//! The compute side of the viewer. A fixed pool of worker threads, each
//! owning one render engine, renders disjoint row-interlaced slices of a
//! frame; the compositor merges each slice into the canonical image.

pub mod compositor;
pub mod engine;
pub mod pool;
pub mod protocol;
mod worker;

pub use compositor::{CompositeError, FrameCompositor};
pub use engine::{EngineFactory, GradientEngine, RenderEngine};
pub use pool::{ThreadWorkerPool, WorkerPool, DEFAULT_SHUTDOWN_GRACE};
pub use protocol::{
    CycleId, RenderResponse, WorkerCommand, WorkerEnvelope, WorkerJob, WorkerMessage,
};
