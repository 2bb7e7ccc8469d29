//! # raylace-viewer
//!
//! The client-side coordination layer of the viewer. A [`RenderCoordinator`]
//! turns user input into render cycles across the worker pool, collects one
//! response per worker, composites them and paints the result. User input
//! is only accepted between cycles.

pub mod coordinator;
pub mod display;
pub mod gate;
pub mod state;

pub use coordinator::{CoordinatorSettings, RenderCoordinator, RenderStats};
pub use display::{DisplaySink, LoggingSink};
pub use gate::{InputGate, LoggingGate};
pub use state::{CoordinatorState, DidHandle, DispatchKind, Effect, Event, StateMachine};
