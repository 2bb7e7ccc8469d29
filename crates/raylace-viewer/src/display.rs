//! Where composited frames go.

use std::time::Duration;

use raylace_core::hash::hash_frame;
use raylace_core::FrameBuffer;

/// Receiver of painted frames and render-progress notifications.
///
/// Only `paint` is required. A sink sees `render_started` when a cycle is
/// dispatched and exactly one of `render_finished` (after `paint`) or
/// `render_abandoned` when it ends.
pub trait DisplaySink: Send {
    /// The fully composited frame of a completed cycle.
    fn paint(&mut self, frame: &FrameBuffer);

    /// A partially composited frame. Only called with progressive preview on.
    fn preview(&mut self, _frame: &FrameBuffer) {}

    fn render_started(&mut self) {}

    fn render_finished(&mut self, _duration: Duration) {}

    /// The cycle hit its deadline without hearing from `missing` workers.
    fn render_abandoned(&mut self, _missing: &[usize]) {}
}

/// Headless sink that logs each paint with the frame's hash.
#[derive(Debug, Default)]
pub struct LoggingSink {
    paints: usize,
}

impl LoggingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paints(&self) -> usize {
        self.paints
    }
}

impl DisplaySink for LoggingSink {
    fn paint(&mut self, frame: &FrameBuffer) {
        self.paints += 1;
        tracing::info!(
            "painted {}x{} frame {}",
            frame.width,
            frame.height,
            hash_frame(frame)
        );
    }

    fn render_started(&mut self) {
        tracing::info!("Rendering...");
    }

    fn render_finished(&mut self, duration: Duration) {
        tracing::info!("Render time: {} ms", duration.as_millis());
    }

    fn render_abandoned(&mut self, missing: &[usize]) {
        tracing::warn!("render abandoned, no response from workers {:?}", missing);
    }
}
