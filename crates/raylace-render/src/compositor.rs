//! Merges per-worker slices into the canonical frame.

use raylace_core::{FrameBuffer, Interlace, ScratchBuffer};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CompositeError {
    #[error("slice from generation {found} does not match frame generation {expected}")]
    StaleGeneration { expected: u64, found: u64 },

    #[error("slice is {found_width}x{found_height}, frame is {width}x{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        found_width: u32,
        found_height: u32,
    },

    #[error("worker index {index} out of range for {amount_workers} workers")]
    UnknownWorker { index: usize, amount_workers: usize },
}

/// Owns the displayed frame and the generation counter that sizes scratch
/// buffers.
#[derive(Debug)]
pub struct FrameCompositor {
    frame: FrameBuffer,
    generation: u64,
    interlace: Interlace,
}

impl FrameCompositor {
    pub fn new(width: u32, height: u32, amount_workers: usize) -> Self {
        Self {
            frame: FrameBuffer::new(width, height),
            generation: 0,
            interlace: Interlace::new(amount_workers),
        }
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn interlace(&self) -> Interlace {
        self.interlace
    }

    pub fn width(&self) -> u32 {
        self.frame.width
    }

    pub fn height(&self) -> u32 {
        self.frame.height
    }

    /// Replace the frame with a zeroed one of the new size and bump the
    /// generation. Buffers handed out before this call become stale.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.frame = FrameBuffer::new(width, height);
        self.generation += 1;
        tracing::debug!(
            "frame reallocated to {}x{} (generation {})",
            width,
            height,
            self.generation
        );
    }

    /// A zeroed scratch buffer matching the current frame.
    pub fn allocate_scratch(&self) -> ScratchBuffer {
        ScratchBuffer::new(self.frame.width, self.frame.height, self.generation)
    }

    /// Whether `buffer` can still be merged into or reused for this frame.
    pub fn accepts(&self, buffer: &ScratchBuffer) -> bool {
        buffer.generation() == self.generation
            && buffer.width() == self.frame.width
            && buffer.height() == self.frame.height
    }

    /// Copy the rows owned by `worker_index` from `slice` into the frame.
    /// Returns the number of rows copied.
    pub fn merge_slice(
        &mut self,
        worker_index: usize,
        slice: &ScratchBuffer,
    ) -> Result<usize, CompositeError> {
        let amount_workers = self.interlace.worker_count();
        if worker_index >= amount_workers {
            return Err(CompositeError::UnknownWorker {
                index: worker_index,
                amount_workers,
            });
        }
        if slice.generation() != self.generation {
            return Err(CompositeError::StaleGeneration {
                expected: self.generation,
                found: slice.generation(),
            });
        }
        if slice.width() != self.frame.width || slice.height() != self.frame.height {
            return Err(CompositeError::SizeMismatch {
                width: self.frame.width,
                height: self.frame.height,
                found_width: slice.width(),
                found_height: slice.height(),
            });
        }

        let mut copied = 0;
        for y in self.interlace.rows(worker_index, self.frame.height) {
            self.frame.row_mut(y).copy_from_slice(slice.row(y));
            copied += 1;
        }
        Ok(copied)
    }
}
