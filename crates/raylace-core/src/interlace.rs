//! Row interlacing: row `y` of a frame belongs to worker `y mod N`.
//!
//! Ownership depends only on the row index and the worker count, never on the
//! frame size or the scene, so a resize changes how many rows a worker owns
//! but not which rows.

use std::iter::StepBy;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interlace {
    worker_count: usize,
}

impl Interlace {
    /// Panics if `worker_count` is zero.
    pub fn new(worker_count: usize) -> Self {
        assert!(worker_count > 0, "interlace needs at least one worker");
        Self { worker_count }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// The worker that owns row `y`.
    pub fn owner_of(&self, y: u32) -> usize {
        y as usize % self.worker_count
    }

    /// `(y_offset, row_jump)` as handed to the render engine.
    pub fn stride_for(&self, worker_index: usize) -> (usize, usize) {
        (worker_index, self.worker_count)
    }

    /// Rows of a `height`-row frame owned by `worker_index`, top to bottom.
    pub fn rows(&self, worker_index: usize, height: u32) -> StepBy<Range<u32>> {
        let start = (worker_index as u32).min(height);
        (start..height).step_by(self.worker_count)
    }

    /// Number of rows `worker_index` owns in a `height`-row frame.
    pub fn row_count(&self, worker_index: usize, height: u32) -> usize {
        let height = height as usize;
        if worker_index >= height {
            return 0;
        }
        (height - worker_index).div_ceil(self.worker_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_is_total_and_disjoint() {
        for workers in 1..=9 {
            let interlace = Interlace::new(workers);
            for height in 0..40u32 {
                let mut owners = vec![0usize; height as usize];
                for worker in 0..workers {
                    for y in interlace.rows(worker, height) {
                        owners[y as usize] += 1;
                        assert_eq!(interlace.owner_of(y), worker);
                    }
                    assert_eq!(
                        interlace.rows(worker, height).count(),
                        interlace.row_count(worker, height)
                    );
                }
                assert!(owners.iter().all(|&n| n == 1), "workers={workers} height={height}");
            }
        }
    }

    #[test]
    fn test_four_workers_ten_rows() {
        let interlace = Interlace::new(4);
        assert_eq!(interlace.rows(0, 10).collect::<Vec<_>>(), vec![0, 4, 8]);
        assert_eq!(interlace.rows(3, 10).collect::<Vec<_>>(), vec![3, 7]);
        assert_eq!(interlace.stride_for(3), (3, 4));
    }

    #[test]
    fn test_more_workers_than_rows() {
        let interlace = Interlace::new(8);
        assert_eq!(interlace.rows(5, 3).count(), 0);
        assert_eq!(interlace.row_count(5, 3), 0);
        assert_eq!(interlace.rows(2, 3).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    #[should_panic]
    fn test_zero_workers_panics() {
        let _ = Interlace::new(0);
    }
}
