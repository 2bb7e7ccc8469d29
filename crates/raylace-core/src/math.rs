use serde::{Deserialize, Serialize};

/// A 2D point in screen space (pixels, origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// Component-wise `other - self`.
    pub fn delta_to(&self, other: &Point2D) -> Point2D {
        Point2D {
            x: other.x - self.x,
            y: other.y - self.y,
        }
    }
}

impl Default for Point2D {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Point2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
