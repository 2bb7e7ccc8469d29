//! # raylace-core
//!
//! Core types and primitives for the Raylace viewer.
//! This crate contains foundational types shared across all Raylace crates:
//! frame and scratch buffers, the row interlace rule, content hashing,
//! configuration, and error types.

pub mod config;
pub mod error;
pub mod frame;
pub mod hash;
pub mod interlace;
pub mod math;

pub use config::*;

pub use error::{RaylaceError, RaylaceResult};
pub use frame::{FrameBuffer, ScratchBuffer, BYTES_PER_PIXEL};
pub use interlace::Interlace;
pub use math::Point2D;
