//! Cabinet Core - shared types and utilities for the Cabinet arcade games
//!
//! This crate provides the foundations used by every game:
//! - Mathematical primitives (re-exported from glam)
//! - Axis-aligned rectangles and colors for playfield geometry
//! - Frame timing (fixed-timestep clock, countdowns)

pub mod time;
pub mod types;

pub use glam::Vec2;
pub use time::{ClockConfig, Countdown, FrameClock};
pub use types::{Color, Rect};
