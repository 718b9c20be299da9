//! Frame timing for the game loop
//!
//! The browser hosts that drove the original games delivered uneven
//! animation-frame deltas; the clock here converts wall-clock deltas into a
//! whole number of fixed logic steps so game systems can assume a constant
//! timestep.

use serde::{Deserialize, Serialize};

/// Configuration for the fixed-timestep clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Fixed logic timestep in seconds
    pub timestep: f32,
    /// Maximum delta accepted per update, to avoid a spiral of death after
    /// a long pause (tab in background, debugger, etc.)
    pub max_delta: f32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            timestep: 1.0 / 60.0,
            max_delta: 0.25,
        }
    }
}

/// Accumulating fixed-timestep clock.
#[derive(Debug, Clone)]
pub struct FrameClock {
    config: ClockConfig,
    accumulator: f32,
    /// Total simulated time in seconds
    total: f64,
    /// Total number of fixed steps taken
    steps: u64,
}

impl FrameClock {
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config,
            accumulator: 0.0,
            total: 0.0,
            steps: 0,
        }
    }

    /// The fixed timestep in seconds.
    pub fn timestep(&self) -> f32 {
        self.config.timestep
    }

    /// Feed a wall-clock delta and return how many fixed steps to simulate.
    pub fn advance(&mut self, delta: f32) -> u32 {
        self.accumulator += delta.min(self.config.max_delta);
        let mut n = 0;
        while self.accumulator >= self.config.timestep {
            self.accumulator -= self.config.timestep;
            self.total += self.config.timestep as f64;
            self.steps += 1;
            n += 1;
        }
        n
    }

    /// Total simulated time in seconds.
    pub fn total_time(&self) -> f64 {
        self.total
    }

    /// Total number of fixed steps taken since creation.
    pub fn step_count(&self) -> u64 {
        self.steps
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(ClockConfig::default())
    }
}

/// A countdown that ticks toward zero, used for serve delays and round timers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    remaining: f32,
}

impl Countdown {
    /// Start a countdown with the given duration in seconds.
    pub fn new(seconds: f32) -> Self {
        Self {
            remaining: seconds.max(0.0),
        }
    }

    /// An already-expired countdown.
    pub fn finished() -> Self {
        Self { remaining: 0.0 }
    }

    /// Advance by `delta` seconds; returns `true` exactly when the countdown
    /// crosses zero on this tick.
    pub fn tick(&mut self, delta: f32) -> bool {
        if self.remaining <= 0.0 {
            return false;
        }
        self.remaining -= delta;
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            return true;
        }
        false
    }

    /// Whether the countdown has reached zero.
    pub fn is_done(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Seconds remaining.
    pub fn remaining(&self) -> f32 {
        self.remaining
    }
}
