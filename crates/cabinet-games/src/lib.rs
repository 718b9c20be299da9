//! Cabinet Games - arcade game logic on the shared ECS
//!
//! Each game module follows the same shape: plain component types, one
//! resource struct holding the game's global state, system builder functions
//! that register their views once and return per-frame callables, and a
//! `new_world` constructor wiring entities, resource, and event handlers.

pub mod breakout;
pub mod runner;
pub mod snake;

pub use runner::GameLoop;
