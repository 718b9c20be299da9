//! Cabinet ECS - Entity Component System
//!
//! The shared runtime kernel for the Cabinet arcade games. Entities are
//! generational handles over sparse-set component columns; views are
//! incrementally-maintained subsets of entities matching a required/excluded
//! component predicate; game systems read views and record deferred
//! mutations that the world applies atomically at its per-frame sync point.
//!
//! The world is single-threaded by contract: one game instance owns one
//! world, driven by the host's frame loop.

mod column;
mod entity;
mod events;
mod queue;
mod resource;
mod system;
mod view;
mod world;

pub use column::Component;
pub use entity::Entity;
pub use events::{EventError, EventResult, HandlerId};
pub use system::{Schedule, System};
pub use view::{ViewDesc, ViewId};
pub use world::World;
