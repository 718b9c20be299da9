//! Deferred mutation queue
//!
//! Systems never mutate entities mid-iteration; they record intents here and
//! the world applies the batch at its sync point. The queue sits behind a
//! `RefCell` so intents can be recorded through a shared borrow while a view
//! iteration is in flight. The world is single-threaded and exclusively owned
//! by one game instance, so interior mutability is sound here.

use std::cell::RefCell;

use crate::entity::Entity;
use crate::world::World;

/// A recorded, not-yet-applied instruction against the world.
pub(crate) enum Intent {
    /// Spawn an entity, then run the seeding closure on it.
    Spawn(Box<dyn FnOnce(&mut World, Entity)>),
    /// Despawn an entity (no-op if already gone by apply time).
    Despawn(Entity),
    /// Arbitrary deferred action. Insert/remove/update intents all lower to
    /// this form; their closures carry the liveness checks.
    Apply(Box<dyn FnOnce(&mut World)>),
}

pub(crate) struct CommandQueue {
    pending: RefCell<Vec<Intent>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            pending: RefCell::new(Vec::new()),
        }
    }

    /// Record an intent. Shared borrow on purpose: this is called while view
    /// iterations hold shared borrows of the world.
    pub fn push(&self, intent: Intent) {
        self.pending.borrow_mut().push(intent);
    }

    /// Take the current batch, leaving the queue empty. Intents recorded
    /// after this call land in the next batch.
    pub fn take(&mut self) -> Vec<Intent> {
        self.pending.get_mut().split_off(0)
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }
}
