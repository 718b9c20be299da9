//! Per-world event bus
//!
//! Named channels with arbitrary payloads, used for cross-system signals
//! ("score", "gameover") that do not belong in the component data model. The
//! bus is a plain field of the world (composition, not a mixin), and emits
//! are best-effort: a failing handler is logged and the rest still run.

use std::any::Any;
use std::collections::HashMap;

use crate::world::World;

/// Identifies a registered handler so it can be unregistered later.
pub type HandlerId = u64;

/// Error returned by an event handler. Emit logs these and moves on.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct EventError(pub String);

impl EventError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type EventResult = Result<(), EventError>;

type Handler = Box<dyn FnMut(&mut World, &dyn Any) -> EventResult>;

/// Bookkeeping for a channel whose handler list is out for dispatch.
struct InFlight {
    /// Ids of the handlers that were taken.
    taken: Vec<HandlerId>,
    /// Ids unregistered while the dispatch was in flight. Honored when the
    /// list is restored.
    removed: Vec<HandlerId>,
}

pub(crate) struct EventBus {
    channels: HashMap<String, Vec<(HandlerId, Handler)>>,
    in_flight: HashMap<String, InFlight>,
    next_id: HandlerId,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
            in_flight: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn on(&mut self, event: &str, handler: Handler) -> HandlerId {
        let id = self.next_id;
        self.next_id += 1;
        self.channels
            .entry(event.to_owned())
            .or_default()
            .push((id, handler));
        id
    }

    pub fn off(&mut self, event: &str, id: HandlerId) -> bool {
        if let Some(handlers) = self.channels.get_mut(event) {
            let before = handlers.len();
            handlers.retain(|(hid, _)| *hid != id);
            if handlers.len() != before {
                return true;
            }
        }
        // The handler may belong to a list that is currently dispatched.
        if let Some(in_flight) = self.in_flight.get_mut(event) {
            if in_flight.taken.contains(&id) && !in_flight.removed.contains(&id) {
                in_flight.removed.push(id);
                return true;
            }
        }
        false
    }

    /// Swap out the handler list for dispatch. Handlers registered while the
    /// list is out accumulate in a fresh channel entry.
    ///
    /// A dispatch abandoned by a panicking handler never restores; its taken
    /// handlers are dropped with the unwind, and the leftover in-flight entry
    /// is cleared here on the next emit.
    pub fn take(&mut self, event: &str) -> Vec<(HandlerId, Handler)> {
        self.in_flight.remove(event);
        let handlers = self.channels.remove(event).unwrap_or_default();
        if !handlers.is_empty() {
            self.in_flight.insert(
                event.to_owned(),
                InFlight {
                    taken: handlers.iter().map(|(id, _)| *id).collect(),
                    removed: Vec::new(),
                },
            );
        }
        handlers
    }

    /// Put a dispatched list back, applying any `off` calls made during the
    /// dispatch and keeping handlers registered during it (they will fire on
    /// the next emit).
    pub fn restore(&mut self, event: &str, mut handlers: Vec<(HandlerId, Handler)>) {
        if handlers.is_empty() {
            return;
        }
        if let Some(in_flight) = self.in_flight.remove(event) {
            handlers.retain(|(id, _)| !in_flight.removed.contains(id));
        }
        let channel = self.channels.entry(event.to_owned()).or_default();
        let added_during_dispatch = std::mem::take(channel);
        *channel = handlers;
        channel.extend(added_during_dispatch);
        if channel.is_empty() {
            self.channels.remove(event);
        }
    }
}
