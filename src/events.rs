//! Typed synchronous publish/subscribe.
//!
//! The [`EventManager`] is a side channel next to the ECS core: systems
//! register handlers for event types they care about, and a broadcast
//! invokes every handler for that type synchronously, on the calling
//! thread, in registration order. There are no further ordering or
//! concurrency guarantees, and the ECS core does not depend on this module.
//!
//! Handler storage is keyed by `TypeId`; the bus sits off the per-entity
//! hot path, so the dynamic lookup costs one hash per broadcast, not per
//! entity.

use std::any::{Any, TypeId};
use std::collections::HashMap;

type HandlerList<E> = Vec<Box<dyn FnMut(&E)>>;

/// Registry of event handlers, one list per event type.
#[derive(Default)]
pub struct EventManager {
    handlers: HashMap<TypeId, Box<dyn Any>>,
}

impl EventManager {
    /// Create an event manager with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of type `E`.
    ///
    /// Handlers for one event type run in the order they were registered.
    pub fn register_handler<E: 'static>(&mut self, handler: impl FnMut(&E) + 'static) {
        self.handlers
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(HandlerList::<E>::new()))
            .downcast_mut::<HandlerList<E>>()
            .expect("handler list stored under a foreign TypeId")
            .push(Box::new(handler));
    }

    /// Invoke every handler registered for `E`, in registration order.
    ///
    /// Dispatch is synchronous: this returns only after the last handler.
    /// Broadcasting an event type with no handlers is a no-op.
    pub fn broadcast<E: 'static>(&mut self, event: E) {
        let Some(slot) = self.handlers.get_mut(&TypeId::of::<E>()) else {
            return;
        };
        let list = slot
            .downcast_mut::<HandlerList<E>>()
            .expect("handler list stored under a foreign TypeId");
        tracing::trace!(handlers = list.len(), "broadcasting event");
        for handler in list.iter_mut() {
            handler(&event);
        }
    }

    /// Number of handlers registered for `E`.
    pub fn handler_count<E: 'static>(&self) -> usize {
        self.handlers
            .get(&TypeId::of::<E>())
            .and_then(|slot| slot.downcast_ref::<HandlerList<E>>())
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventManager")
            .field("event_types", &self.handlers.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
