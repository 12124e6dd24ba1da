//! Handler registration and dispatch
//!
//! [`EventBus`] keeps handlers per event key and calls them synchronously on
//! [`EventBus::emit`]. Storage backends use it to announce writes so that
//! views can reload instead of trusting a cached copy of the links.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Identifies a registered handler so it can be removed again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// A registered event handler
pub type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Event handlers keyed by event
pub struct EventBus<K, T> {
    handlers: Mutex<HashMap<K, Vec<(HandlerId, Handler<T>)>>>,
    next_id: AtomicU64,
}

impl<K, T> Default for EventBus<K, T> {
    fn default() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<K, T> EventBus<K, T>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event`
    pub fn on<F>(&self, event: K, handler: F) -> HandlerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock()
            .entry(event)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler, returning whether it was registered
    pub fn off(&self, event: &K, id: HandlerId) -> bool {
        let mut handlers = self.lock();
        let Some(list) = handlers.get_mut(event) else {
            return false;
        };

        let before = list.len();
        list.retain(|(handler_id, _)| *handler_id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(event);
        }
        removed
    }

    /// Call every handler registered for `event`, returning how many ran
    ///
    /// Handlers run after the registry lock is released, so a handler may
    /// register or remove handlers itself.
    pub fn emit(&self, event: &K, payload: &T) -> usize {
        let handlers: Vec<Handler<T>> = match self.lock().get(event) {
            Some(list) => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
            None => return 0,
        };

        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    /// Number of handlers registered for `event`
    pub fn handler_count(&self, event: &K) -> usize {
        self.lock().get(event).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Vec<(HandlerId, Handler<T>)>>> {
        // A panicking handler never runs under the lock
        self.handlers.lock().unwrap_or_else(|e| e.into_inner())
    }
}
