//! Typed observer lists.
//!
//! Stateful slicing components own an [`Observers`] list per event type. The
//! presentation layer subscribes closures; the core never knows who listens.

use std::fmt;

/// Handle returned by [`Observers::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Callbacks interested in events of type `E`.
pub struct Observers<E> {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, Box<dyn FnMut(&E)>)>,
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            callbacks: Vec::new(),
        }
    }
}

impl<E> fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.callbacks.len())
            .finish()
    }
}

impl<E> Observers<E> {
    /// Register a callback.
    pub fn subscribe(&mut self, callback: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(sid, _)| *sid != id);
        self.callbacks.len() != before
    }

    /// Deliver an event to every callback, in subscription order.
    pub fn notify(&mut self, event: &E) {
        for (_, callback) in &mut self.callbacks {
            callback(event);
        }
    }

    /// True if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}
