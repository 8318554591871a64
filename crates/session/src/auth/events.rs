//! Session change listeners
//!
//! UI code registers a callback and receives a snapshot of the session after every
//! transition. Callbacks run with no session borrows held, so they may call back into
//! the context.

use super::context::SessionState;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

type Listener = Rc<dyn Fn(&SessionState)>;

/// Registered session listeners
#[derive(Default)]
pub(crate) struct Listeners {
    last_id: Cell<u64>,
    entries: RefCell<Vec<(u64, Listener)>>,
}

impl Listeners {
    /// Register a listener
    pub(crate) fn add(self: &Rc<Self>, listener: Listener) -> Subscription {
        let id = self.last_id.get() + 1;
        self.last_id.set(id);
        self.entries.borrow_mut().push((id, listener));
        Subscription {
            id,
            listeners: Rc::downgrade(self),
        }
    }

    /// Call every listener with `state`
    pub(crate) fn notify(&self, state: &SessionState) {
        let listeners: Vec<Listener> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(state);
        }
    }

    /// Remove all listeners
    pub(crate) fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    fn remove(&self, id: u64) {
        self.entries.borrow_mut().retain(|(entry, _)| *entry != id);
    }
}

/// Handle to a registered listener; dropping it unregisters the listener
#[must_use = "dropping the subscription unregisters the listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    /// Keep the listener registered for the lifetime of the session
    pub fn forget(self) {
        std::mem::forget(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(self.id);
        }
    }
}
