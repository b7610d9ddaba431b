//! Subscriber registry
//!
//! Callbacks run synchronously after a snapshot is published. While they run
//! the registry reports [`SubscriberRegistry::is_notifying`], which the
//! manager checks before accepting any mutating intent. A callback that tries
//! to mutate its own manager is refused instead of starting another round of
//! notifications.

use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
    sync::Arc,
};

use crate::model::pagination::PaginationState;

type Callback = Rc<dyn Fn(&Arc<PaginationState>)>;

#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(u64, Callback)>>,
    notifying: Cell<bool>,
}

/// Handle returned by `subscribe`
///
/// Dropping the handle keeps the callback registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    /// Remove the callback; returns `false` if it was already gone
    pub fn unsubscribe(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove(self.id))
    }

    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.contains(self.id))
    }
}

/// Resets the notifying flag even if a callback panics
struct NotifyGuard<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl Drop for NotifyGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

impl SubscriberRegistry {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn subscribe(
        self: &Rc<Self>,
        callback: impl Fn(&Arc<PaginationState>) + 'static,
    ) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        self.entries.borrow_mut().push((id, Rc::new(callback)));
        Subscription {
            id,
            registry: Rc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    fn contains(&self, id: u64) -> bool {
        self.entries.borrow().iter().any(|(entry_id, _)| *entry_id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn is_notifying(&self) -> bool {
        self.notifying.get()
    }

    /// Call every registered callback with `state`; returns how many ran
    ///
    /// The callback list is copied first, so callbacks may subscribe or
    /// unsubscribe while being notified. Changes take effect next round.
    pub fn notify(&self, state: &Arc<PaginationState>) -> usize {
        let callbacks: Vec<Callback> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        let _guard = NotifyGuard {
            flag: &self.notifying,
            previous: self.notifying.replace(true),
        };
        for callback in &callbacks {
            callback(state);
        }
        callbacks.len()
    }
}
