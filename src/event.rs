//! Typed publish/subscribe channel.
//!
//! Listeners are registered per event kind. Every listener call is isolated:
//! a panicking listener is logged and the remaining listeners still run.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    fmt,
    panic::{self, AssertUnwindSafe},
    rc::Rc,
};

/// An event that can be sent through an [`EventChannel`].
pub trait Event {
    /// the closed set of event names listeners subscribe to
    type Kind: Copy + Ord + fmt::Debug + 'static;

    fn kind(&self) -> Self::Kind;
}

type Listener<E> = Rc<dyn Fn(&E)>;

struct Listeners<E: Event> {
    next_id: u64,
    by_kind: BTreeMap<E::Kind, Vec<(u64, Listener<E>)>>,
}

impl<E: Event> Listeners<E> {
    fn contains(&self, kind: E::Kind, id: u64) -> bool {
        self.by_kind
            .get(&kind)
            .is_some_and(|listeners| listeners.iter().any(|(other, _)| *other == id))
    }

    fn remove(&mut self, kind: E::Kind, id: u64) {
        if let Some(listeners) = self.by_kind.get_mut(&kind) {
            listeners.retain(|(other, _)| *other != id);
            if listeners.is_empty() {
                self.by_kind.remove(&kind);
            }
        }
    }
}

pub struct EventChannel<E: Event> {
    listeners: Rc<RefCell<Listeners<E>>>,
}

/// Handle returned when subscribing to a channel.
///
/// Dropping it does not detach the listener, call [`Subscription::unsubscribe`].
/// Unsubscribing more than once is a no-op.
#[must_use = "the listener stays attached until `unsubscribe` is called"]
pub struct Subscription {
    cancel: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: RefCell::new(Some(Box::new(cancel))),
        }
    }

    pub fn unsubscribe(&self) {
        let cancel = self.cancel.borrow_mut().take();
        if let Some(cancel) = cancel {
            cancel()
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.borrow().is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

impl<E: Event + 'static> EventChannel<E> {
    pub fn new() -> Self {
        Self {
            listeners: Rc::new(RefCell::new(Listeners {
                next_id: 0,
                by_kind: BTreeMap::new(),
            })),
        }
    }

    pub fn on(&self, kind: E::Kind, listener: impl Fn(&E) + 'static) -> Subscription {
        let id = {
            let mut listeners = self.listeners.borrow_mut();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners
                .by_kind
                .entry(kind)
                .or_default()
                .push((id, Rc::new(listener)));
            id
        };

        let listeners = Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.borrow_mut().remove(kind, id);
            }
        })
    }

    /// call every listener of the event's kind, in subscription order.
    ///
    /// Listeners may subscribe or unsubscribe from within the call. A listener
    /// removed by an earlier listener of the same emission is not called.
    pub fn emit(&self, event: &E) {
        let kind = event.kind();
        let snapshot: Vec<(u64, Listener<E>)> = self
            .listeners
            .borrow()
            .by_kind
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        for (id, listener) in snapshot {
            if !self.listeners.borrow().contains(kind, id) {
                continue;
            }
            if panic::catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                log::error!("listener for {kind:?} event panicked");
            }
        }
    }

    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.listeners
            .borrow()
            .by_kind
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// remove all the listeners of all kinds
    pub fn clear(&self) {
        self.listeners.borrow_mut().by_kind.clear();
    }
}

impl<E: Event + 'static> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> Clone for EventChannel<E> {
    fn clone(&self) -> Self {
        Self {
            listeners: Rc::clone(&self.listeners),
        }
    }
}
