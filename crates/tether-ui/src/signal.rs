//! Zero-argument change notification.
//!
//! Widgets own one [`Signal`] per geometry axis. Layout bindings connect to
//! it and recompute whenever it is emitted.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A signal callback, optionally tied to the lifetime of an owner.
///
/// Once the owner is dropped the callback is never invoked again and the
/// signal forgets it.
pub struct Subscription {
    callback: Box<dyn Fn()>,
    owner: Option<Weak<dyn Any>>,
}

impl Subscription {
    /// A callback that lives as long as the signal.
    pub fn new(callback: impl Fn() + 'static) -> Self {
        Self { callback: Box::new(callback), owner: None }
    }

    /// A callback that lives as long as `owner`.
    pub fn owned_by<T: 'static>(owner: &Rc<T>, callback: impl Fn() + 'static) -> Self {
        let owner: Weak<T> = Rc::downgrade(owner);
        let owner: Weak<dyn Any> = owner;
        Self { callback: Box::new(callback), owner: Some(owner) }
    }

    pub fn is_live(&self) -> bool {
        self.owner.as_ref().is_none_or(|owner| owner.strong_count() > 0)
    }

    pub fn invoke(&self) {
        (self.callback)();
    }
}

/// A list of callbacks invoked synchronously on [`emit`](Signal::emit).
///
/// There is no explicit disconnect. Subscriptions made with
/// [`Subscription::owned_by`] are dropped once their owner is gone.
#[derive(Default)]
pub struct Signal {
    slots: RefCell<Vec<Rc<Subscription>>>,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, callback: impl Fn() + 'static) {
        self.subscribe(Subscription::new(callback));
    }

    pub fn subscribe(&self, subscription: Subscription) {
        let dead = self.prune();
        self.slots.borrow_mut().push(Rc::new(subscription));
        drop(dead);
    }

    /// Invoke every live callback connected so far.
    ///
    /// Callbacks connected while emitting run from the next emission on.
    pub fn emit(&self) {
        drop(self.prune());

        let slots: Vec<Rc<Subscription>> = self.slots.borrow().clone();
        for slot in slots {
            // an earlier callback may have dropped this one's owner
            if slot.is_live() {
                slot.invoke();
            }
        }
    }

    /// Number of live callbacks.
    pub fn len(&self) -> usize {
        self.slots.borrow().iter().filter(|slot| slot.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove dead slots, handing them back so they are dropped unborrowed.
    fn prune(&self) -> Vec<Rc<Subscription>> {
        let mut slots = self.slots.borrow_mut();
        let (live, dead): (Vec<_>, Vec<_>) = std::mem::take(&mut *slots)
            .into_iter()
            .partition(|slot| slot.is_live());
        *slots = live;
        dead
    }
}
