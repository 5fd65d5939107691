#![forbid(unsafe_code)]

//! Projections the designer publishes to hosts.
//!
//! The designer owns four of these: the current document handle, the
//! undo/redo availability flags, the interaction state and the last history
//! notice. A host reads them, compares [`Observable::version`] to skip
//! redundant redraws, or registers a callback with
//! [`Observable::subscribe`].
//!
//! Hosts never write. `set` and `update` are crate-private, so a projection
//! changes only as the result of a commit, undo, redo or selection call.
//! A callback stays registered while its [`Subscription`] is alive.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::trace_span;
use web_time::Instant;

type Listener<T> = Rc<dyn Fn(&T)>;
type WeakListener<T> = Weak<dyn Fn(&T)>;

struct Slot<T> {
    value: T,
    version: u64,
    /// Entries whose guard was dropped linger until the next change.
    subscribers: Vec<WeakListener<T>>,
}

/// Shared handle to one designer projection.
///
/// Clones point at the same slot, so a host may keep its own copy while the
/// designer keeps publishing through another.
///
/// # Invariants
///
/// 1. Every write that changes the value bumps `version` by one; an equal
///    write leaves value, version and callbacks untouched.
/// 2. Callbacks see the value after the write, in the order they were
///    registered.
/// 3. No borrow is held while callbacks run, so a callback may read the
///    projection it listens to.
pub struct Observable<T> {
    inner: Rc<RefCell<Slot<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    #[must_use]
    pub(crate) fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Slot {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value; subscribers run only when it actually changed.
    ///
    /// Returns whether the value changed.
    pub(crate) fn set(&self, value: T) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return false;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
        true
    }

    /// Modify the value in place; subscribers run only when it changed.
    pub(crate) fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            let old = inner.value.clone();
            f(&mut inner.value);
            if inner.value == old {
                false
            } else {
                inner.version += 1;
                true
            }
        };
        if changed {
            self.notify();
        }
        changed
    }

    /// Subscribe to value changes.
    ///
    /// Returns a [`Subscription`] guard. Dropping the guard unsubscribes
    /// the callback.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: Listener<T> = Rc::new(callback);
        let weak = Rc::downgrade(&strong);
        self.inner.borrow_mut().subscribers.push(weak);
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Change counter; equal between two reads means nothing was published.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    fn notify(&self) {
        // Collect first so no borrow is held while callbacks run.
        let callbacks: Vec<Listener<T>> = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            inner
                .subscribers
                .iter()
                .filter_map(Weak::upgrade)
                .collect()
        };
        if callbacks.is_empty() {
            return;
        }

        let value = self.inner.borrow().value.clone();
        let started = Instant::now();
        let span = trace_span!(
            "observable.notify",
            subscribers = callbacks.len() as u64,
            duration_us = tracing::field::Empty
        );
        let _entered = span.enter();
        for cb in &callbacks {
            cb(&value);
        }
        span.record("duration_us", started.elapsed().as_micros() as u64);
    }
}

/// Keeps a projection callback registered. Drop it to stop listening.
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
