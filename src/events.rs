//! Typed listener registry with explicit unsubscribe handles
//!
//! Listeners run synchronously in registration order. A panicking listener is
//! caught and logged; the remaining listeners still run.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use log::error;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ListenerList<T> = Mutex<Vec<(u64, Listener<T>)>>;

/// Synchronous event emitter
pub struct EventEmitter<T> {
    listeners: Arc<ListenerList<T>>,
    next_id: AtomicU64,
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<T: 'static> EventEmitter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it stays registered until the returned
    /// handle's [`Subscription::unsubscribe`] is called.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push((id, Arc::new(listener)));
        }

        let weak: Weak<ListenerList<T>> = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = weak.upgrade()
                && let Ok(mut listeners) = listeners.lock()
            {
                listeners.retain(|(lid, _)| *lid != id);
            }
        })
    }

    /// Deliver `event` to every listener, returning how many completed
    /// without panicking.
    pub fn emit(&self, event: &T) -> usize {
        // Snapshot so listeners may (un)subscribe while being called
        let snapshot: Vec<(u64, Listener<T>)> = match self.listeners.lock() {
            Ok(listeners) => listeners.clone(),
            Err(_) => return 0,
        };

        let mut delivered = 0;
        for (id, listener) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(()) => delivered += 1,
                Err(panic) => error!("Listener {} failed: {}", id, panic_message(&*panic)),
            }
        }
        delivered
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle returned by a subscribe call.
///
/// Dropping the handle does NOT unsubscribe; call [`Subscription::unsubscribe`].
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    remove: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    pub fn new<F>(remove: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            remove: Mutex::new(Some(Box::new(remove))),
        }
    }

    /// Remove the listener. Calling this more than once is harmless.
    pub fn unsubscribe(&self) {
        let remove = self.remove.lock().ok().and_then(|mut r| r.take());
        if let Some(remove) = remove {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let active = self.remove.lock().map(|r| r.is_some()).unwrap_or(false);
        f.debug_struct("Subscription").field("active", &active).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listeners_run_in_registration_order() {
        let emitter = EventEmitter::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let _a = {
            let seen = Arc::clone(&seen);
            emitter.subscribe(move |v| seen.lock().unwrap().push(("a", *v)))
        };
        let _b = {
            let seen = Arc::clone(&seen);
            emitter.subscribe(move |v| seen.lock().unwrap().push(("b", *v)))
        };

        assert_eq!(emitter.emit(&7), 2);
        assert_eq!(*seen.lock().unwrap(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn test_unsubscribe_removes_listener() {
        let emitter = EventEmitter::<()>::new();
        let count = Arc::new(AtomicU64::new(0));

        let sub = {
            let count = Arc::clone(&count);
            emitter.subscribe(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        emitter.emit(&());
        sub.unsubscribe();
        sub.unsubscribe();
        emitter.emit(&());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let emitter = EventEmitter::<()>::new();
        let reached = Arc::new(AtomicU64::new(0));

        let _bad = emitter.subscribe(|_| panic!("boom"));
        let _good = {
            let reached = Arc::clone(&reached);
            emitter.subscribe(move |_| {
                reached.fetch_add(1, Ordering::SeqCst);
            })
        };

        assert_eq!(emitter.emit(&()), 1);
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_may_unsubscribe_itself() {
        let emitter = EventEmitter::<()>::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let sub = {
            let slot = Arc::clone(&slot);
            emitter.subscribe(move |_| {
                if let Some(sub) = slot.lock().unwrap().take() {
                    sub.unsubscribe();
                }
            })
        };
        *slot.lock().unwrap() = Some(sub);

        emitter.emit(&());
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn test_unsubscribe_after_emitter_dropped() {
        let emitter = EventEmitter::<()>::new();
        let sub = emitter.subscribe(|_| {});
        drop(emitter);
        sub.unsubscribe();
    }
}
