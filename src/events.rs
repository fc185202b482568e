//! Synchronous event channels with RAII subscriptions.
//!
//! [`EventEmitter`] fans one event out to every live listener, on the
//! thread that called [`EventEmitter::emit`]. Listeners stay registered
//! for as long as the returned [`Subscription`] is alive; dropping it
//! unregisters. [`wait_for`] bridges the callback world into async code:
//!
//! ```rust
//! use btree_lang::events::EventEmitter;
//!
//! let emitter: EventEmitter<u32> = EventEmitter::new();
//! let seen = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
//! let sink = seen.clone();
//! let sub = emitter.subscribe(move |n| {
//!     sink.fetch_add(*n, std::sync::atomic::Ordering::SeqCst);
//! });
//! emitter.emit(&3);
//! drop(sub);
//! emitter.emit(&4);
//! assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 3);
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync + 'static>;

struct Listeners<E> {
    next_id: u64,
    entries: Vec<(u64, Listener<E>)>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Listeners {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

/// Multi-listener event channel. Cloning shares the listener table.
pub struct EventEmitter<E> {
    inner: Arc<Mutex<Listeners<E>>>,
}

impl<E> Clone for EventEmitter<E> {
    fn clone(&self) -> Self {
        EventEmitter {
            inner: self.inner.clone(),
        }
    }
}

impl<E> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventEmitter<E> {
    pub fn new() -> Self {
        EventEmitter {
            inner: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    /// Register a listener. It runs on every [`emit`](Self::emit) until the
    /// returned subscription is dropped.
    pub fn subscribe(&self, listener: impl Fn(&E) + Send + Sync + 'static) -> Subscription
    where
        E: 'static,
    {
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push((id, Arc::new(listener)));
            id
        };
        let weak: Weak<Mutex<Listeners<E>>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.lock().entries.retain(|(entry_id, _)| *entry_id != id);
                }
            })),
        }
    }

    /// Deliver `event` to every listener registered at the time of the
    /// call. The listener table is snapshotted first, so a listener may
    /// subscribe or unsubscribe without deadlocking.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = {
            let inner = self.inner.lock();
            inner.entries.iter().map(|(_, l)| l.clone()).collect()
        };
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().entries.len()
    }
}

impl<E> fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Listener registration handle. Dropping it removes the listener; the
/// handle is deliberately type-erased so handles from different emitters
/// can live in one collection.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Remove the listener now instead of at drop time.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Resolve once `filter` returns `Some` for an emitted event.
///
/// Events fired before the call are not replayed. If the emitter goes away
/// without a match the future stays pending, mirroring a promise that is
/// never settled.
pub async fn wait_for<E, T>(
    emitter: &EventEmitter<E>,
    filter: impl Fn(&E) -> Option<T> + Send + Sync + 'static,
) -> T
where
    E: 'static,
    T: Send + 'static,
{
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let subscription = emitter.subscribe(move |event| {
        if let Some(value) = filter(event) {
            let _ = tx.send(value);
        }
    });
    loop {
        match rx.recv().await {
            Some(value) => {
                subscription.unsubscribe();
                return value;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn listeners_run_in_subscription_order() {
        let emitter: EventEmitter<&str> = EventEmitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = log.clone();
        let _a = emitter.subscribe(move |e| first.lock().push(format!("a:{e}")));
        let second = log.clone();
        let _b = emitter.subscribe(move |e| second.lock().push(format!("b:{e}")));

        emitter.emit(&"x");
        assert_eq!(*log.lock(), vec!["a:x".to_string(), "b:x".to_string()]);
    }

    #[test]
    fn dropping_the_subscription_unregisters() {
        let emitter: EventEmitter<u32> = EventEmitter::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let sink = hits.clone();
        let sub = emitter.subscribe(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        emitter.emit(&1);
        assert_eq!(emitter.listener_count(), 1);

        drop(sub);
        emitter.emit(&2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn a_listener_may_subscribe_mid_emit() {
        let emitter: EventEmitter<u32> = EventEmitter::new();
        let inner_subs = Arc::new(Mutex::new(Vec::new()));

        let chained = emitter.clone();
        let held = inner_subs.clone();
        let _outer = emitter.subscribe(move |_| {
            held.lock().push(chained.subscribe(|_| {}));
        });

        emitter.emit(&0);
        assert_eq!(emitter.listener_count(), 2);
        emitter.emit(&0);
        assert_eq!(emitter.listener_count(), 3);
    }

    #[tokio::test]
    async fn wait_for_resolves_on_the_first_match() {
        let emitter: EventEmitter<u32> = EventEmitter::new();

        let waiter = {
            let emitter = emitter.clone();
            tokio::spawn(async move {
                wait_for(&emitter, |n| if *n > 10 { Some(*n) } else { None }).await
            })
        };
        // Give the waiter a chance to subscribe before emitting.
        tokio::task::yield_now().await;
        while emitter.listener_count() == 0 {
            tokio::task::yield_now().await;
        }

        emitter.emit(&3);
        emitter.emit(&42);
        emitter.emit(&99);

        assert_eq!(waiter.await.unwrap(), 42);
        assert_eq!(emitter.listener_count(), 0);
    }
}
