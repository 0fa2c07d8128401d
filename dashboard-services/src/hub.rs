//! Subscriber registry and broadcast distribution
//!
//! [`FeedHub`] owns the current value of a feed and the set of
//! registered consumer callbacks. Subscribing replays the current
//! value immediately and synchronously, so consumers never wait for
//! the next tick to render an initial state. Broadcasts run against a
//! copy of the registration list taken when the broadcast starts:
//! subscribe/unsubscribe calls made from inside a callback only affect
//! subsequent broadcasts.

use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Identity of a registered subscriber, used for removal
pub type SubscriberId = u64;

type Callback<T> = Box<dyn FnMut(&T) + Send>;

struct Registered<T> {
    id: SubscriberId,
    callback: Arc<Mutex<Callback<T>>>,
}

impl<T> Clone for Registered<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Arc::clone(&self.callback),
        }
    }
}

struct HubInner<T> {
    current: T,
    subscribers: Vec<Registered<T>>,
    next_id: SubscriberId,
}

/// Shared broadcast hub for one feed (snapshots or simulated prices)
pub struct FeedHub<T> {
    name: String,
    inner: Arc<Mutex<HubInner<T>>>,
}

impl<T> Clone for FeedHub<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> FeedHub<T> {
    /// Create a hub with the initial (pre-first-tick) value
    pub fn new(name: impl Into<String>, initial: T) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(Mutex::new(HubInner {
                current: initial,
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Register a consumer callback
    ///
    /// The callback is invoked immediately with the current value
    /// before this method returns. The returned [`Subscription`]
    /// removes the callback when dropped or explicitly unsubscribed.
    pub fn subscribe(&self, callback: impl FnMut(&T) + Send + 'static) -> Subscription<T> {
        let callback: Arc<Mutex<Callback<T>>> = Arc::new(Mutex::new(Box::new(callback)));

        let (id, replay) = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push(Registered {
                id,
                callback: Arc::clone(&callback),
            });
            (id, inner.current.clone())
        };

        debug!("[{}] subscriber {} registered", self.name, id);

        // Immediate replay, outside the registry lock so the callback
        // may itself subscribe or unsubscribe.
        Self::invoke(&self.name, id, &callback, &replay);

        Subscription {
            hub: self.clone(),
            id,
        }
    }

    /// Broadcast a new value to every registered subscriber
    ///
    /// The registration list is copied before any callback runs, and
    /// no hub lock is held while callbacks execute. Callbacks fire in
    /// registration order.
    pub fn publish(&self, value: T) {
        let subscribers = {
            let mut inner = self.inner.lock();
            inner.current = value.clone();
            inner.subscribers.clone()
        };

        for subscriber in &subscribers {
            Self::invoke(&self.name, subscriber.id, &subscriber.callback, &value);
        }
    }

    /// Latest published value (the initial value before any publish)
    pub fn current(&self) -> T {
        self.inner.lock().current.clone()
    }

    /// Number of currently registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    fn remove(&self, id: SubscriberId) {
        let mut inner = self.inner.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|s| s.id != id);
        if inner.subscribers.len() < before {
            debug!("[{}] subscriber {} removed", self.name, id);
        }
    }

    /// Invoke one callback, isolating panics so a failing consumer
    /// never blocks delivery to the rest.
    fn invoke(name: &str, id: SubscriberId, callback: &Arc<Mutex<Callback<T>>>, value: &T) {
        let result = catch_unwind(AssertUnwindSafe(|| {
            (callback.lock())(value);
        }));

        if result.is_err() {
            warn!(
                "[{}] subscriber {} callback panicked; continuing broadcast",
                name, id
            );
        }
    }
}

/// Handle returned by [`FeedHub::subscribe`]
///
/// Dropping the handle unsubscribes the callback. Removal during an
/// in-progress broadcast takes effect starting with the next
/// broadcast.
pub struct Subscription<T> {
    hub: FeedHub<T>,
    id: SubscriberId,
}

impl<T> Subscription<T> {
    /// Explicitly remove the callback
    pub fn unsubscribe(self) {
        // Drop does the removal.
    }

    /// Identity of this subscriber
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        let mut inner = self.hub.inner.lock();
        inner.subscribers.retain(|s| s.id != self.id);
    }
}
