//! Observable current-session state.
//!
//! A `Session` is an explicit, constructed value handed to whoever needs it
//! (the HTTP client, the route guard, UI code); there is no ambient global.
//! Cloning is cheap and every clone observes the same state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::db::Role;

/// Who is currently logged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub username: String,
    pub role: Role,
}

type Callback = Box<dyn FnMut(Option<&SessionUser>) + Send>;

struct Subscriber {
    id: u64,
    callback: Callback,
}

/// The single source of truth for the current session.
///
/// `set`/`clear` update the snapshot first and then notify subscribers
/// synchronously, in subscription order, so a subscriber that reads
/// [`Session::current`] from inside its callback already sees the new
/// value. New subscribers immediately receive the latest value.
///
/// Callbacks must not subscribe or unsubscribe reentrantly.
#[derive(Clone)]
pub struct Session {
    current: Arc<Mutex<Option<SessionUser>>>,
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    next_id: Arc<AtomicU64>,
}

impl Session {
    /// A new session, initially logged out.
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Synchronous snapshot of the current session.
    pub fn current(&self) -> Option<SessionUser> {
        self.current.lock().unwrap().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.lock().unwrap().is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.current.lock().unwrap().as_ref().map(|user| user.role)
    }

    /// Replace the snapshot and notify all subscribers.
    pub fn set(&self, user: SessionUser) {
        *self.current.lock().unwrap() = Some(user.clone());
        self.notify(Some(&user));
    }

    /// Clear the snapshot (logout or forced teardown) and notify.
    pub fn clear(&self) {
        *self.current.lock().unwrap() = None;
        self.notify(None);
    }

    /// Register a callback for every transition. It is invoked immediately
    /// with the latest value, then on every `set`/`clear` until the
    /// returned [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(Option<&SessionUser>) + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let snapshot = self.current();

        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.push(Subscriber {
            id,
            callback: Box::new(callback),
        });

        // Replay-of-one: the new subscriber sees the current value at once.
        if let Some(subscriber) = subscribers.last_mut() {
            (subscriber.callback)(snapshot.as_ref());
        }

        Subscription {
            subscribers: Arc::clone(&self.subscribers),
            id,
        }
    }

    fn notify(&self, value: Option<&SessionUser>) {
        let mut subscribers = self.subscribers.lock().unwrap();
        for subscriber in subscribers.iter_mut() {
            (subscriber.callback)(value);
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for an active subscription; dropping it unsubscribes.
pub struct Subscription {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|s| s.id != self.id);
        }
    }
}
