//! Coalescing of concurrent async calls.
//!
//! [`SingleFlight`] makes sure only one call per key is running at a time.
//! Callers that arrive while a call is in flight are queued and receive a
//! clone of the leader's result, in the order they arrived.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

/// A call currently in flight and the callers queued behind it
struct Flight<V> {
    id: u64,
    waiters: Vec<oneshot::Sender<V>>,
}

/// Keyed single-flight group
pub struct SingleFlight<K, V> {
    flights: Mutex<HashMap<K, Flight<V>>>,
    next_id: AtomicU64,
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flights: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Flight<V>>> {
        self.flights.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` for `key` unless a call for the same key is already running,
    /// in which case wait for that call's result instead.
    ///
    /// Queued callers are resolved in FIFO order before the leader returns.
    /// Returns `None` only when the flight was abandoned: the leader's future
    /// was dropped before finishing, or [`forget_all`](Self::forget_all) ran.
    pub async fn run<F, Fut>(&self, key: K, f: F) -> Option<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let role = {
            let mut flights = self.lock();
            match flights.entry(key.clone()) {
                Entry::Occupied(mut entry) => {
                    let (tx, rx) = oneshot::channel();
                    entry.get_mut().waiters.push(tx);
                    Err(rx)
                }
                Entry::Vacant(entry) => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    entry.insert(Flight {
                        id,
                        waiters: Vec::new(),
                    });
                    Ok(id)
                }
            }
        };

        match role {
            Err(rx) => rx.await.ok(),
            Ok(id) => {
                let guard = LeaderGuard {
                    group: self,
                    key: Some(key),
                    id,
                };
                let value = f().await;
                guard.complete(&value);
                Some(value)
            }
        }
    }

    /// Wait for the in-flight call for `key`, if there is one.
    ///
    /// Returns `None` without waiting when nothing is in flight.
    pub fn join(&self, key: &K) -> Option<Waiter<V>> {
        let mut flights = self.lock();
        let flight = flights.get_mut(key)?;
        let (tx, rx) = oneshot::channel();
        flight.waiters.push(tx);
        Some(Waiter { rx })
    }

    /// Whether a call for `key` is currently running.
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.lock().contains_key(key)
    }

    /// Number of keys with a call in flight.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no call is in flight.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every in-flight record. Queued callers resolve with `None` and
    /// the next call for any key starts a fresh flight.
    pub fn forget_all(&self) {
        self.lock().clear();
    }

    fn finish(&self, key: &K, id: u64) -> Vec<oneshot::Sender<V>> {
        let mut flights = self.lock();
        match flights.get(key) {
            Some(flight) if flight.id == id => flights
                .remove(key)
                .map(|flight| flight.waiters)
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

/// Handle returned by [`SingleFlight::join`]
#[derive(Debug)]
pub struct Waiter<V> {
    rx: oneshot::Receiver<V>,
}

impl<V> Waiter<V> {
    /// Wait for the leader's result. `None` if the flight was abandoned.
    pub async fn wait(self) -> Option<V> {
        self.rx.await.ok()
    }
}

/// Removes the flight record when the leader finishes or is dropped.
struct LeaderGuard<'a, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    group: &'a SingleFlight<K, V>,
    key: Option<K>,
    id: u64,
}

impl<K, V> LeaderGuard<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn complete(mut self, value: &V) {
        if let Some(key) = self.key.take() {
            for waiter in self.group.finish(&key, self.id) {
                let _ = waiter.send(value.clone());
            }
        }
    }
}

impl<K, V> Drop for LeaderGuard<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            // Dropping the senders wakes every waiter with `None`.
            drop(self.group.finish(&key, self.id));
        }
    }
}
