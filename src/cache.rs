//! Bounded, expiring get-or-compute cache with single-flight semantics.
//!
//! Every key maps to a slot holding a `watch` receiver. The first request for
//! a key spawns the computation as its own task and every later request waits
//! on the same channel, so a caller that gives up never cancels the work for
//! anyone else.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::{CachePolicy, Expiry};
use crate::error::{PlanetError, Result};

/// Cache statistics for monitoring
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served by a finished or in-flight entry
    pub hits: usize,
    /// Requests that had to start a computation
    pub misses: usize,
    /// Computations started
    pub computations: usize,
    /// Entries dropped to stay within `max_entries`
    pub evictions: usize,
    /// Entries dropped because their lifetime ran out
    pub expirations: usize,
    /// Current number of slots, including in-flight ones
    pub entries: usize,
}

impl CacheStats {
    /// Calculate hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f32 / total as f32
        }
    }

    /// Format as human-readable string
    pub fn summary(&self) -> String {
        format!(
            "Hits: {} | Misses: {} | Rate: {:.1}% | Computed: {} | Evicted: {} | Expired: {} | Entries: {}",
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.computations,
            self.evictions,
            self.expirations,
            self.entries
        )
    }
}

type Outcome<V> = Option<Result<V>>;

struct Slot<V> {
    rx: watch::Receiver<Outcome<V>>,
    generation: u64,
    /// Set once the computation has produced a value
    written_at: Option<Instant>,
    last_access: Instant,
    access_tick: u64,
}

impl<V> Slot<V> {
    fn is_expired(&self, expiry: Expiry, now: Instant) -> bool {
        let Some(written_at) = self.written_at else {
            return false;
        };
        match expiry {
            Expiry::Never => false,
            Expiry::AfterWrite { secs } => now.duration_since(written_at) >= Duration::from_secs(secs),
            Expiry::AfterAccess { secs } => now.duration_since(self.last_access) >= Duration::from_secs(secs),
        }
    }

    fn touch(&mut self, now: Instant, tick: u64) {
        self.last_access = now;
        self.access_tick = tick;
    }
}

struct CacheState<K, V> {
    slots: HashMap<K, Slot<V>>,
    tick: u64,
    next_generation: u64,
    stats: CacheStats,
}

/// Memoizing map from `K` to `V`.
///
/// Cloning an `AsyncCache` yields another handle to the same entries.
pub struct AsyncCache<K, V> {
    name: &'static str,
    policy: CachePolicy,
    state: Arc<Mutex<CacheState<K, V>>>,
}

impl<K, V> Clone for AsyncCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            policy: self.policy,
            state: Arc::clone(&self.state),
        }
    }
}

impl<K, V> AsyncCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, policy: CachePolicy) -> Self {
        Self {
            name,
            policy,
            state: Arc::new(Mutex::new(CacheState {
                slots: HashMap::new(),
                tick: 0,
                next_generation: 0,
                stats: CacheStats::default(),
            })),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<K, V>> {
        lock_state(&self.state)
    }

    /// Return the cached value for `key`, or run `compute` to produce it.
    ///
    /// Concurrent callers for one key share a single computation. A failed
    /// computation is reported to every waiter and then forgotten, so the
    /// next request retries.
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let (rx, generation) = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let now = Instant::now();
            state.tick += 1;
            let tick = state.tick;

            let expired = state
                .slots
                .get(&key)
                .is_some_and(|slot| slot.is_expired(self.policy.expiry, now));
            if expired {
                state.slots.remove(&key);
                state.stats.expirations += 1;
            }

            if let Some(slot) = state.slots.get_mut(&key) {
                slot.touch(now, tick);
                let found = (slot.rx.clone(), slot.generation);
                state.stats.hits += 1;
                found
            } else {
                state.stats.misses += 1;
                state.stats.computations += 1;
                self.make_room(state, now);

                let generation = state.next_generation;
                state.next_generation += 1;
                let (tx, rx) = watch::channel(None);
                state.slots.insert(
                    key.clone(),
                    Slot {
                        rx: rx.clone(),
                        generation,
                        written_at: None,
                        last_access: now,
                        access_tick: tick,
                    },
                );

                let future = compute();
                let shared = Arc::clone(&self.state);
                let name = self.name;
                let key = key.clone();
                tokio::spawn(async move {
                    let result = future.await;
                    {
                        let mut state = lock_state(&shared);
                        let current = state.slots.get(&key).is_some_and(|s| s.generation == generation);
                        if current {
                            if let Err(e) = &result {
                                debug!(cache = name, error = %e, "computation failed");
                                state.slots.remove(&key);
                            } else if let Some(slot) = state.slots.get_mut(&key) {
                                slot.written_at = Some(Instant::now());
                            }
                        }
                    }
                    // Nobody waiting is fine; the value stays cached.
                    let _ = tx.send(Some(result));
                });
                (rx, generation)
            }
        };

        self.wait(key, rx, generation).await
    }

    async fn wait(&self, key: K, mut rx: watch::Receiver<Outcome<V>>, generation: u64) -> Result<V> {
        if let Ok(outcome) = rx.wait_for(Option::is_some).await {
            if let Some(result) = &*outcome {
                return result.clone();
            }
        }

        // The computing task panicked or was dropped before sending.
        warn!(cache = self.name, "in-flight computation ended without a result");
        let mut state = self.lock();
        if state.slots.get(&key).is_some_and(|s| s.generation == generation) {
            state.slots.remove(&key);
        }
        Err(PlanetError::Aborted(format!("{} computation dropped", self.name)))
    }

    /// Store a finished value, replacing any existing entry.
    pub fn insert(&self, key: K, value: V) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let now = Instant::now();
        state.tick += 1;
        let tick = state.tick;
        if !state.slots.contains_key(&key) {
            self.make_room(state, now);
        }
        let generation = state.next_generation;
        state.next_generation += 1;
        let (_tx, rx) = watch::channel(Some(Ok(value)));
        state.slots.insert(
            key,
            Slot {
                rx,
                generation,
                written_at: Some(now),
                last_access: now,
                access_tick: tick,
            },
        );
    }

    /// The finished value for `key`, without computing anything.
    pub fn get_if_present(&self, key: &K) -> Option<V> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let now = Instant::now();
        state.tick += 1;
        let tick = state.tick;
        let expiry = self.policy.expiry;

        let slot = state.slots.get_mut(key)?;
        if slot.is_expired(expiry, now) {
            state.slots.remove(key);
            state.stats.expirations += 1;
            return None;
        }
        let value = match &*slot.rx.borrow() {
            Some(Ok(value)) => value.clone(),
            _ => return None,
        };
        slot.touch(now, tick);
        state.stats.hits += 1;
        Some(value)
    }

    pub fn invalidate(&self, key: &K) {
        self.lock().slots.remove(key);
    }

    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entries: state.slots.len(),
            ..state.stats
        }
    }

    /// Free a slot when the cache is full: expired entries go first, then the
    /// least recently used finished entry. In-flight entries are never evicted.
    fn make_room(&self, state: &mut CacheState<K, V>, now: Instant) {
        if state.slots.len() < self.policy.max_entries {
            return;
        }

        let expiry = self.policy.expiry;
        let before = state.slots.len();
        state.slots.retain(|_, slot| !slot.is_expired(expiry, now));
        state.stats.expirations += before - state.slots.len();

        while state.slots.len() >= self.policy.max_entries {
            let victim = state
                .slots
                .iter()
                .filter(|(_, slot)| slot.written_at.is_some())
                .min_by_key(|(_, slot)| slot.access_tick)
                .map(|(key, _)| key.clone());
            let Some(victim) = victim else {
                break;
            };
            state.slots.remove(&victim);
            state.stats.evictions += 1;
            debug!(cache = self.name, "evicted least recently used entry");
        }
    }
}

fn lock_state<K, V>(state: &Mutex<CacheState<K, V>>) -> MutexGuard<'_, CacheState<K, V>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
