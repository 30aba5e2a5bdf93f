//! Time-bounded memoization for remote fetches.
//!
//! The cache is an explicit component with an injectable clock rather than
//! hidden process-wide state, so callers stay testable: tests drive a
//! [`ManualClock`] instead of sleeping through the TTL.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Source of "now" for TTL checks.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock advanced by hand, for tests.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset: std::cell::Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock {
            start: Instant::now(),
            offset: std::cell::Cell::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.offset.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Maps keys to values for a bounded time window.
///
/// Entries older than the TTL are treated as absent; they are overwritten
/// on the next insert rather than evicted eagerly, which is fine for the
/// handful of keys the remote client produces.
pub struct TtlCache<K, V, C = SystemClock> {
    ttl: Duration,
    clock: C,
    entries: HashMap<K, (Instant, V)>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V, SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<K: Eq + Hash, V: Clone, C: Clock> TtlCache<K, V, C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        TtlCache {
            ttl,
            clock,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let (stored_at, value) = self.entries.get(key)?;
        if self.clock.now().duration_since(*stored_at) < self.ttl {
            Some(value.clone())
        } else {
            None
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, (self.clock.now(), value));
    }

    /// Returns the cached value, or runs `fetch` and caches its result.
    /// A failed fetch caches nothing.
    pub fn get_or_try_insert<E>(
        &mut self,
        key: K,
        fetch: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E>
    where
        K: Clone,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let value = fetch()?;
        self.insert(key, value.clone());
        Ok(value)
    }
}
