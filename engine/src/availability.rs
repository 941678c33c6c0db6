//! Availability gate: a TTL cache over room joinability
//!
//! The join path asks "is this room still worth trying?" through a
//! read-through cache so a hot room does not recompute the answer on every
//! attempt. Cached decisions live for at most the TTL; within that window a
//! stale positive can slip through, which is why admission re-checks
//! capacity and stock authoritatively before mutating anything. The gate is
//! an optimization, never a lock.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::types::RoomId;

/// Default lifetime of a cached decision
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct CachedDecision {
    joinable: bool,
    cached_at: Instant,
}

/// Read-through TTL cache of joinability decisions
///
/// Interior mutability via a mutex so the gate can sit behind an `Arc` in
/// the environment; the lock is held only for map operations.
#[derive(Debug)]
pub struct AvailabilityGate {
    ttl: Duration,
    cache: Mutex<HashMap<RoomId, CachedDecision>>,
}

impl AvailabilityGate {
    /// Create a gate with the default 60 second TTL
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a gate with a custom TTL
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached decision for a room, computing it on a miss
    ///
    /// `compute` runs only when no fresh entry exists; its result is cached
    /// for the TTL. Entries past their TTL are dropped lazily.
    pub fn check(&self, room_id: RoomId, compute: impl FnOnce() -> bool) -> bool {
        // Mutex poisoning is unrecoverable here.
        #[allow(clippy::unwrap_used)]
        let mut cache = self.cache.lock().unwrap();

        let now = Instant::now();
        if let Some(entry) = cache.get(&room_id) {
            if now.duration_since(entry.cached_at) < self.ttl {
                return entry.joinable;
            }
        }

        cache.retain(|_, entry| now.duration_since(entry.cached_at) < self.ttl);

        let joinable = compute();
        cache.insert(
            room_id,
            CachedDecision {
                joinable,
                cached_at: now,
            },
        );
        joinable
    }

    /// Number of live cache entries, for diagnostics
    #[must_use]
    pub fn cached_entries(&self) -> usize {
        #[allow(clippy::unwrap_used)]
        let cache = self.cache.lock().unwrap();
        cache.len()
    }
}

impl Default for AvailabilityGate {
    fn default() -> Self {
        Self::new()
    }
}
