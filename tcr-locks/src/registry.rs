//! File-lock registry (component B).
//!
//! An in-process, mutex-guarded registry of leased exclusive locks keyed
//! by path pattern. Intentionally process-local: durability comes from
//! the workflow runtime above it, not from this registry.

use crate::pattern::patterns_overlap;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockEntry {
    pub pattern: String,
    pub holder: String,
    pub exclusive: bool,
    pub acquired_at: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
}

impl LockEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }
}

#[derive(Debug, Clone)]
pub struct AcquireRequest {
    pub pattern: String,
    pub holder: String,
    pub exclusive: bool,
    pub ttl: Duration,
}

impl AcquireRequest {
    pub fn exclusive(pattern: impl Into<String>, holder: impl Into<String>, ttl: Duration) -> Self {
        Self {
            pattern: pattern.into(),
            holder: holder.into(),
            exclusive: true,
            ttl,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AcquireOutcome {
    pub granted: bool,
    pub conflicts: Vec<LockEntry>,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("holder mismatch on {pattern}: held by {actual}, requested by {attempted}")]
    HolderMismatch {
        pattern: String,
        actual: String,
        attempted: String,
    },
    #[error("no lock held for pattern {0}")]
    NotHeld(String),
}

#[derive(Debug, thiserror::Error)]
#[error("batch acquire failed on pattern {pattern}: {} conflicting holder(s)", conflicts.len())]
pub struct BatchAcquireError {
    pub pattern: String,
    pub conflicts: Vec<LockEntry>,
}

/// Single-mutex, leased lock registry keyed by path pattern.
#[derive(Default)]
pub struct LockRegistry {
    inner: Mutex<HashMap<String, LockEntry>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    fn gc(map: &mut HashMap<String, LockEntry>) {
        let now = Utc::now();
        map.retain(|_, entry| !entry.is_expired(now));
    }

    /// Acquire a lock, granting it iff no live entry's pattern overlaps
    /// this pattern (for exclusive requests: under any holder).
    pub fn acquire(&self, request: AcquireRequest) -> AcquireOutcome {
        let mut map = self.inner.lock();
        Self::gc(&mut map);

        let conflicts: Vec<LockEntry> = map
            .values()
            .filter(|entry| {
                let would_conflict = request.exclusive || entry.exclusive;
                would_conflict && patterns_overlap(&entry.pattern, &request.pattern)
            })
            .cloned()
            .collect();

        if !conflicts.is_empty() {
            warn!(pattern = %request.pattern, holder = %request.holder, conflicts = conflicts.len(), "lock acquire conflict");
            return AcquireOutcome {
                granted: false,
                conflicts,
            };
        }

        let now = Utc::now();
        let expiry = now + ChronoDuration::from_std(request.ttl).unwrap_or_else(|_| ChronoDuration::zero());
        debug!(pattern = %request.pattern, holder = %request.holder, "lock granted");
        map.insert(
            request.pattern.clone(),
            LockEntry {
                pattern: request.pattern,
                holder: request.holder,
                exclusive: request.exclusive,
                acquired_at: now,
                expiry,
            },
        );
        AcquireOutcome {
            granted: true,
            conflicts: Vec::new(),
        }
    }

    /// Release a lock. Idempotent: releasing a pattern with no live
    /// entry is a no-op, not an error.
    pub fn release(&self, pattern: &str, holder: &str) -> Result<(), LockError> {
        let mut map = self.inner.lock();
        if let Some(entry) = map.get(pattern) {
            if entry.holder != holder {
                return Err(LockError::HolderMismatch {
                    pattern: pattern.to_string(),
                    actual: entry.holder.clone(),
                    attempted: holder.to_string(),
                });
            }
            map.remove(pattern);
            debug!(pattern, holder, "lock released");
        }
        Ok(())
    }

    /// Release every lock held by `holder`, ignoring patterns they
    /// don't hold. Used by the saga's lock-release compensation, which
    /// releases "all locks held under the task's cell identifier"
    /// rather than naming each pattern individually.
    pub fn release_all_for_holder(&self, holder: &str) -> usize {
        let mut map = self.inner.lock();
        let patterns: Vec<String> = map
            .values()
            .filter(|entry| entry.holder == holder)
            .map(|entry| entry.pattern.clone())
            .collect();
        for pattern in &patterns {
            map.remove(pattern);
        }
        patterns.len()
    }

    pub fn renew(&self, pattern: &str, holder: &str, ttl: Duration) -> Result<(), LockError> {
        let mut map = self.inner.lock();
        Self::gc(&mut map);
        match map.get_mut(pattern) {
            Some(entry) if entry.holder == holder => {
                entry.expiry = Utc::now() + ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::zero());
                Ok(())
            }
            Some(entry) => Err(LockError::HolderMismatch {
                pattern: pattern.to_string(),
                actual: entry.holder.clone(),
                attempted: holder.to_string(),
            }),
            None => Err(LockError::NotHeld(pattern.to_string())),
        }
    }

    /// Acquire every request or none: on the first conflict, every
    /// entry already granted earlier in this batch is released before
    /// the conflict is surfaced.
    pub fn batch_acquire(
        &self,
        requests: Vec<AcquireRequest>,
    ) -> Result<Vec<AcquireOutcome>, BatchAcquireError> {
        let mut granted: Vec<(String, String)> = Vec::new();
        let mut outcomes = Vec::with_capacity(requests.len());

        for request in requests {
            let pattern = request.pattern.clone();
            let holder = request.holder.clone();
            let outcome = self.acquire(request);
            if !outcome.granted {
                for (p, h) in granted.into_iter().rev() {
                    let _ = self.release(&p, &h);
                }
                return Err(BatchAcquireError {
                    pattern,
                    conflicts: outcome.conflicts,
                });
            }
            granted.push((pattern, holder));
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn ttl() -> StdDuration {
        StdDuration::from_secs(60)
    }

    #[test]
    fn acquire_grants_when_no_overlap() {
        let registry = LockRegistry::new();
        let outcome = registry.acquire(AcquireRequest::exclusive("a.go", "holder1", ttl()));
        assert!(outcome.granted);
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn acquire_conflicts_on_overlap() {
        let registry = LockRegistry::new();
        assert!(registry.acquire(AcquireRequest::exclusive("a/*.go", "holder1", ttl())).granted);
        let second = registry.acquire(AcquireRequest::exclusive("a/b.go", "holder2", ttl()));
        assert!(!second.granted);
        assert_eq!(second.conflicts.len(), 1);
    }

    #[test]
    fn release_is_idempotent_on_missing_entry() {
        let registry = LockRegistry::new();
        assert!(registry.release("never-acquired.go", "holder1").is_ok());
    }

    #[test]
    fn release_fails_on_holder_mismatch() {
        let registry = LockRegistry::new();
        registry.acquire(AcquireRequest::exclusive("a.go", "holder1", ttl()));
        let err = registry.release("a.go", "holder2").unwrap_err();
        matches!(err, LockError::HolderMismatch { .. });
    }

    #[test]
    fn released_pattern_can_be_reacquired() {
        let registry = LockRegistry::new();
        registry.acquire(AcquireRequest::exclusive("a.go", "holder1", ttl()));
        registry.release("a.go", "holder1").unwrap();
        let outcome = registry.acquire(AcquireRequest::exclusive("a.go", "holder2", ttl()));
        assert!(outcome.granted);
    }

    #[test]
    fn expired_entry_is_garbage_collected_on_read() {
        let registry = LockRegistry::new();
        registry.acquire(AcquireRequest::exclusive("a.go", "holder1", StdDuration::from_millis(0)));
        std::thread::sleep(StdDuration::from_millis(5));
        let outcome = registry.acquire(AcquireRequest::exclusive("a.go", "holder2", ttl()));
        assert!(outcome.granted);
    }

    #[test]
    fn renew_extends_expiry_for_matching_holder() {
        let registry = LockRegistry::new();
        registry.acquire(AcquireRequest::exclusive("a.go", "holder1", StdDuration::from_millis(10)));
        registry.renew("a.go", "holder1", ttl()).unwrap();
        std::thread::sleep(StdDuration::from_millis(20));
        let outcome = registry.acquire(AcquireRequest::exclusive("a.go", "holder2", ttl()));
        assert!(!outcome.granted);
    }

    #[test]
    fn renew_fails_on_missing_entry() {
        let registry = LockRegistry::new();
        let err = registry.renew("missing.go", "holder1", ttl()).unwrap_err();
        matches!(err, LockError::NotHeld(_));
    }

    #[test]
    fn batch_acquire_rolls_back_on_conflict() {
        let registry = LockRegistry::new();
        registry.acquire(AcquireRequest::exclusive("p2.go", "other", ttl()));

        let requests = vec![
            AcquireRequest::exclusive("p1.go", "holder1", ttl()),
            AcquireRequest::exclusive("p2.go", "holder1", ttl()),
            AcquireRequest::exclusive("p3.go", "holder1", ttl()),
        ];
        let err = registry.batch_acquire(requests).unwrap_err();
        assert_eq!(err.pattern, "p2.go");

        // p1 must have been rolled back; p2 is still held by "other".
        assert!(registry.release("p1.go", "holder1").is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn release_all_for_holder_clears_only_that_holder() {
        let registry = LockRegistry::new();
        registry.acquire(AcquireRequest::exclusive("a.go", "holder1", ttl()));
        registry.acquire(AcquireRequest::exclusive("b.go", "holder1", ttl()));
        registry.acquire(AcquireRequest::exclusive("c.go", "holder2", ttl()));

        let released = registry.release_all_for_holder("holder1");
        assert_eq!(released, 2);
        assert_eq!(registry.len(), 1);
    }
}
