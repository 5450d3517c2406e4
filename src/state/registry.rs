//! Visited registry: the at-most-once gate for crawl nodes

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Set of canonical resource keys already claimed for processing
///
/// The only way to enter the set is [`VisitedRegistry::claim`], which tests
/// membership and inserts under a single lock acquisition. Entries are never
/// removed for the lifetime of the registry.
#[derive(Debug, Default)]
pub struct VisitedRegistry {
    claimed: Mutex<HashSet<String>>,
}

impl VisitedRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claims a key
    ///
    /// Returns `true` if the caller is the first and only claimant of `key`,
    /// `false` if it was already claimed.
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_spider::state::VisitedRegistry;
    ///
    /// let registry = VisitedRegistry::new();
    /// assert!(registry.claim("https://example.com/"));
    /// assert!(!registry.claim("https://example.com/"));
    /// ```
    pub fn claim(&self, key: &str) -> bool {
        let mut claimed = self.lock();
        if claimed.contains(key) {
            return false;
        }
        claimed.insert(key.to_string())
    }

    /// Returns whether a key has been claimed
    ///
    /// Informational only: gating traversal on this followed by a claim
    /// would reopen the race that `claim` closes.
    pub fn is_claimed(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    /// Returns the number of claimed keys
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns whether no key has been claimed yet
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        // The set is never left half-updated, so a poisoned lock is still usable
        self.claimed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
