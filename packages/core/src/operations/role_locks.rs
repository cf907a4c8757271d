//! Per-role mutation locks
//!
//! Mutations touching the same role's forest are serialized in-process, so two
//! tasks never interleave their read-then-relink steps on the same chain.
//! Different roles proceed independently up to SQLite's own write lock.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily created async mutex per role
#[derive(Debug, Default)]
pub struct RoleLockTable {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RoleLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `role`'s forest
    pub async fn lock(&self, role: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(role.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Acquire every listed role in sorted order
    ///
    /// Cross-role operations such as full resets take their locks
    /// through here so that two of them cannot deadlock each other.
    pub async fn lock_many(&self, roles: &[String]) -> Vec<OwnedMutexGuard<()>> {
        let mut sorted: Vec<&String> = roles.iter().collect();
        sorted.sort();
        sorted.dedup();

        let mut guards = Vec::with_capacity(sorted.len());
        for role in sorted {
            guards.push(self.lock(role).await);
        }
        guards
    }

    /// Number of roles that have been locked at least once
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
