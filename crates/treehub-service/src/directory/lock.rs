//! In-process subtree locks.
//!
//! A mutation takes an exclusive lock on the node it rewrites and shared
//! locks on every directory whose chain it reads. Locks are always
//! acquired in ascending id order, so two operations can never wait on
//! each other in a cycle.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use uuid::Uuid;

#[derive(Debug)]
enum Held {
    Shared(#[allow(dead_code)] OwnedRwLockReadGuard<()>),
    Exclusive(#[allow(dead_code)] OwnedRwLockWriteGuard<()>),
}

/// Table of per-node locks shared by every service of one process.
#[derive(Debug, Clone, Default)]
pub struct SubtreeLocks {
    locks: Arc<DashMap<Uuid, Arc<RwLock<()>>>>,
}

impl SubtreeLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire `exclusive` ids for writing and `shared` ids for reading.
    ///
    /// An id listed in both is taken exclusively. The returned guard
    /// releases everything on drop.
    pub async fn acquire(&self, exclusive: &[Uuid], shared: &[Uuid]) -> SubtreeGuard {
        let mut wanted: BTreeMap<Uuid, bool> = BTreeMap::new();
        for id in shared {
            wanted.entry(*id).or_insert(false);
        }
        for id in exclusive {
            wanted.insert(*id, true);
        }

        let mut held = Vec::with_capacity(wanted.len());
        for (id, is_exclusive) in wanted {
            let lock = self.locks.entry(id).or_default().clone();
            let guard = if is_exclusive {
                Held::Exclusive(lock.write_owned().await)
            } else {
                Held::Shared(lock.read_owned().await)
            };
            held.push((id, guard));
        }

        SubtreeGuard {
            locks: Arc::clone(&self.locks),
            held,
        }
    }

    /// Number of ids with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no lock entries are live.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Locks held for the duration of one mutation.
#[derive(Debug)]
pub struct SubtreeGuard {
    locks: Arc<DashMap<Uuid, Arc<RwLock<()>>>>,
    held: Vec<(Uuid, Held)>,
}

impl Drop for SubtreeGuard {
    fn drop(&mut self) {
        let ids: Vec<Uuid> = self.held.drain(..).map(|(id, _)| id).collect();
        // Entries nobody else references are pruned so the table stays small.
        for id in ids {
            self.locks
                .remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
        }
    }
}
