//! Per-identity serialisation of reconciliation calls
//!
//! Two cycles against the same trigger must not interleave their remote
//! calls. Distinct triggers never share a lock. Entries live only while a
//! cycle holds or waits for them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as TableMutex, MutexGuard as TableGuard, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use trigger_types::TriggerIdentity;

type LockTable = Arc<TableMutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Exclusive access to one identity; released and pruned on drop
#[derive(Debug)]
pub struct IdentityGuard {
    table: LockTable,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for IdentityGuard {
    fn drop(&mut self) {
        // Release first so the table holds the only reference to our lock
        self.held.take();
        // Waiters keep their own clone, so only idle entries are removed
        lock_table(&self.table).retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

/// Table of one mutex per trigger identity
#[derive(Debug, Default, Clone)]
pub struct IdentityLocks {
    locks: LockTable,
}

impl IdentityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `identity`
    pub async fn acquire(&self, identity: &TriggerIdentity) -> IdentityGuard {
        let lock = lock_table(&self.locks)
            .entry(lock_key(identity))
            .or_default()
            .clone();
        let held = lock.lock_owned().await;
        IdentityGuard {
            table: self.locks.clone(),
            held: Some(held),
        }
    }

    /// Number of identities currently held or waited on
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock_table(&self.locks).len()
    }
}

/// The table is only touched in short non-panicking sections
fn lock_table(
    table: &TableMutex<HashMap<String, Arc<Mutex<()>>>>,
) -> TableGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resource groups are case-insensitive remotely, so are the lock keys
fn lock_key(identity: &TriggerIdentity) -> String {
    format!(
        "{}/{}/{}/{}",
        identity.subscription_id,
        identity.resource_group.to_lowercase(),
        identity.factory_name,
        identity.trigger_name
    )
}
