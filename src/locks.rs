//! Named mutual exclusion for read-modify-write cycles on a parent object.
//!
//! A registry is owned by the provider and shared with every resource
//! handler. Locks are keyed by a resource-type namespace plus the parent
//! object ID, created on first use, and retained for the registry's lifetime.

use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lock name; the object ID is lowercased so that every spelling of one
/// GUID maps to the same lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey {
    namespace: String,
    object_id: String,
}

impl LockKey {
    pub fn new(namespace: impl Into<String>, object_id: &str) -> Self {
        Self {
            namespace: namespace.into(),
            object_id: object_id.to_ascii_lowercase(),
        }
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.object_id)
    }
}

#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: AsyncMutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for and acquires the lock for `namespace` + `object_id`.
    ///
    /// The wait has no timeout. The lock is released when the returned guard
    /// is dropped, on every exit path of the caller.
    pub async fn lock(&self, namespace: &str, object_id: &str) -> NamedLockGuard {
        let key = LockKey::new(namespace, object_id);
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        debug!("Locking {key}");
        let guard = lock.lock_owned().await;
        debug!("Locked {key}");
        NamedLockGuard { key, _guard: guard }
    }

    /// Number of distinct names ever locked through this registry.
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Held lock for one name; dropping it unlocks.
pub struct NamedLockGuard {
    key: LockKey,
    _guard: OwnedMutexGuard<()>,
}

impl NamedLockGuard {
    pub fn key(&self) -> &LockKey {
        &self.key
    }
}

impl fmt::Debug for NamedLockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedLockGuard")
            .field("key", &self.key)
            .finish()
    }
}

impl Drop for NamedLockGuard {
    fn drop(&mut self) {
        debug!("Unlocking {}", self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::LockRegistry;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    const APP: &str = "11111111-1111-1111-1111-111111111111";
    const OTHER: &str = "22222222-2222-2222-2222-222222222222";

    #[tokio::test]
    async fn same_name_is_exclusive_until_guard_drops() {
        let registry = Arc::new(LockRegistry::new());
        let guard = registry.lock("azuread_application", APP).await;

        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let _guard = registry.lock("azuread_application", APP).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter acquired lock")
            .expect("join");
    }

    #[tokio::test]
    async fn different_objects_and_namespaces_do_not_block() {
        let registry = LockRegistry::new();
        let _app = registry.lock("azuread_application", APP).await;

        timeout(
            Duration::from_millis(200),
            registry.lock("azuread_application", OTHER),
        )
        .await
        .expect("other object id");
        timeout(
            Duration::from_millis(200),
            registry.lock("azuread_service_principal", APP),
        )
        .await
        .expect("other namespace");
    }

    #[tokio::test]
    async fn object_id_case_does_not_split_the_lock() {
        const UPPER: &str = "ABCDEF01-1111-1111-1111-111111111111";
        const LOWER: &str = "abcdef01-1111-1111-1111-111111111111";
        let registry = Arc::new(LockRegistry::new());
        let guard = registry.lock("azuread_application", UPPER).await;
        assert_eq!(guard.key().to_string(), format!("azuread_application.{LOWER}"));

        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let _guard = registry.lock("azuread_application", LOWER).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter acquired lock")
            .expect("join");
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn locks_are_retained_after_release() {
        let registry = LockRegistry::new();
        assert!(registry.is_empty().await);
        drop(registry.lock("azuread_group", APP).await);
        drop(registry.lock("azuread_group", APP).await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn release_happens_on_early_return() {
        async fn failing_step(registry: &LockRegistry, flag: &AtomicBool) -> Result<(), ()> {
            let _guard = registry.lock("azuread_application", APP).await;
            flag.store(true, Ordering::SeqCst);
            Err(())
        }

        let registry = LockRegistry::new();
        let flag = AtomicBool::new(false);
        assert!(failing_step(&registry, &flag).await.is_err());
        assert!(flag.load(Ordering::SeqCst));
        timeout(
            Duration::from_millis(200),
            registry.lock("azuread_application", APP),
        )
        .await
        .expect("lock released after error");
    }
}
