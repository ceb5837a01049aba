//! Fetch, modify and write back sub-object collections of a parent object.
//!
//! Every mutation runs under the parent-scoped named lock and always
//! re-fetches the parent before writing, because the remote collection can
//! only be replaced as a whole.

use crate::error::Error;
use crate::id::{same_id, ObjectSubResourceId};
use crate::locks::LockRegistry;
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

mod links;

pub(crate) use links::{LinkReconciler, LinkStore};

/// Element of a parent's array-valued field, addressed by its key ID.
pub(crate) trait SubObject: Clone + Send + Sync + 'static {
    fn key_id(&self) -> Option<&str>;

    fn has_key(&self, key_id: &str) -> bool {
        self.key_id().is_some_and(|own| same_id(own, key_id))
    }

    /// Replacement that must be written back before the element can be
    /// removed, when the API refuses to drop it in its current state.
    fn prepare_removal(&self) -> Option<Self> {
        None
    }
}

/// Parent-object client narrowed to one collection.
///
/// `fetch` returns `Ok(None)` when the parent object does not exist.
#[async_trait]
pub(crate) trait CollectionStore<T: SubObject>: Send + Sync {
    async fn fetch(&self, object_id: &str) -> Result<Option<Vec<T>>, Error>;

    async fn replace(&self, object_id: &str, items: Vec<T>) -> Result<(), Error>;
}

#[async_trait]
impl<T, S> CollectionStore<T> for Arc<S>
where
    T: SubObject,
    S: CollectionStore<T> + ?Sized,
{
    async fn fetch(&self, object_id: &str) -> Result<Option<Vec<T>>, Error> {
        (**self).fetch(object_id).await
    }

    async fn replace(&self, object_id: &str, items: Vec<T>) -> Result<(), Error> {
        (**self).replace(object_id, items).await
    }
}

/// Maps a not-found API error to `Ok(None)`.
pub(crate) fn found<T>(result: Result<T, Error>) -> Result<Option<T>, Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Names used for locking and diagnostics by one sub-object resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Target {
    pub resource_type: &'static str,
    pub lock_namespace: &'static str,
    /// Human label of the parent, e.g. `application`.
    pub parent: &'static str,
    /// Configuration attribute holding the parent object ID.
    pub parent_attr: &'static str,
    /// Human label of the sub-object, e.g. `password credential`.
    pub what: &'static str,
    pub kind: &'static str,
}

impl Target {
    fn retrieving(&self, object_id: &str) -> String {
        format!("Retrieving {} with object ID {object_id:?}", self.parent)
    }

    fn parent_not_found(&self, object_id: &str) -> Error {
        Error::ParentNotFound {
            parent: self.parent,
            attribute: self.parent_attr,
            object_id: object_id.to_string(),
        }
    }
}

pub(crate) struct Reconciler<'a> {
    locks: &'a LockRegistry,
    target: Target,
}

impl<'a> Reconciler<'a> {
    pub(crate) fn new(locks: &'a LockRegistry, target: Target) -> Self {
        Self { locks, target }
    }

    /// Appends `item` to the parent's collection and returns its identity.
    ///
    /// Fails with [`Error::AlreadyExists`] without writing when the key ID is
    /// already present.
    pub(crate) async fn create<T, S>(
        &self,
        store: &S,
        object_id: &str,
        item: T,
    ) -> Result<ObjectSubResourceId, Error>
    where
        T: SubObject,
        S: CollectionStore<T> + ?Sized,
    {
        let target = &self.target;
        let key_id = item.key_id().unwrap_or_default().to_string();
        let id = ObjectSubResourceId::new(object_id, target.kind, key_id.as_str());

        let _lock = self.locks.lock(target.lock_namespace, object_id).await;
        let mut items = self.fetch_existing(store, object_id).await?;
        if items
            .iter()
            .any(|existing| existing.has_key(&key_id))
        {
            return Err(Error::AlreadyExists {
                resource_type: target.resource_type,
                id: id.to_string(),
            });
        }
        items.push(item);
        store.replace(object_id, items).await.map_err(|e| {
            e.context(
                format!("Adding {} for {} with object ID {object_id:?}", target.what, target.parent),
                None,
            )
        })?;
        Ok(id)
    }

    /// Looks up the sub-object named by `id`.
    ///
    /// `Ok(None)` means the parent or the sub-object is gone and the resource
    /// should be dropped from tracking.
    pub(crate) async fn read<T, S>(
        &self,
        store: &S,
        id: &ObjectSubResourceId,
    ) -> Result<Option<T>, Error>
    where
        T: SubObject,
        S: CollectionStore<T> + ?Sized,
    {
        let target = &self.target;
        let Some(items) = self.fetch(store, &id.object_id).await? else {
            debug!(
                "{} with object ID {:?} was not found - removing from state!",
                target.parent, id.object_id
            );
            return Ok(None);
        };
        let found = items
            .into_iter()
            .find(|item| item.has_key(&id.sub_id));
        if found.is_none() {
            debug!(
                "{} {:?} (ID {:?}) was not found - removing from state!",
                target.what, id.sub_id, id.object_id
            );
        }
        Ok(found)
    }

    /// Replaces the element named by `id` in place.
    pub(crate) async fn update<T, S>(
        &self,
        store: &S,
        id: &ObjectSubResourceId,
        item: T,
    ) -> Result<(), Error>
    where
        T: SubObject,
        S: CollectionStore<T> + ?Sized,
    {
        let target = &self.target;
        let object_id = id.object_id.as_str();
        let _lock = self.locks.lock(target.lock_namespace, object_id).await;
        let mut items = self.fetch_existing(store, object_id).await?;
        let slot = items
            .iter_mut()
            .find(|existing| existing.has_key(&id.sub_id))
            .ok_or_else(|| Error::SubObjectNotFound {
                what: target.what,
                parent: target.parent,
                object_id: object_id.to_string(),
                sub_id: id.sub_id.clone(),
            })?;
        *slot = item;
        store.replace(object_id, items).await.map_err(|e| {
            e.context(
                format!(
                    "Updating {} {:?} for {} with object ID {object_id:?}",
                    target.what, id.sub_id, target.parent
                ),
                None,
            )
        })
    }

    /// Removes the element named by `id`. Missing parents and missing
    /// elements both count as already deleted.
    pub(crate) async fn delete<T, S>(&self, store: &S, id: &ObjectSubResourceId) -> Result<(), Error>
    where
        T: SubObject,
        S: CollectionStore<T> + ?Sized,
    {
        let target = &self.target;
        let object_id = id.object_id.as_str();
        let sub_id = id.sub_id.as_str();
        let removing = || {
            format!(
                "Removing {} {sub_id:?} from {} with object ID {object_id:?}",
                target.what, target.parent
            )
        };

        let _lock = self.locks.lock(target.lock_namespace, object_id).await;
        let Some(mut items) = self.fetch(store, object_id).await? else {
            debug!(
                "{} with object ID {object_id:?} was not found - removing from state!",
                target.parent
            );
            return Ok(());
        };

        let staged = items
            .iter()
            .position(|item| item.has_key(sub_id))
            .and_then(|index| items[index].prepare_removal().map(|staged| (index, staged)));
        if let Some((index, staged)) = staged {
            items[index] = staged;
            store
                .replace(object_id, items.clone())
                .await
                .map_err(|e| e.context(removing(), None))?;
        }

        items.retain(|item| !item.has_key(sub_id));
        store
            .replace(object_id, items)
            .await
            .map_err(|e| e.context(removing(), None))
    }

    async fn fetch<T, S>(&self, store: &S, object_id: &str) -> Result<Option<Vec<T>>, Error>
    where
        T: SubObject,
        S: CollectionStore<T> + ?Sized,
    {
        store.fetch(object_id).await.map_err(|e| {
            e.context(
                self.target.retrieving(object_id),
                Some(self.target.parent_attr),
            )
        })
    }

    async fn fetch_existing<T, S>(&self, store: &S, object_id: &str) -> Result<Vec<T>, Error>
    where
        T: SubObject,
        S: CollectionStore<T> + ?Sized,
    {
        self.fetch(store, object_id)
            .await?
            .ok_or_else(|| self.target.parent_not_found(object_id))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{CollectionStore, SubObject};
    use crate::error::{Error, GraphError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct Item {
        pub key: String,
        pub enabled: bool,
    }

    impl Item {
        pub(crate) fn new(key: &str) -> Self {
            Self {
                key: key.to_string(),
                enabled: false,
            }
        }
    }

    impl SubObject for Item {
        fn key_id(&self) -> Option<&str> {
            Some(&self.key)
        }

        fn prepare_removal(&self) -> Option<Self> {
            self.enabled.then(|| Item {
                enabled: false,
                ..self.clone()
            })
        }
    }

    /// In-memory parent store that records writes and detects overlapping
    /// fetch/replace cycles.
    pub(crate) struct MemoryStore<T> {
        pub parents: Mutex<HashMap<String, Vec<T>>>,
        pub writes: Mutex<Vec<Vec<T>>>,
        pub fail_replace: Mutex<Option<u16>>,
        pub delay: Duration,
        pub open_cycles: AtomicUsize,
        pub overlaps: AtomicUsize,
    }

    impl<T> Default for MemoryStore<T> {
        fn default() -> Self {
            Self {
                parents: Mutex::new(HashMap::new()),
                writes: Mutex::new(Vec::new()),
                fail_replace: Mutex::new(None),
                delay: Duration::ZERO,
                open_cycles: AtomicUsize::new(0),
                overlaps: AtomicUsize::new(0),
            }
        }
    }

    impl<T: Clone> MemoryStore<T> {
        pub(crate) fn with_parent(object_id: &str, items: Vec<T>) -> Self {
            let store = Self::default();
            store
                .parents
                .lock()
                .expect("parents")
                .insert(object_id.to_string(), items);
            store
        }

        pub(crate) fn items(&self, object_id: &str) -> Option<Vec<T>> {
            self.parents.lock().expect("parents").get(object_id).cloned()
        }

        pub(crate) fn write_count(&self) -> usize {
            self.writes.lock().expect("writes").len()
        }
    }

    #[async_trait]
    impl<T: SubObject + 'static> CollectionStore<T> for MemoryStore<T> {
        async fn fetch(&self, object_id: &str) -> Result<Option<Vec<T>>, Error> {
            if self.open_cycles.fetch_add(1, Ordering::SeqCst) > 0 {
                self.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            let items = self.items(object_id);
            tokio::time::sleep(self.delay).await;
            if items.is_none() {
                self.open_cycles.fetch_sub(1, Ordering::SeqCst);
            }
            Ok(items)
        }

        async fn replace(&self, object_id: &str, items: Vec<T>) -> Result<(), Error> {
            tokio::time::sleep(self.delay).await;
            let failure = *self.fail_replace.lock().expect("fail");
            if let Some(status) = failure {
                self.open_cycles.store(0, Ordering::SeqCst);
                return Err(Error::Api(GraphError {
                    status,
                    ..GraphError::default()
                }));
            }
            self.writes.lock().expect("writes").push(items.clone());
            self.parents
                .lock()
                .expect("parents")
                .insert(object_id.to_string(), items);
            self.open_cycles.store(0, Ordering::SeqCst);
            Ok(())
        }
    }
}
