use super::Target;
use crate::error::Error;
use crate::id::{same_id, ObjectSubResourceId};
use crate::locks::LockRegistry;
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

/// Directory links of a parent (group members or owners), which are added
/// and removed one at a time instead of by collection replacement.
///
/// `list` returns `Ok(None)` when the parent object does not exist.
#[async_trait]
pub(crate) trait LinkStore: Send + Sync {
    async fn list(&self, object_id: &str) -> Result<Option<Vec<String>>, Error>;

    async fn add(&self, object_id: &str, linked_id: &str) -> Result<(), Error>;

    async fn remove(&self, object_id: &str, linked_id: &str) -> Result<(), Error>;
}

#[async_trait]
impl<S: LinkStore + ?Sized> LinkStore for Arc<S> {
    async fn list(&self, object_id: &str) -> Result<Option<Vec<String>>, Error> {
        (**self).list(object_id).await
    }

    async fn add(&self, object_id: &str, linked_id: &str) -> Result<(), Error> {
        (**self).add(object_id, linked_id).await
    }

    async fn remove(&self, object_id: &str, linked_id: &str) -> Result<(), Error> {
        (**self).remove(object_id, linked_id).await
    }
}

pub(crate) struct LinkReconciler<'a> {
    locks: &'a LockRegistry,
    target: Target,
}

impl<'a> LinkReconciler<'a> {
    pub(crate) fn new(locks: &'a LockRegistry, target: Target) -> Self {
        Self { locks, target }
    }

    pub(crate) async fn create<S: LinkStore + ?Sized>(
        &self,
        store: &S,
        object_id: &str,
        linked_id: &str,
    ) -> Result<ObjectSubResourceId, Error> {
        let target = &self.target;
        let id = ObjectSubResourceId::new(object_id, target.kind, linked_id);

        let _lock = self.locks.lock(target.lock_namespace, object_id).await;
        let linked = self
            .list(store, object_id)
            .await?
            .ok_or_else(|| target.parent_not_found(object_id))?;
        if linked.iter().any(|existing| same_id(existing, linked_id)) {
            return Err(Error::AlreadyExists {
                resource_type: target.resource_type,
                id: id.to_string(),
            });
        }
        store.add(object_id, linked_id).await.map_err(|e| {
            e.context(
                format!(
                    "Adding {} {linked_id:?} to {} with object ID {object_id:?}",
                    target.what, target.parent
                ),
                None,
            )
        })?;
        Ok(id)
    }

    /// Returns whether the link named by `id` still exists.
    pub(crate) async fn read<S: LinkStore + ?Sized>(
        &self,
        store: &S,
        id: &ObjectSubResourceId,
    ) -> Result<bool, Error> {
        let target = &self.target;
        let Some(linked) = self.list(store, &id.object_id).await? else {
            debug!(
                "{} with object ID {:?} was not found - removing from state!",
                target.parent, id.object_id
            );
            return Ok(false);
        };
        let present = linked.iter().any(|existing| same_id(existing, &id.sub_id));
        if !present {
            debug!(
                "{} {:?} of {} {:?} was not found - removing from state!",
                target.what, id.sub_id, target.parent, id.object_id
            );
        }
        Ok(present)
    }

    pub(crate) async fn delete<S: LinkStore + ?Sized>(
        &self,
        store: &S,
        id: &ObjectSubResourceId,
    ) -> Result<(), Error> {
        let target = &self.target;
        let object_id = id.object_id.as_str();
        let linked_id = id.sub_id.as_str();

        let _lock = self.locks.lock(target.lock_namespace, object_id).await;
        let Some(linked) = self.list(store, object_id).await? else {
            debug!(
                "{} with object ID {object_id:?} was not found - removing from state!",
                target.parent
            );
            return Ok(());
        };
        if !linked.iter().any(|existing| same_id(existing, linked_id)) {
            return Ok(());
        }
        match store.remove(object_id, linked_id).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                debug!("{} {linked_id:?} was already removed", target.what);
                Ok(())
            }
            Err(err) => Err(err.context(
                format!(
                    "Removing {} {linked_id:?} from {} with object ID {object_id:?}",
                    target.what, target.parent
                ),
                None,
            )),
        }
    }

    async fn list<S: LinkStore + ?Sized>(
        &self,
        store: &S,
        object_id: &str,
    ) -> Result<Option<Vec<String>>, Error> {
        store.list(object_id).await.map_err(|e| {
            e.context(
                self.target.retrieving(object_id),
                Some(self.target.parent_attr),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{LinkReconciler, LinkStore};
    use crate::error::{Error, GraphError};
    use crate::locks::LockRegistry;
    use crate::reconcile::Target;
    use crate::id::{same_id, ObjectSubResourceId};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const GROUP: &str = "11111111-1111-1111-1111-111111111111";
    const USER: &str = "22222222-2222-2222-2222-222222222222";
    const OTHER: &str = "33333333-3333-3333-3333-333333333333";

    const TARGET: Target = Target {
        resource_type: "azuread_group_member",
        lock_namespace: "azuread_group",
        parent: "group",
        parent_attr: "group_object_id",
        what: "member",
        kind: "member",
    };

    #[derive(Default)]
    struct MemoryLinks {
        groups: Mutex<HashMap<String, Vec<String>>>,
        removals: Mutex<Vec<String>>,
        remove_status: Option<u16>,
    }

    impl MemoryLinks {
        fn with_group(members: &[&str]) -> Self {
            let links = Self::default();
            links.groups.lock().expect("groups").insert(
                GROUP.to_string(),
                members.iter().map(|m| m.to_string()).collect(),
            );
            links
        }

        fn members(&self) -> Vec<String> {
            self.groups.lock().expect("groups")[GROUP].clone()
        }
    }

    #[async_trait]
    impl LinkStore for MemoryLinks {
        async fn list(&self, object_id: &str) -> Result<Option<Vec<String>>, Error> {
            Ok(self.groups.lock().expect("groups").get(object_id).cloned())
        }

        async fn add(&self, object_id: &str, linked_id: &str) -> Result<(), Error> {
            self.groups
                .lock()
                .expect("groups")
                .entry(object_id.to_string())
                .or_default()
                .push(linked_id.to_string());
            Ok(())
        }

        async fn remove(&self, object_id: &str, linked_id: &str) -> Result<(), Error> {
            self.removals.lock().expect("removals").push(linked_id.to_string());
            if let Some(status) = self.remove_status {
                return Err(Error::Api(GraphError {
                    status,
                    ..GraphError::default()
                }));
            }
            if let Some(members) = self.groups.lock().expect("groups").get_mut(object_id) {
                members.retain(|m| m != linked_id);
            }
            Ok(())
        }
    }

    fn member_id(member: &str) -> ObjectSubResourceId {
        ObjectSubResourceId::new(GROUP, "member", member)
    }

    #[tokio::test]
    async fn create_adds_link_and_rejects_duplicates() {
        let locks = LockRegistry::new();
        let links = MemoryLinks::with_group(&[OTHER]);
        let reconciler = LinkReconciler::new(&locks, TARGET);

        let id = reconciler.create(&links, GROUP, USER).await.expect("create");
        assert_eq!(id.to_string(), format!("{GROUP}/member/{USER}"));
        assert_eq!(links.members(), vec![OTHER.to_string(), USER.to_string()]);

        let err = reconciler.create(&links, GROUP, USER).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
        assert_eq!(links.members().len(), 2);
    }

    #[tokio::test]
    async fn create_on_missing_group_fails() {
        let locks = LockRegistry::new();
        let err = LinkReconciler::new(&locks, TARGET)
            .create(&MemoryLinks::default(), GROUP, USER)
            .await
            .unwrap_err();
        assert_eq!(err.attribute(), Some("group_object_id"));
    }

    #[tokio::test]
    async fn read_reports_presence() {
        let locks = LockRegistry::new();
        let reconciler = LinkReconciler::new(&locks, TARGET);
        let links = MemoryLinks::with_group(&[USER]);
        assert!(reconciler.read(&links, &member_id(USER)).await.expect("read"));
        assert!(!reconciler.read(&links, &member_id(OTHER)).await.expect("read"));
        assert!(!reconciler
            .read(&MemoryLinks::default(), &member_id(USER))
            .await
            .expect("read"));
    }

    #[tokio::test]
    async fn delete_skips_absent_links_and_tolerates_not_found() {
        let locks = LockRegistry::new();
        let reconciler = LinkReconciler::new(&locks, TARGET);

        let links = MemoryLinks::with_group(&[USER]);
        reconciler
            .delete(&links, &member_id(OTHER))
            .await
            .expect("absent");
        assert!(links.removals.lock().expect("removals").is_empty());

        let racing = MemoryLinks {
            remove_status: Some(404),
            ..MemoryLinks::with_group(&[USER])
        };
        reconciler
            .delete(&racing, &member_id(USER))
            .await
            .expect("already removed");

        let failing = MemoryLinks {
            remove_status: Some(403),
            ..MemoryLinks::with_group(&[USER])
        };
        let err = reconciler
            .delete(&failing, &member_id(USER))
            .await
            .unwrap_err();
        assert!(matches!(err.root(), Error::Api(api) if api.status == 403));
    }
}
