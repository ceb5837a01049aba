use super::{required_uuid, set, tracked_id, ResourceHandler, ResourceType};
use crate::error::Error;
use crate::locks::LockRegistry;
use crate::reconcile::{LinkReconciler, LinkStore, Target};
use crate::resource_data::{AttrSpec, AttrType, ResourceData, Schema};
use async_trait::async_trait;
use std::sync::Arc;

pub(crate) const MEMBER_SCHEMA: Schema = &[
    AttrSpec::new("group_object_id", AttrType::String),
    AttrSpec::new("member_object_id", AttrType::String),
];

pub(crate) const OWNER_SCHEMA: Schema = &[
    AttrSpec::new("group_object_id", AttrType::String),
    AttrSpec::new("owner_object_id", AttrType::String),
];

/// Group member or owner link.
pub(crate) struct MembershipResource<S> {
    resource_type: ResourceType,
    store: S,
    locks: Arc<LockRegistry>,
}

impl<S: LinkStore> MembershipResource<S> {
    pub(crate) fn new(resource_type: ResourceType, store: S, locks: Arc<LockRegistry>) -> Self {
        Self {
            resource_type,
            store,
            locks,
        }
    }

    fn target(&self) -> Target {
        self.resource_type.target()
    }

    fn linked_attr(&self) -> &'static str {
        match self.resource_type {
            ResourceType::GroupOwner => "owner_object_id",
            _ => "member_object_id",
        }
    }

    fn reconciler(&self) -> LinkReconciler<'_> {
        LinkReconciler::new(&self.locks, self.target())
    }
}

#[async_trait]
impl<S: LinkStore> ResourceHandler for MembershipResource<S> {
    fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    async fn create(&self, d: &mut ResourceData) -> Result<(), Error> {
        let group_id = required_uuid(d, self.target().parent_attr)?;
        let linked_id = required_uuid(d, self.linked_attr())?;
        let id = self
            .reconciler()
            .create(&self.store, &group_id, &linked_id)
            .await?;
        d.set_id(id.to_string());
        self.read(d).await
    }

    async fn read(&self, d: &mut ResourceData) -> Result<(), Error> {
        let id = tracked_id(d, self.resource_type, self.target().what)?;
        if !self.reconciler().read(&self.store, &id).await? {
            d.clear_id();
            return Ok(());
        }
        set(d, self.target().parent_attr, id.object_id.as_str())?;
        set(d, self.linked_attr(), id.sub_id.as_str())?;
        Ok(())
    }

    async fn delete(&self, d: &ResourceData) -> Result<(), Error> {
        let id = tracked_id(d, self.resource_type, self.target().what)?;
        self.reconciler().delete(&self.store, &id).await
    }
}
