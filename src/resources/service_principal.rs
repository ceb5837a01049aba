use super::{required_uuid, set, AppRoleDefinition, ResourceHandler, ResourceType};
use crate::error::Error;
use crate::id::parse_object_id;
use crate::poll::ReplicationWait;
use crate::resource_data::{AttrSpec, AttrType, ResourceData, Schema};
use async_trait::async_trait;
use log::debug;
use std::collections::BTreeSet;
use std::sync::Arc;

pub(crate) const SCHEMA: Schema = &[
    AttrSpec::new("application_id", AttrType::String),
    AttrSpec::new("tags", AttrType::StringSet),
    AttrSpec::new("display_name", AttrType::String),
    AttrSpec::new("object_id", AttrType::String),
    AttrSpec::new("app_roles", AttrType::Blocks),
];

/// Observed state of a service principal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServicePrincipalView {
    pub object_id: String,
    pub application_id: String,
    pub display_name: String,
    pub tags: BTreeSet<String>,
    pub app_roles: Vec<AppRoleDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewServicePrincipal {
    pub application_id: String,
    pub tags: BTreeSet<String>,
}

/// Service principal endpoints of one API.
///
/// `get` returns `Ok(None)` when the object does not exist.
#[async_trait]
pub(crate) trait ServicePrincipalStore: Send + Sync {
    /// Creates the object and returns its object ID.
    async fn create(&self, sp: &NewServicePrincipal) -> Result<String, Error>;

    async fn get(&self, object_id: &str) -> Result<Option<ServicePrincipalView>, Error>;

    async fn delete(&self, object_id: &str) -> Result<(), Error>;
}

#[async_trait]
impl<S: ServicePrincipalStore + ?Sized> ServicePrincipalStore for Arc<S> {
    async fn create(&self, sp: &NewServicePrincipal) -> Result<String, Error> {
        (**self).create(sp).await
    }

    async fn get(&self, object_id: &str) -> Result<Option<ServicePrincipalView>, Error> {
        (**self).get(object_id).await
    }

    async fn delete(&self, object_id: &str) -> Result<(), Error> {
        (**self).delete(object_id).await
    }
}

pub(crate) struct ServicePrincipalResource<S> {
    store: S,
    wait: ReplicationWait,
}

impl<S: ServicePrincipalStore> ServicePrincipalResource<S> {
    pub(crate) fn new(store: S) -> Self {
        Self {
            store,
            wait: ReplicationWait::default(),
        }
    }

    #[cfg(test)]
    fn with_wait(mut self, wait: ReplicationWait) -> Self {
        self.wait = wait;
        self
    }

    fn tracked(d: &ResourceData) -> Result<String, Error> {
        parse_object_id(d.id()).map_err(|e| {
            Error::from(e).context(
                format!("Parsing service principal with ID {:?}", d.id()),
                Some("id"),
            )
        })
    }
}

#[async_trait]
impl<S: ServicePrincipalStore> ResourceHandler for ServicePrincipalResource<S> {
    fn resource_type(&self) -> ResourceType {
        ResourceType::ServicePrincipal
    }

    async fn create(&self, d: &mut ResourceData) -> Result<(), Error> {
        let application_id = required_uuid(d, "application_id")?;
        let new = NewServicePrincipal {
            application_id: application_id.clone(),
            tags: d.get_string_set("tags"),
        };
        let object_id = self.store.create(&new).await.map_err(|e| {
            e.context(
                format!("Creating service principal for application {application_id:?}"),
                None,
            )
        })?;
        d.set_id(object_id.as_str());

        let store = &self.store;
        let id = object_id.as_str();
        self.wait
            .until_found("service principal", id, move || store.get(id))
            .await
            .map_err(|e| {
                e.context(
                    format!("Waiting for service principal with object ID {id:?}"),
                    None,
                )
            })?;
        self.read(d).await
    }

    async fn read(&self, d: &mut ResourceData) -> Result<(), Error> {
        let object_id = Self::tracked(d)?;
        let found = self.store.get(&object_id).await.map_err(|e| {
            e.context(
                format!("Retrieving service principal with object ID {object_id:?}"),
                Some("id"),
            )
        })?;
        let Some(sp) = found else {
            debug!("Service Principal with object ID {object_id:?} was not found - removing from state!");
            d.clear_id();
            return Ok(());
        };

        set(d, "application_id", sp.application_id)?;
        set(d, "display_name", sp.display_name)?;
        set(d, "object_id", sp.object_id)?;
        set(d, "tags", sp.tags)?;
        let roles = sp.app_roles.iter().map(AppRoleDefinition::to_block).collect::<Vec<_>>();
        set(d, "app_roles", roles)?;
        Ok(())
    }

    async fn delete(&self, d: &ResourceData) -> Result<(), Error> {
        let object_id = Self::tracked(d)?;
        match self.store.delete(&object_id).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                debug!("Service Principal with object ID {object_id:?} was already deleted");
                Ok(())
            }
            Err(err) => Err(err.context(
                format!("Deleting service principal with object ID {object_id:?}"),
                None,
            )),
        }
    }
}
