//! Read-only lookup of an existing application.

use super::{
    exactly_one_of, required_uuid, set, single_match, AppRoleDefinition, DataSourceHandler,
    DataSourceType,
};
use crate::common::odata_eq;
use crate::error::Error;
use crate::id::same_id;
use crate::resource_data::{AttrSpec, AttrType, AttrValue, Block, ResourceData, Schema};
use async_trait::async_trait;
use log::debug;
use std::collections::BTreeSet;
use std::sync::Arc;

pub(crate) const SCHEMA: Schema = &[
    AttrSpec::new("object_id", AttrType::String),
    AttrSpec::new("application_id", AttrType::String),
    AttrSpec::new("name", AttrType::String),
    AttrSpec::new("homepage", AttrType::String),
    AttrSpec::new("logout_url", AttrType::String),
    AttrSpec::new("identifier_uris", AttrType::StringSet),
    AttrSpec::new("reply_urls", AttrType::StringSet),
    AttrSpec::new("available_to_other_tenants", AttrType::Bool),
    AttrSpec::new("oauth2_allow_implicit_flow", AttrType::Bool),
    AttrSpec::new("group_membership_claims", AttrType::String),
    AttrSpec::new("type", AttrType::String),
    AttrSpec::new("app_roles", AttrType::Blocks),
    AttrSpec::new("required_resource_access", AttrType::Blocks),
    AttrSpec::new("owners", AttrType::StringSet),
];

const LOOKUP: &[&str] = &["object_id", "application_id", "name"];

pub const APPLICATION_TYPE_NATIVE: &str = "native";
pub const APPLICATION_TYPE_WEB: &str = "webapp/api";

/// Observed state of an application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationView {
    pub object_id: String,
    pub application_id: String,
    pub display_name: String,
    pub homepage: String,
    pub logout_url: String,
    pub identifier_uris: BTreeSet<String>,
    pub reply_urls: BTreeSet<String>,
    pub available_to_other_tenants: bool,
    pub oauth2_allow_implicit_flow: bool,
    pub group_membership_claims: String,
    pub public_client: bool,
    pub app_roles: Vec<AppRoleDefinition>,
    pub required_resource_access: Vec<RequiredResourceAccess>,
}

/// API permissions an application requests from one resource application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredResourceAccess {
    pub resource_app_id: String,
    pub resource_access: Vec<ResourceAccess>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceAccess {
    pub id: String,
    /// `Scope` or `Role`.
    pub access_type: String,
}

impl RequiredResourceAccess {
    fn to_block(&self) -> Block {
        let access = self
            .resource_access
            .iter()
            .map(|access| {
                let mut block = Block::new();
                block.insert("id".to_string(), AttrValue::from(access.id.as_str()));
                block.insert(
                    "type".to_string(),
                    AttrValue::from(access.access_type.as_str()),
                );
                block
            })
            .collect::<Vec<_>>();
        let mut block = Block::new();
        block.insert(
            "resource_app_id".to_string(),
            AttrValue::from(self.resource_app_id.as_str()),
        );
        block.insert("resource_access".to_string(), AttrValue::from(access));
        block
    }
}

/// Application lookups of one API.
///
/// `get` returns `Ok(None)` when the object does not exist.
#[async_trait]
pub(crate) trait ApplicationDirectory: Send + Sync {
    async fn get(&self, object_id: &str) -> Result<Option<ApplicationView>, Error>;

    /// Applications matching an OData `$filter` expression.
    async fn list(&self, filter: &str) -> Result<Vec<ApplicationView>, Error>;

    /// Object IDs of the application's owners.
    async fn owners(&self, object_id: &str) -> Result<Vec<String>, Error>;
}

#[async_trait]
impl<S: ApplicationDirectory + ?Sized> ApplicationDirectory for Arc<S> {
    async fn get(&self, object_id: &str) -> Result<Option<ApplicationView>, Error> {
        (**self).get(object_id).await
    }

    async fn list(&self, filter: &str) -> Result<Vec<ApplicationView>, Error> {
        (**self).list(filter).await
    }

    async fn owners(&self, object_id: &str) -> Result<Vec<String>, Error> {
        (**self).owners(object_id).await
    }
}

pub(crate) struct ApplicationDataSource<S> {
    store: S,
}

impl<S: ApplicationDirectory> ApplicationDataSource<S> {
    pub(crate) fn new(store: S) -> Self {
        Self { store }
    }

    async fn search(&self, field: &str, value: &str) -> Result<Vec<ApplicationView>, Error> {
        let filter = odata_eq(field, value);
        self.store
            .list(&filter)
            .await
            .map_err(|e| e.context(format!("Listing applications with filter {filter:?}"), None))
    }

    async fn lookup(&self, d: &ResourceData) -> Result<ApplicationView, Error> {
        match exactly_one_of(d, LOOKUP)? {
            "object_id" => {
                let object_id = required_uuid(d, "object_id")?;
                let found = self.store.get(&object_id).await.map_err(|e| {
                    e.context(
                        format!("Retrieving application with object ID {object_id:?}"),
                        Some("object_id"),
                    )
                })?;
                found.ok_or_else(|| Error::Lookup {
                    attribute: "object_id",
                    message: format!("application with object ID {object_id:?} was not found"),
                })
            }
            "application_id" => {
                let application_id = required_uuid(d, "application_id")?;
                let mut matches = self.search("appId", &application_id).await?;
                matches.retain(|app| same_id(&app.application_id, &application_id));
                single_match(
                    matches,
                    "applications",
                    "application_id",
                    &format!("application ID {application_id:?}"),
                )
            }
            _ => {
                let name = d.get_str("name");
                let mut matches = self.search("displayName", &name).await?;
                matches.retain(|app| app.display_name == name);
                single_match(matches, "applications", "name", &format!("name {name:?}"))
            }
        }
    }
}

#[async_trait]
impl<S: ApplicationDirectory> DataSourceHandler for ApplicationDataSource<S> {
    fn data_source_type(&self) -> DataSourceType {
        DataSourceType::Application
    }

    async fn read(&self, d: &mut ResourceData) -> Result<(), Error> {
        let app = self.lookup(d).await?;
        if app.object_id.is_empty() {
            return Err(Error::UnexpectedResponse(format!(
                "application {:?} has no object ID",
                app.display_name
            )));
        }
        let owners = self.store.owners(&app.object_id).await.map_err(|e| {
            e.context(
                format!("Listing owners of application with object ID {:?}", app.object_id),
                None,
            )
        })?;
        debug!(
            "Found application {:?} with object ID {:?}",
            app.display_name, app.object_id
        );

        d.set_id(app.object_id.as_str());
        let app_type = if app.public_client {
            APPLICATION_TYPE_NATIVE
        } else {
            APPLICATION_TYPE_WEB
        };
        set(d, "object_id", app.object_id)?;
        set(d, "application_id", app.application_id)?;
        set(d, "name", app.display_name)?;
        set(d, "homepage", app.homepage)?;
        set(d, "logout_url", app.logout_url)?;
        set(d, "identifier_uris", app.identifier_uris)?;
        set(d, "reply_urls", app.reply_urls)?;
        set(d, "available_to_other_tenants", app.available_to_other_tenants)?;
        set(d, "oauth2_allow_implicit_flow", app.oauth2_allow_implicit_flow)?;
        set(d, "group_membership_claims", app.group_membership_claims)?;
        set(d, "type", app_type)?;
        let roles = app.app_roles.iter().map(AppRoleDefinition::to_block).collect::<Vec<_>>();
        set(d, "app_roles", roles)?;
        let access = app
            .required_resource_access
            .iter()
            .map(RequiredResourceAccess::to_block)
            .collect::<Vec<_>>();
        set(d, "required_resource_access", access)?;
        set(d, "owners", owners.into_iter().collect::<BTreeSet<_>>())?;
        Ok(())
    }
}
