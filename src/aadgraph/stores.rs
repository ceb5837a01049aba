//! Collection and link stores over [`AadGraphClient`].
//!
//! Credentials have dedicated collection endpoints; app roles are patched
//! through the application itself.

use super::AadGraphClient;
use crate::common::GroupLinkKind;
use crate::error::Error;
use crate::models::aadgraph::{
    self, AppRole, Application, Group, KeyCredential, PasswordCredential, ServicePrincipal,
    ServicePrincipalCreateParameters,
};
use crate::reconcile::{found, CollectionStore, LinkStore};
use crate::resources::app_role::AppRoleModel;
use crate::resources::application_data::ApplicationDirectory;
use crate::resources::group_data::GroupDirectory;
use crate::resources::service_principal::{NewServicePrincipal, ServicePrincipalStore};
use crate::resources::{
    ApplicationView, GroupView, RequiredResourceAccess, ResourceAccess, ServicePrincipalView,
};
use async_trait::async_trait;
use std::sync::Arc;

pub(crate) struct Applications {
    client: Arc<AadGraphClient>,
}

impl Applications {
    pub(crate) fn new(client: Arc<AadGraphClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CollectionStore<KeyCredential> for Applications {
    async fn fetch(&self, object_id: &str) -> Result<Option<Vec<KeyCredential>>, Error> {
        found(self.client.list_application_key_credentials(object_id).await)
    }

    async fn replace(&self, object_id: &str, items: Vec<KeyCredential>) -> Result<(), Error> {
        self.client
            .update_application_key_credentials(object_id, items)
            .await
    }
}

#[async_trait]
impl CollectionStore<PasswordCredential> for Applications {
    async fn fetch(&self, object_id: &str) -> Result<Option<Vec<PasswordCredential>>, Error> {
        found(
            self.client
                .list_application_password_credentials(object_id)
                .await,
        )
    }

    async fn replace(&self, object_id: &str, items: Vec<PasswordCredential>) -> Result<(), Error> {
        self.client
            .update_application_password_credentials(object_id, items)
            .await
    }
}

#[async_trait]
impl CollectionStore<AppRole> for Applications {
    async fn fetch(&self, object_id: &str) -> Result<Option<Vec<AppRole>>, Error> {
        let app = found(self.client.get_application(object_id).await)?;
        Ok(app.map(|app| app.app_roles.unwrap_or_default()))
    }

    async fn replace(&self, object_id: &str, items: Vec<AppRole>) -> Result<(), Error> {
        let patch = Application {
            app_roles: Some(items),
            ..Application::default()
        };
        self.client.update_application(object_id, &patch).await
    }
}

#[async_trait]
impl ApplicationDirectory for Applications {
    async fn get(&self, object_id: &str) -> Result<Option<ApplicationView>, Error> {
        let app = found(self.client.get_application(object_id).await)?;
        Ok(app.map(application_view))
    }

    async fn list(&self, filter: &str) -> Result<Vec<ApplicationView>, Error> {
        let apps = self.client.list_applications(filter).await?;
        Ok(apps.into_iter().map(application_view).collect())
    }

    async fn owners(&self, object_id: &str) -> Result<Vec<String>, Error> {
        let owners = self.client.list_application_owners(object_id).await?;
        Ok(owners.into_iter().map(|o| o.object_id).collect())
    }
}

fn application_view(app: Application) -> ApplicationView {
    ApplicationView {
        object_id: app.object_id.unwrap_or_default(),
        application_id: app.app_id.unwrap_or_default(),
        display_name: app.display_name.unwrap_or_default(),
        homepage: app.homepage.unwrap_or_default(),
        logout_url: app.logout_url.unwrap_or_default(),
        identifier_uris: app.identifier_uris.unwrap_or_default().into_iter().collect(),
        reply_urls: app.reply_urls.unwrap_or_default().into_iter().collect(),
        available_to_other_tenants: app.available_to_other_tenants.unwrap_or_default(),
        oauth2_allow_implicit_flow: app.oauth2_allow_implicit_flow.unwrap_or_default(),
        group_membership_claims: app.group_membership_claims.unwrap_or_default(),
        public_client: app.public_client.unwrap_or_default(),
        app_roles: app
            .app_roles
            .unwrap_or_default()
            .iter()
            .map(AppRoleModel::definition)
            .collect(),
        required_resource_access: app
            .required_resource_access
            .unwrap_or_default()
            .into_iter()
            .map(required_resource_access)
            .collect(),
    }
}

fn required_resource_access(wire: aadgraph::RequiredResourceAccess) -> RequiredResourceAccess {
    RequiredResourceAccess {
        resource_app_id: wire.resource_app_id,
        resource_access: wire
            .resource_access
            .into_iter()
            .map(|access| ResourceAccess {
                id: access.id,
                access_type: access.access_type,
            })
            .collect(),
    }
}

pub(crate) struct ServicePrincipals {
    client: Arc<AadGraphClient>,
}

impl ServicePrincipals {
    pub(crate) fn new(client: Arc<AadGraphClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CollectionStore<KeyCredential> for ServicePrincipals {
    async fn fetch(&self, object_id: &str) -> Result<Option<Vec<KeyCredential>>, Error> {
        found(
            self.client
                .list_service_principal_key_credentials(object_id)
                .await,
        )
    }

    async fn replace(&self, object_id: &str, items: Vec<KeyCredential>) -> Result<(), Error> {
        self.client
            .update_service_principal_key_credentials(object_id, items)
            .await
    }
}

#[async_trait]
impl CollectionStore<PasswordCredential> for ServicePrincipals {
    async fn fetch(&self, object_id: &str) -> Result<Option<Vec<PasswordCredential>>, Error> {
        found(
            self.client
                .list_service_principal_password_credentials(object_id)
                .await,
        )
    }

    async fn replace(&self, object_id: &str, items: Vec<PasswordCredential>) -> Result<(), Error> {
        self.client
            .update_service_principal_password_credentials(object_id, items)
            .await
    }
}

#[async_trait]
impl ServicePrincipalStore for ServicePrincipals {
    async fn create(&self, sp: &NewServicePrincipal) -> Result<String, Error> {
        let parameters = ServicePrincipalCreateParameters {
            app_id: sp.application_id.clone(),
            account_enabled: true,
            tags: sp.tags.iter().cloned().collect(),
        };
        let created = self.client.create_service_principal(&parameters).await?;
        created.object_id.ok_or_else(|| {
            Error::UnexpectedResponse("created service principal has no object ID".to_string())
        })
    }

    async fn get(&self, object_id: &str) -> Result<Option<ServicePrincipalView>, Error> {
        let sp = found(self.client.get_service_principal(object_id).await)?;
        Ok(sp.map(view))
    }

    async fn delete(&self, object_id: &str) -> Result<(), Error> {
        self.client.delete_service_principal(object_id).await
    }
}

fn view(sp: ServicePrincipal) -> ServicePrincipalView {
    ServicePrincipalView {
        object_id: sp.object_id.unwrap_or_default(),
        application_id: sp.app_id.unwrap_or_default(),
        display_name: sp.display_name.unwrap_or_default(),
        tags: sp.tags.unwrap_or_default().into_iter().collect(),
        app_roles: sp
            .app_roles
            .unwrap_or_default()
            .iter()
            .map(AppRoleModel::definition)
            .collect(),
    }
}

pub(crate) struct GroupLinks {
    client: Arc<AadGraphClient>,
    kind: GroupLinkKind,
}

impl GroupLinks {
    pub(crate) fn new(client: Arc<AadGraphClient>, kind: GroupLinkKind) -> Self {
        Self { client, kind }
    }
}

#[async_trait]
impl LinkStore for GroupLinks {
    async fn list(&self, object_id: &str) -> Result<Option<Vec<String>>, Error> {
        let objects = found(self.client.list_group_links(object_id, self.kind).await)?;
        Ok(objects.map(|objects| objects.into_iter().map(|o| o.object_id).collect()))
    }

    async fn add(&self, object_id: &str, linked_id: &str) -> Result<(), Error> {
        self.client
            .add_group_link(object_id, self.kind, linked_id)
            .await
    }

    async fn remove(&self, object_id: &str, linked_id: &str) -> Result<(), Error> {
        self.client
            .remove_group_link(object_id, self.kind, linked_id)
            .await
    }
}

pub(crate) struct Groups {
    client: Arc<AadGraphClient>,
}

impl Groups {
    pub(crate) fn new(client: Arc<AadGraphClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GroupDirectory for Groups {
    async fn get(&self, object_id: &str) -> Result<Option<GroupView>, Error> {
        let group = found(self.client.get_group(object_id).await)?;
        Ok(group.map(group_view))
    }

    async fn list(&self, filter: &str) -> Result<Vec<GroupView>, Error> {
        let groups = self.client.list_groups(filter).await?;
        Ok(groups.into_iter().map(group_view).collect())
    }

    async fn links(&self, object_id: &str, kind: GroupLinkKind) -> Result<Vec<String>, Error> {
        let objects = self.client.list_group_links(object_id, kind).await?;
        Ok(objects.into_iter().map(|o| o.object_id).collect())
    }
}

fn group_view(group: Group) -> GroupView {
    GroupView {
        object_id: group.object_id.unwrap_or_default(),
        display_name: group.display_name.unwrap_or_default(),
        description: group.description.unwrap_or_default(),
    }
}
