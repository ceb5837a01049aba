//! Collection and link stores over [`MsGraphClient`].
//!
//! Parents are fetched whole and patched with only the replaced collection.

use super::MsGraphClient;
use crate::common::GroupLinkKind;
use crate::error::Error;
use crate::models::msgraph::{
    self, AppRole, Application, Group, KeyCredential, PasswordCredential, ServicePrincipal,
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
    client: Arc<MsGraphClient>,
}

impl Applications {
    pub(crate) fn new(client: Arc<MsGraphClient>) -> Self {
        Self { client }
    }

    async fn fetch_with<T>(
        &self,
        object_id: &str,
        field: impl FnOnce(Application) -> Option<Vec<T>> + Send,
    ) -> Result<Option<Vec<T>>, Error> {
        let app = found(self.client.get_application(object_id).await)?;
        Ok(app.map(|app| field(app).unwrap_or_default()))
    }
}

#[async_trait]
impl CollectionStore<KeyCredential> for Applications {
    async fn fetch(&self, object_id: &str) -> Result<Option<Vec<KeyCredential>>, Error> {
        self.fetch_with(object_id, |app| app.key_credentials).await
    }

    async fn replace(&self, object_id: &str, items: Vec<KeyCredential>) -> Result<(), Error> {
        let patch = Application {
            key_credentials: Some(items),
            ..Application::default()
        };
        self.client.update_application(object_id, &patch).await
    }
}

#[async_trait]
impl CollectionStore<PasswordCredential> for Applications {
    async fn fetch(&self, object_id: &str) -> Result<Option<Vec<PasswordCredential>>, Error> {
        self.fetch_with(object_id, |app| app.password_credentials).await
    }

    async fn replace(&self, object_id: &str, items: Vec<PasswordCredential>) -> Result<(), Error> {
        let patch = Application {
            password_credentials: Some(items),
            ..Application::default()
        };
        self.client.update_application(object_id, &patch).await
    }
}

#[async_trait]
impl CollectionStore<AppRole> for Applications {
    async fn fetch(&self, object_id: &str) -> Result<Option<Vec<AppRole>>, Error> {
        self.fetch_with(object_id, |app| app.app_roles).await
    }

    async fn replace(&self, object_id: &str, items: Vec<AppRole>) -> Result<(), Error> {
        let patch = Application {
            app_roles: Some(items),
            ..Application::default()
        };
        self.client.update_application(object_id, &patch).await
    }
}

/// Audience of single-tenant applications; any other value admits other tenants.
const SIGN_IN_AUDIENCE_MY_ORG: &str = "AzureADMyOrg";

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
        Ok(owners.into_iter().map(|o| o.id).collect())
    }
}

fn application_view(app: Application) -> ApplicationView {
    let web = app.web.unwrap_or_default();
    ApplicationView {
        object_id: app.id.unwrap_or_default(),
        application_id: app.app_id.unwrap_or_default(),
        display_name: app.display_name.unwrap_or_default(),
        homepage: web.home_page_url.unwrap_or_default(),
        logout_url: web.logout_url.unwrap_or_default(),
        identifier_uris: app.identifier_uris.unwrap_or_default().into_iter().collect(),
        reply_urls: web.redirect_uris.unwrap_or_default().into_iter().collect(),
        available_to_other_tenants: app
            .sign_in_audience
            .is_some_and(|audience| audience != SIGN_IN_AUDIENCE_MY_ORG),
        oauth2_allow_implicit_flow: web
            .implicit_grant_settings
            .and_then(|grant| grant.enable_access_token_issuance)
            .unwrap_or_default(),
        group_membership_claims: app.group_membership_claims.unwrap_or_default(),
        public_client: app.is_fallback_public_client.unwrap_or_default(),
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

fn required_resource_access(wire: msgraph::RequiredResourceAccess) -> RequiredResourceAccess {
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
    client: Arc<MsGraphClient>,
}

impl ServicePrincipals {
    pub(crate) fn new(client: Arc<MsGraphClient>) -> Self {
        Self { client }
    }

    async fn fetch_with<T>(
        &self,
        object_id: &str,
        field: impl FnOnce(ServicePrincipal) -> Option<Vec<T>> + Send,
    ) -> Result<Option<Vec<T>>, Error> {
        let sp = found(self.client.get_service_principal(object_id).await)?;
        Ok(sp.map(|sp| field(sp).unwrap_or_default()))
    }
}

#[async_trait]
impl CollectionStore<KeyCredential> for ServicePrincipals {
    async fn fetch(&self, object_id: &str) -> Result<Option<Vec<KeyCredential>>, Error> {
        self.fetch_with(object_id, |sp| sp.key_credentials).await
    }

    async fn replace(&self, object_id: &str, items: Vec<KeyCredential>) -> Result<(), Error> {
        let patch = ServicePrincipal {
            key_credentials: Some(items),
            ..ServicePrincipal::default()
        };
        self.client.update_service_principal(object_id, &patch).await
    }
}

#[async_trait]
impl CollectionStore<PasswordCredential> for ServicePrincipals {
    async fn fetch(&self, object_id: &str) -> Result<Option<Vec<PasswordCredential>>, Error> {
        self.fetch_with(object_id, |sp| sp.password_credentials).await
    }

    async fn replace(&self, object_id: &str, items: Vec<PasswordCredential>) -> Result<(), Error> {
        let patch = ServicePrincipal {
            password_credentials: Some(items),
            ..ServicePrincipal::default()
        };
        self.client.update_service_principal(object_id, &patch).await
    }
}

#[async_trait]
impl ServicePrincipalStore for ServicePrincipals {
    async fn create(&self, sp: &NewServicePrincipal) -> Result<String, Error> {
        let body = ServicePrincipal {
            app_id: Some(sp.application_id.clone()),
            account_enabled: Some(true),
            tags: (!sp.tags.is_empty()).then(|| sp.tags.iter().cloned().collect()),
            ..ServicePrincipal::default()
        };
        let created = self.client.create_service_principal(&body).await?;
        created.id.ok_or_else(|| {
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
        object_id: sp.id.unwrap_or_default(),
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
    client: Arc<MsGraphClient>,
    kind: GroupLinkKind,
}

impl GroupLinks {
    pub(crate) fn new(client: Arc<MsGraphClient>, kind: GroupLinkKind) -> Self {
        Self { client, kind }
    }
}

#[async_trait]
impl LinkStore for GroupLinks {
    async fn list(&self, object_id: &str) -> Result<Option<Vec<String>>, Error> {
        let objects = found(self.client.list_group_links(object_id, self.kind).await)?;
        Ok(objects.map(|objects| objects.into_iter().map(|o| o.id).collect()))
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
    client: Arc<MsGraphClient>,
}

impl Groups {
    pub(crate) fn new(client: Arc<MsGraphClient>) -> Self {
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
        Ok(objects.into_iter().map(|o| o.id).collect())
    }
}

fn group_view(group: Group) -> GroupView {
    GroupView {
        object_id: group.id.unwrap_or_default(),
        display_name: group.display_name.unwrap_or_default(),
        description: group.description.unwrap_or_default(),
    }
}
