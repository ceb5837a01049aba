use super::stores::{Applications, GroupLinks, Groups, ServicePrincipals};
use super::MsGraphClient;
use crate::common::GroupLinkKind;
use crate::locks::LockRegistry;
use crate::models::msgraph::{AppRole, KeyCredential, PasswordCredential};
use crate::resources::app_role::AppRoleResource;
use crate::resources::application_data::ApplicationDataSource;
use crate::resources::credential::CredentialResource;
use crate::resources::group_data::GroupDataSource;
use crate::resources::membership::MembershipResource;
use crate::resources::service_principal::ServicePrincipalResource;
use crate::resources::{HandlerSet, ResourceType};
use std::sync::Arc;

/// Handlers for every resource type and data source, backed by the new graph API.
pub(crate) fn handlers(client: Arc<MsGraphClient>, locks: Arc<LockRegistry>) -> HandlerSet {
    let applications = Arc::new(Applications::new(Arc::clone(&client)));
    let service_principals = Arc::new(ServicePrincipals::new(Arc::clone(&client)));

    HandlerSet {
        application_certificate: Box::new(CredentialResource::<KeyCredential, _>::new(
            ResourceType::ApplicationCertificate,
            Arc::clone(&applications),
            Arc::clone(&locks),
        )),
        application_password: Box::new(CredentialResource::<PasswordCredential, _>::new(
            ResourceType::ApplicationPassword,
            Arc::clone(&applications),
            Arc::clone(&locks),
        )),
        application_app_role: Box::new(AppRoleResource::<AppRole, _>::new(
            Arc::clone(&applications),
            Arc::clone(&locks),
        )),
        service_principal_certificate: Box::new(CredentialResource::<KeyCredential, _>::new(
            ResourceType::ServicePrincipalCertificate,
            Arc::clone(&service_principals),
            Arc::clone(&locks),
        )),
        service_principal_password: Box::new(CredentialResource::<PasswordCredential, _>::new(
            ResourceType::ServicePrincipalPassword,
            Arc::clone(&service_principals),
            Arc::clone(&locks),
        )),
        group_member: Box::new(MembershipResource::new(
            ResourceType::GroupMember,
            GroupLinks::new(Arc::clone(&client), GroupLinkKind::Members),
            Arc::clone(&locks),
        )),
        group_owner: Box::new(MembershipResource::new(
            ResourceType::GroupOwner,
            GroupLinks::new(Arc::clone(&client), GroupLinkKind::Owners),
            locks,
        )),
        service_principal: Box::new(ServicePrincipalResource::new(service_principals)),
        application_data: Box::new(ApplicationDataSource::new(applications)),
        group_data: Box::new(GroupDataSource::new(Groups::new(client))),
    }
}
