//! Wire model of the new graph API (`/beta`).

use crate::credentials::{
    rfc3339_opt, Credential, CredentialModel, CredentialView, KEY_USAGE_VERIFY,
};
use crate::reconcile::SubObject;
use crate::resources::app_role::{AppRoleDefinition, AppRoleModel};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyCredential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_key_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(
        default,
        with = "rfc3339_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date_time: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "rfc3339_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date_time: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    /// Properties this model does not name, kept so write-backs are lossless.
    #[serde(flatten)]
    pub additional_properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PasswordCredential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_key_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(
        default,
        with = "rfc3339_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date_time: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "rfc3339_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date_time: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_text: Option<String>,
    #[serde(flatten)]
    pub additional_properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppRole {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub allowed_member_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(flatten)]
    pub additional_properties: BTreeMap<String, Value>,
}

/// Application or service principal, restricted to the properties this crate
/// reads or patches. Unset fields are omitted so a patch only touches the
/// collection it carries.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_roles: Option<Vec<AppRole>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_credentials: Option<Vec<KeyCredential>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_credentials: Option<Vec<PasswordCredential>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier_uris: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_in_audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_membership_claims: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_fallback_public_client: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<WebApplication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_resource_access: Option<Vec<RequiredResourceAccess>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebApplication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logout_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uris: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implicit_grant_settings: Option<ImplicitGrantSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImplicitGrantSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_access_token_issuance: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_id_token_issuance: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequiredResourceAccess {
    #[serde(default)]
    pub resource_app_id: String,
    #[serde(default)]
    pub resource_access: Vec<ResourceAccess>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResourceAccess {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub access_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_roles: Option<Vec<AppRole>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_credentials: Option<Vec<KeyCredential>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_credentials: Option<Vec<PasswordCredential>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectoryObject {
    pub id: String,
    #[serde(rename = "@odata.type", default, skip_serializing_if = "Option::is_none")]
    pub odata_type: Option<String>,
}

/// Reference body for the `$ref` link endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectoryObjectRef {
    #[serde(rename = "@odata.id")]
    pub odata_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ODataList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

impl SubObject for KeyCredential {
    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }
}

impl From<Credential> for KeyCredential {
    fn from(credential: Credential) -> Self {
        Self {
            key_id: Some(credential.key_id),
            start_date_time: credential.start_date,
            end_date_time: Some(credential.end_date),
            key: Some(credential.value),
            key_type: credential.key_type,
            usage: Some(KEY_USAGE_VERIFY.to_string()),
            ..Self::default()
        }
    }
}

impl CredentialModel for KeyCredential {
    fn view(&self) -> CredentialView {
        CredentialView {
            key_type: self.key_type.clone(),
            description: None,
            start_date: self.start_date_time,
            end_date: self.end_date_time,
        }
    }
}

impl SubObject for PasswordCredential {
    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }
}

impl From<Credential> for PasswordCredential {
    fn from(credential: Credential) -> Self {
        Self {
            key_id: Some(credential.key_id),
            display_name: credential.description,
            start_date_time: credential.start_date,
            end_date_time: Some(credential.end_date),
            secret_text: Some(credential.value),
            ..Self::default()
        }
    }
}

impl CredentialModel for PasswordCredential {
    fn view(&self) -> CredentialView {
        CredentialView {
            key_type: None,
            description: self.display_name.clone(),
            start_date: self.start_date_time,
            end_date: self.end_date_time,
        }
    }
}

impl SubObject for AppRole {
    fn key_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn prepare_removal(&self) -> Option<Self> {
        (self.is_enabled != Some(false)).then(|| Self {
            is_enabled: Some(false),
            ..self.clone()
        })
    }
}

impl From<AppRoleDefinition> for AppRole {
    fn from(role: AppRoleDefinition) -> Self {
        Self {
            id: Some(role.id),
            allowed_member_types: role.allowed_member_types.into_iter().collect(),
            description: Some(role.description),
            display_name: Some(role.display_name),
            is_enabled: Some(role.is_enabled),
            value: role.value,
            ..Self::default()
        }
    }
}

impl AppRoleModel for AppRole {
    fn definition(&self) -> AppRoleDefinition {
        AppRoleDefinition {
            id: self.id.clone().unwrap_or_default(),
            allowed_member_types: self.allowed_member_types.iter().cloned().collect(),
            description: self.description.clone().unwrap_or_default(),
            display_name: self.display_name.clone().unwrap_or_default(),
            is_enabled: self.is_enabled.unwrap_or(true),
            value: self.value.clone(),
        }
    }
}
