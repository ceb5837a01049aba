//! Wire model of the legacy directory graph API (`api-version=1.6`).

use crate::credentials::{
    rfc3339_opt, Credential, CredentialModel, CredentialView, KEY_USAGE_VERIFY,
};
use crate::reconcile::SubObject;
use crate::resources::app_role::{AppRoleDefinition, AppRoleModel};
use base64::engine::general_purpose::STANDARD as BASE64_STD;
use base64::Engine as _;
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
    #[serde(default, with = "rfc3339_opt", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(default, with = "rfc3339_opt", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<OffsetDateTime>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(flatten)]
    pub additional_properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PasswordCredential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    /// Base64 encoded; carries the configured description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_key_identifier: Option<String>,
    #[serde(default, with = "rfc3339_opt", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(default, with = "rfc3339_opt", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
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
    pub value: Option<String>,
    #[serde(flatten)]
    pub additional_properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_roles: Option<Vec<AppRole>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logout_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier_uris: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_to_other_tenants: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth2_allow_implicit_flow: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_membership_claims: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_client: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_resource_access: Option<Vec<RequiredResourceAccess>>,
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
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
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
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipalCreateParameters {
    pub app_id: String,
    pub account_enabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryObject {
    pub object_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
}

/// Body of the `$links` endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectoryObjectLink {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ODataList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(
        rename = "odata.nextLink",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub next_link: Option<String>,
}

impl<T> ODataList<T> {
    pub fn new(value: Vec<T>) -> Self {
        Self {
            value,
            next_link: None,
        }
    }
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
            start_date: credential.start_date,
            end_date: Some(credential.end_date),
            key_type: credential.key_type,
            usage: Some(KEY_USAGE_VERIFY.to_string()),
            value: Some(credential.value),
            ..Self::default()
        }
    }
}

impl CredentialModel for KeyCredential {
    fn view(&self) -> CredentialView {
        CredentialView {
            key_type: self.key_type.clone(),
            description: None,
            start_date: self.start_date,
            end_date: self.end_date,
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
            custom_key_identifier: credential
                .description
                .map(|description| BASE64_STD.encode(description.as_bytes())),
            start_date: credential.start_date,
            end_date: Some(credential.end_date),
            value: Some(credential.value),
            ..Self::default()
        }
    }
}

impl CredentialModel for PasswordCredential {
    fn view(&self) -> CredentialView {
        let description = self
            .custom_key_identifier
            .as_deref()
            .and_then(|encoded| BASE64_STD.decode(encoded).ok())
            .and_then(|raw| String::from_utf8(raw).ok());
        CredentialView {
            key_type: None,
            description,
            start_date: self.start_date,
            end_date: self.end_date,
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
            additional_properties: BTreeMap::new(),
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
