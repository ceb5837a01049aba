#![forbid(unsafe_code)]

mod aadgraph;
mod build_url;
mod client_defaults;
mod common;
mod credentials;
mod error;
mod id;
mod locks;
pub mod models;
mod msgraph;
mod poll;
mod provider;
mod reconcile;
mod resource_data;
mod resources;

pub use aadgraph::{AadGraphClient, AadGraphClientBuilder};
pub use common::{GraphApi, GroupLinkKind, TokenProvider};
pub use credentials::{
    key_credential_for_resource, password_credential_for_resource, Credential, CredentialConfig,
    CredentialError, CredentialKind, CredentialView, KEY_TYPE_ASYMMETRIC_X509, KEY_TYPE_SYMMETRIC,
};
pub use error::{Error, GraphError};
pub use id::{canonical_uuid, is_uuid, parse_object_id, IdError, IdSegment, ObjectSubResourceId};
pub use locks::{LockKey, LockRegistry, NamedLockGuard};
pub use msgraph::{MsGraphClient, MsGraphClientBuilder};
pub use provider::{Environment, Provider, ProviderBuilder};
pub use resource_data::{
    AttrSpec, AttrType, AttrValue, Block, Literal, ResourceData, ResourceDataBuilder, Schema,
};
pub use resources::{
    import, AppRoleDefinition, ApplicationView, DataSourceHandler, DataSourceType, GroupView,
    RequiredResourceAccess, ResourceAccess, ResourceHandler, ResourceType, ServicePrincipalView,
};
