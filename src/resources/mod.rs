//! Resource types managed by the provider and their lifecycle handlers.

use crate::error::Error;
use crate::id::{canonical_uuid, parse_object_id, ObjectSubResourceId};
use crate::id::{KIND_CERTIFICATE, KIND_MEMBER, KIND_OWNER, KIND_PASSWORD, KIND_ROLE};
use crate::reconcile::Target;
use crate::resource_data::{ResourceData, Schema};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

pub(crate) mod app_role;
pub(crate) mod application_data;
pub(crate) mod credential;
pub(crate) mod group_data;
pub(crate) mod membership;
pub(crate) mod service_principal;

pub use app_role::AppRoleDefinition;
pub use application_data::{ApplicationView, RequiredResourceAccess, ResourceAccess};
pub use group_data::GroupView;
pub use service_principal::ServicePrincipalView;

pub(crate) const APPLICATION_LOCK: &str = "azuread_application";
pub(crate) const SERVICE_PRINCIPAL_LOCK: &str = "azuread_service_principal";
pub(crate) const GROUP_LOCK: &str = "azuread_group";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    ApplicationCertificate,
    ApplicationPassword,
    ApplicationAppRole,
    ServicePrincipalCertificate,
    ServicePrincipalPassword,
    GroupMember,
    GroupOwner,
    ServicePrincipal,
}

impl ResourceType {
    pub const ALL: [ResourceType; 8] = [
        ResourceType::ApplicationCertificate,
        ResourceType::ApplicationPassword,
        ResourceType::ApplicationAppRole,
        ResourceType::ServicePrincipalCertificate,
        ResourceType::ServicePrincipalPassword,
        ResourceType::GroupMember,
        ResourceType::GroupOwner,
        ResourceType::ServicePrincipal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ResourceType::ApplicationCertificate => "azuread_application_certificate",
            ResourceType::ApplicationPassword => "azuread_application_password",
            ResourceType::ApplicationAppRole => "azuread_application_app_role",
            ResourceType::ServicePrincipalCertificate => "azuread_service_principal_certificate",
            ResourceType::ServicePrincipalPassword => "azuread_service_principal_password",
            ResourceType::GroupMember => "azuread_group_member",
            ResourceType::GroupOwner => "azuread_group_owner",
            ResourceType::ServicePrincipal => "azuread_service_principal",
        }
    }

    pub fn schema(self) -> Schema {
        match self {
            ResourceType::ApplicationCertificate => credential::APPLICATION_CERTIFICATE_SCHEMA,
            ResourceType::ApplicationPassword => credential::APPLICATION_PASSWORD_SCHEMA,
            ResourceType::ApplicationAppRole => app_role::SCHEMA,
            ResourceType::ServicePrincipalCertificate => {
                credential::SERVICE_PRINCIPAL_CERTIFICATE_SCHEMA
            }
            ResourceType::ServicePrincipalPassword => credential::SERVICE_PRINCIPAL_PASSWORD_SCHEMA,
            ResourceType::GroupMember => membership::MEMBER_SCHEMA,
            ResourceType::GroupOwner => membership::OWNER_SCHEMA,
            ResourceType::ServicePrincipal => service_principal::SCHEMA,
        }
    }

    /// Kind segment of the composite ID; `None` for types identified by a
    /// bare object ID.
    pub fn id_kind(self) -> Option<&'static str> {
        match self {
            ResourceType::ApplicationCertificate | ResourceType::ServicePrincipalCertificate => {
                Some(KIND_CERTIFICATE)
            }
            ResourceType::ApplicationPassword | ResourceType::ServicePrincipalPassword => {
                Some(KIND_PASSWORD)
            }
            ResourceType::ApplicationAppRole => Some(KIND_ROLE),
            ResourceType::GroupMember => Some(KIND_MEMBER),
            ResourceType::GroupOwner => Some(KIND_OWNER),
            ResourceType::ServicePrincipal => None,
        }
    }

    pub fn supports_update(self) -> bool {
        matches!(self, ResourceType::ApplicationAppRole)
    }

    /// Namespace of the named lock guarding the parent object.
    pub fn lock_namespace(self) -> &'static str {
        match self {
            ResourceType::ApplicationCertificate
            | ResourceType::ApplicationPassword
            | ResourceType::ApplicationAppRole => APPLICATION_LOCK,
            ResourceType::ServicePrincipalCertificate
            | ResourceType::ServicePrincipalPassword
            | ResourceType::ServicePrincipal => SERVICE_PRINCIPAL_LOCK,
            ResourceType::GroupMember | ResourceType::GroupOwner => GROUP_LOCK,
        }
    }

    pub(crate) fn target(self) -> Target {
        let (parent, parent_attr, what) = match self {
            ResourceType::ApplicationCertificate => {
                ("application", "application_object_id", "certificate credential")
            }
            ResourceType::ApplicationPassword => {
                ("application", "application_object_id", "password credential")
            }
            ResourceType::ApplicationAppRole => ("application", "application_object_id", "app role"),
            ResourceType::ServicePrincipalCertificate => (
                "service principal",
                "service_principal_id",
                "certificate credential",
            ),
            ResourceType::ServicePrincipalPassword => (
                "service principal",
                "service_principal_id",
                "password credential",
            ),
            ResourceType::GroupMember => ("group", "group_object_id", "member"),
            ResourceType::GroupOwner => ("group", "group_object_id", "owner"),
            ResourceType::ServicePrincipal => {
                ("service principal", "application_id", "service principal")
            }
        };
        Target {
            resource_type: self.name(),
            lock_namespace: self.lock_namespace(),
            parent,
            parent_attr,
            what,
            kind: self.id_kind().unwrap_or_default(),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .into_iter()
            .find(|resource_type| resource_type.name() == value)
            .ok_or_else(|| Error::Config(format!("unknown resource type {value:?}")))
    }
}

/// Lifecycle operations of one resource type against one backend.
///
/// `create` and `read` populate `d`; a read that finds the object gone
/// clears the tracked ID instead of failing.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    fn resource_type(&self) -> ResourceType;

    async fn create(&self, d: &mut ResourceData) -> Result<(), Error>;

    async fn read(&self, d: &mut ResourceData) -> Result<(), Error>;

    async fn update(&self, _d: &mut ResourceData) -> Result<(), Error> {
        Err(Error::Unsupported {
            resource_type: self.resource_type().name(),
            operation: "update",
        })
    }

    async fn delete(&self, d: &ResourceData) -> Result<(), Error>;
}

/// Read-only lookups of existing directory objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataSourceType {
    Application,
    Group,
}

impl DataSourceType {
    pub const ALL: [DataSourceType; 2] = [DataSourceType::Application, DataSourceType::Group];

    pub fn name(self) -> &'static str {
        match self {
            DataSourceType::Application => "azuread_application",
            DataSourceType::Group => "azuread_group",
        }
    }

    pub fn schema(self) -> Schema {
        match self {
            DataSourceType::Application => application_data::SCHEMA,
            DataSourceType::Group => group_data::SCHEMA,
        }
    }
}

impl fmt::Display for DataSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataSourceType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        DataSourceType::ALL
            .into_iter()
            .find(|data_source| data_source.name() == value)
            .ok_or_else(|| Error::Config(format!("unknown data source {value:?}")))
    }
}

/// Looks up one existing object from the configured lookup attributes and
/// fills every computed attribute. The tracked ID becomes the object ID.
#[async_trait]
pub trait DataSourceHandler: Send + Sync {
    fn data_source_type(&self) -> DataSourceType;

    async fn read(&self, d: &mut ResourceData) -> Result<(), Error>;
}

/// Returns the one lookup attribute that is set; none or several is a
/// validation error.
pub(crate) fn exactly_one_of(
    d: &ResourceData,
    attributes: &'static [&'static str],
) -> Result<&'static str, Error> {
    let mut present = attributes
        .iter()
        .copied()
        .filter(|attribute| d.get_ok_str(attribute).is_some());
    let listed = attributes
        .iter()
        .map(|attribute| format!("`{attribute}`"))
        .collect::<Vec<_>>()
        .join(", ");
    match (present.next(), present.next()) {
        (Some(only), None) => Ok(only),
        (None, _) => Err(Error::Validation {
            attribute: attributes.first().copied().unwrap_or_default(),
            message: format!("one of {listed} must be set"),
        }),
        (Some(_), Some(extra)) => Err(Error::Validation {
            attribute: extra,
            message: format!("only one of {listed} may be set"),
        }),
    }
}

/// Narrows filtered lookup results down to a single object.
pub(crate) fn single_match<T>(
    matches: Vec<T>,
    plural: &str,
    attribute: &'static str,
    criterion: &str,
) -> Result<T, Error> {
    let count = matches.len();
    let mut matches = matches.into_iter();
    match (matches.next(), count) {
        (Some(only), 1) => Ok(only),
        (None, _) => Err(Error::Lookup {
            attribute,
            message: format!("no {plural} found with {criterion}"),
        }),
        _ => Err(Error::Lookup {
            attribute,
            message: format!("found {count} {plural} with {criterion}"),
        }),
    }
}

/// One handler per resource type, all backed by the same API.
pub(crate) struct HandlerSet {
    pub application_certificate: Box<dyn ResourceHandler>,
    pub application_password: Box<dyn ResourceHandler>,
    pub application_app_role: Box<dyn ResourceHandler>,
    pub service_principal_certificate: Box<dyn ResourceHandler>,
    pub service_principal_password: Box<dyn ResourceHandler>,
    pub group_member: Box<dyn ResourceHandler>,
    pub group_owner: Box<dyn ResourceHandler>,
    pub service_principal: Box<dyn ResourceHandler>,
    pub application_data: Box<dyn DataSourceHandler>,
    pub group_data: Box<dyn DataSourceHandler>,
}

impl HandlerSet {
    pub(crate) fn get(&self, resource_type: ResourceType) -> &dyn ResourceHandler {
        match resource_type {
            ResourceType::ApplicationCertificate => self.application_certificate.as_ref(),
            ResourceType::ApplicationPassword => self.application_password.as_ref(),
            ResourceType::ApplicationAppRole => self.application_app_role.as_ref(),
            ResourceType::ServicePrincipalCertificate => {
                self.service_principal_certificate.as_ref()
            }
            ResourceType::ServicePrincipalPassword => self.service_principal_password.as_ref(),
            ResourceType::GroupMember => self.group_member.as_ref(),
            ResourceType::GroupOwner => self.group_owner.as_ref(),
            ResourceType::ServicePrincipal => self.service_principal.as_ref(),
        }
    }

    pub(crate) fn data_source(&self, data_source: DataSourceType) -> &dyn DataSourceHandler {
        match data_source {
            DataSourceType::Application => self.application_data.as_ref(),
            DataSourceType::Group => self.group_data.as_ref(),
        }
    }
}

/// Validates `id` for `resource_type` and returns a tracked, otherwise empty
/// configuration ready to be read. The tracked ID is the lowercased form.
pub fn import(resource_type: ResourceType, id: &str) -> Result<ResourceData, Error> {
    let parsed = match resource_type.id_kind() {
        Some(kind) => ObjectSubResourceId::parse_as(id, kind).map(|id| id.to_string()),
        None => parse_object_id(id),
    };
    let canonical = parsed.map_err(|e| {
        Error::from(e).context(
            format!("Importing {resource_type} with ID {id:?}"),
            Some("id"),
        )
    })?;
    let mut d = ResourceData::new(resource_type.schema());
    d.set_id(canonical);
    Ok(d)
}

/// Reads a required UUID attribute, lowercased.
pub(crate) fn required_uuid(d: &ResourceData, attribute: &'static str) -> Result<String, Error> {
    let value = d.get_str(attribute);
    canonical_uuid(&value).ok_or_else(|| Error::Validation {
        attribute,
        message: format!("expected a UUID, got {value:?}"),
    })
}

/// Parses the tracked composite ID, attributing failures to `id`.
pub(crate) fn tracked_id(
    d: &ResourceData,
    resource_type: ResourceType,
    what: &str,
) -> Result<ObjectSubResourceId, Error> {
    let kind = resource_type.id_kind().unwrap_or_default();
    ObjectSubResourceId::parse_as(d.id(), kind).map_err(|e| {
        Error::from(e).context(format!("Parsing {what} with ID {:?}", d.id()), Some("id"))
    })
}

/// Writes an observed value back, naming the attribute on failure.
pub(crate) fn set(
    d: &mut ResourceData,
    attribute: &str,
    value: impl Into<crate::resource_data::AttrValue>,
) -> Result<(), Error> {
    d.set(attribute, value)
        .map_err(|e| e.context(format!("Setting `{attribute}`"), Some(attribute)))
}

#[cfg(test)]
mod tests {
    use super::{exactly_one_of, import, single_match, DataSourceType, ResourceType};
    use crate::error::Error;
    use crate::id::IdSegment;
    use crate::resource_data::ResourceData;

    const APP: &str = "11111111-1111-1111-1111-111111111111";
    const SUB: &str = "22222222-2222-2222-2222-222222222222";

    #[test]
    fn names_round_trip_through_from_str() {
        for resource_type in ResourceType::ALL {
            let parsed: ResourceType = resource_type.name().parse().expect("parse");
            assert_eq!(parsed, resource_type);
        }
        assert!("azuread_application".parse::<ResourceType>().is_err());
    }

    #[test]
    fn data_source_names_round_trip_through_from_str() {
        for data_source in DataSourceType::ALL {
            let parsed: DataSourceType = data_source.name().parse().expect("parse");
            assert_eq!(parsed, data_source);
        }
        assert!("azuread_group_member".parse::<DataSourceType>().is_err());
    }

    #[test]
    fn lookup_needs_exactly_one_attribute() {
        const LOOKUP: &[&str] = &["object_id", "application_id", "name"];
        let schema = DataSourceType::Application.schema();

        let err = exactly_one_of(&ResourceData::new(schema), LOOKUP).unwrap_err();
        assert_eq!(err.attribute(), Some("object_id"));

        let d = ResourceData::builder(schema)
            .with("name", "billing")
            .with("object_id", "")
            .build()
            .expect("config");
        assert_eq!(exactly_one_of(&d, LOOKUP).expect("one"), "name");

        let d = ResourceData::builder(schema)
            .with("application_id", APP)
            .with("name", "billing")
            .build()
            .expect("config");
        let err = exactly_one_of(&d, LOOKUP).unwrap_err();
        assert_eq!(err.attribute(), Some("name"));
        assert!(err.to_string().contains("only one of"));
    }

    #[test]
    fn single_match_rejects_none_and_many() {
        assert_eq!(single_match(vec![7], "groups", "display_name", "x").expect("one"), 7);

        let err = single_match(Vec::<u8>::new(), "groups", "display_name", "display name \"ops\"")
            .unwrap_err();
        assert_eq!(err.attribute(), Some("display_name"));
        assert_eq!(err.to_string(), "no groups found with display name \"ops\"");

        let err = single_match(vec![1, 2], "groups", "display_name", "display name \"ops\"")
            .unwrap_err();
        assert_eq!(err.to_string(), "found 2 groups with display name \"ops\"");
    }

    #[test]
    fn lock_namespaces_follow_parent_type() {
        assert_eq!(
            ResourceType::ApplicationAppRole.lock_namespace(),
            "azuread_application"
        );
        assert_eq!(
            ResourceType::ServicePrincipalPassword.lock_namespace(),
            "azuread_service_principal"
        );
        assert_eq!(ResourceType::GroupOwner.lock_namespace(), "azuread_group");
    }

    #[test]
    fn import_accepts_ids_produced_by_create() {
        let d = import(
            ResourceType::ApplicationPassword,
            &format!("{APP}/password/{SUB}"),
        )
        .expect("import");
        assert_eq!(d.id(), format!("{APP}/password/{SUB}"));

        let d = import(ResourceType::ServicePrincipal, APP).expect("import");
        assert_eq!(d.id(), APP);
    }

    #[test]
    fn import_tracks_the_lowercased_id() {
        let upper = "ABCDEF01-1111-1111-1111-111111111111";
        let d = import(
            ResourceType::GroupMember,
            &format!("{upper}/member/{SUB}"),
        )
        .expect("import");
        assert_eq!(
            d.id(),
            format!("abcdef01-1111-1111-1111-111111111111/member/{SUB}")
        );

        let d = import(ResourceType::ServicePrincipal, upper).expect("import");
        assert_eq!(d.id(), "abcdef01-1111-1111-1111-111111111111");
    }

    #[test]
    fn import_reports_malformed_segment() {
        let err = import(
            ResourceType::ApplicationCertificate,
            &format!("{APP}/password/{SUB}"),
        )
        .unwrap_err();
        assert_eq!(err.attribute(), Some("id"));
        match err.root() {
            Error::InvalidId(id_err) => assert_eq!(id_err.segment(), IdSegment::Kind),
            other => panic!("unexpected error: {other:?}"),
        }

        let err = import(ResourceType::GroupMember, &format!("{APP}/member/nope")).unwrap_err();
        match err.root() {
            Error::InvalidId(id_err) => assert_eq!(id_err.segment(), IdSegment::SubId),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
