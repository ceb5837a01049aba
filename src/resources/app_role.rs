use super::{required_uuid, set, tracked_id, ResourceHandler, ResourceType};
use crate::error::Error;
use crate::id::{canonical_uuid, new_uuid};
use crate::locks::LockRegistry;
use crate::reconcile::{CollectionStore, Reconciler, SubObject, Target};
use crate::resource_data::{AttrSpec, AttrType, AttrValue, Block, Literal, ResourceData, Schema};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;

pub const MEMBER_TYPE_USER: &str = "User";
pub const MEMBER_TYPE_APPLICATION: &str = "Application";

pub(crate) const SCHEMA: Schema = &[
    AttrSpec::new("application_object_id", AttrType::String),
    AttrSpec::new("allowed_member_types", AttrType::StringSet),
    AttrSpec::new("description", AttrType::String),
    AttrSpec::new("display_name", AttrType::String),
    AttrSpec::new("is_enabled", AttrType::Bool).with_default(Literal::Bool(true)),
    AttrSpec::new("role_id", AttrType::String),
    AttrSpec::new("value", AttrType::String),
];

/// API-independent shape of an app role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRoleDefinition {
    pub id: String,
    pub allowed_member_types: BTreeSet<String>,
    pub description: String,
    pub display_name: String,
    pub is_enabled: bool,
    pub value: Option<String>,
}

impl AppRoleDefinition {
    /// Validates the configured role. `id` replaces the configured
    /// `role_id`; without either a fresh UUID is generated.
    pub(crate) fn from_resource(d: &ResourceData, id: Option<&str>) -> Result<Self, Error> {
        let allowed_member_types = d.get_string_set("allowed_member_types");
        if allowed_member_types.is_empty() {
            return Err(Error::Validation {
                attribute: "allowed_member_types",
                message: "at least one member type is required".to_string(),
            });
        }
        if let Some(unknown) = allowed_member_types
            .iter()
            .find(|t| *t != MEMBER_TYPE_USER && *t != MEMBER_TYPE_APPLICATION)
        {
            return Err(Error::Validation {
                attribute: "allowed_member_types",
                message: format!(
                    "expected {MEMBER_TYPE_USER:?} or {MEMBER_TYPE_APPLICATION:?}, got {unknown:?}"
                ),
            });
        }
        let description = non_empty(d, "description")?;
        let display_name = non_empty(d, "display_name")?;

        let id = match id.map(str::to_string).or_else(|| d.get_ok_str("role_id")) {
            Some(id) => canonical_uuid(&id).ok_or_else(|| Error::Validation {
                attribute: "role_id",
                message: format!("expected a UUID, got {id:?}"),
            })?,
            None => new_uuid(),
        };

        Ok(Self {
            id,
            allowed_member_types,
            description,
            display_name,
            is_enabled: d.get_bool("is_enabled"),
            value: d.get_ok_str("value"),
        })
    }

    /// Block form used by the computed `app_roles` list of a service principal.
    pub(crate) fn to_block(&self) -> Block {
        let mut block = Block::new();
        block.insert("id".to_string(), AttrValue::from(self.id.as_str()));
        block.insert(
            "allowed_member_types".to_string(),
            AttrValue::from(self.allowed_member_types.clone()),
        );
        block.insert(
            "description".to_string(),
            AttrValue::from(self.description.as_str()),
        );
        block.insert(
            "display_name".to_string(),
            AttrValue::from(self.display_name.as_str()),
        );
        block.insert("is_enabled".to_string(), AttrValue::from(self.is_enabled));
        block.insert("value".to_string(), AttrValue::from(self.value.as_deref()));
        block
    }
}

fn non_empty(d: &ResourceData, attribute: &'static str) -> Result<String, Error> {
    d.get_ok_str(attribute).ok_or_else(|| Error::Validation {
        attribute,
        message: "must not be empty".to_string(),
    })
}

/// Wire app role of one API.
pub(crate) trait AppRoleModel: SubObject + From<AppRoleDefinition> {
    fn definition(&self) -> AppRoleDefinition;
}

/// App role stored in an application's `appRoles` collection.
pub(crate) struct AppRoleResource<M, S> {
    store: S,
    locks: Arc<LockRegistry>,
    _model: PhantomData<fn() -> M>,
}

impl<M, S> AppRoleResource<M, S>
where
    M: AppRoleModel,
    S: CollectionStore<M>,
{
    pub(crate) fn new(store: S, locks: Arc<LockRegistry>) -> Self {
        Self {
            store,
            locks,
            _model: PhantomData,
        }
    }

    fn target(&self) -> Target {
        ResourceType::ApplicationAppRole.target()
    }

    fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(&self.locks, self.target())
    }
}

#[async_trait]
impl<M, S> ResourceHandler for AppRoleResource<M, S>
where
    M: AppRoleModel,
    S: CollectionStore<M>,
{
    fn resource_type(&self) -> ResourceType {
        ResourceType::ApplicationAppRole
    }

    async fn create(&self, d: &mut ResourceData) -> Result<(), Error> {
        let object_id = required_uuid(d, self.target().parent_attr)?;
        let role = AppRoleDefinition::from_resource(d, None)?;
        let id = self
            .reconciler()
            .create(&self.store, &object_id, M::from(role))
            .await?;
        d.set_id(id.to_string());
        self.read(d).await
    }

    async fn read(&self, d: &mut ResourceData) -> Result<(), Error> {
        let id = tracked_id(d, ResourceType::ApplicationAppRole, self.target().what)?;
        let Some(role) = self.reconciler().read::<M, _>(&self.store, &id).await? else {
            d.clear_id();
            return Ok(());
        };

        let role = role.definition();
        set(d, "application_object_id", id.object_id.as_str())?;
        set(d, "role_id", id.sub_id.as_str())?;
        set(d, "allowed_member_types", role.allowed_member_types)?;
        set(d, "description", role.description)?;
        set(d, "display_name", role.display_name)?;
        set(d, "is_enabled", role.is_enabled)?;
        set(d, "value", role.value.as_deref())?;
        Ok(())
    }

    async fn update(&self, d: &mut ResourceData) -> Result<(), Error> {
        let id = tracked_id(d, ResourceType::ApplicationAppRole, self.target().what)?;
        let role = AppRoleDefinition::from_resource(d, Some(&id.sub_id))?;
        self.reconciler().update(&self.store, &id, M::from(role)).await?;
        self.read(d).await
    }

    async fn delete(&self, d: &ResourceData) -> Result<(), Error> {
        let id = tracked_id(d, ResourceType::ApplicationAppRole, self.target().what)?;
        self.reconciler().delete::<M, _>(&self.store, &id).await
    }
}
