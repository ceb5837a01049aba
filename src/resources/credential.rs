use super::{required_uuid, set, tracked_id, ResourceHandler, ResourceType};
use crate::credentials::{
    format_timestamp, key_credential_for_resource, password_credential_for_resource,
    CredentialKind, CredentialModel, KEY_TYPE_ASYMMETRIC_X509,
};
use crate::error::Error;
use crate::locks::LockRegistry;
use crate::reconcile::{CollectionStore, Reconciler, Target};
use crate::resource_data::{AttrSpec, AttrType, Literal, ResourceData, Schema};
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

const CERTIFICATE_ATTRS: [AttrSpec; 6] = [
    AttrSpec::new("type", AttrType::String).with_default(Literal::Str(KEY_TYPE_ASYMMETRIC_X509)),
    AttrSpec::new("value", AttrType::String),
    AttrSpec::new("key_id", AttrType::String),
    AttrSpec::new("start_date", AttrType::String),
    AttrSpec::new("end_date", AttrType::String),
    AttrSpec::new("end_date_relative", AttrType::String),
];

const PASSWORD_ATTRS: [AttrSpec; 6] = [
    AttrSpec::new("value", AttrType::String),
    AttrSpec::new("key_id", AttrType::String),
    AttrSpec::new("start_date", AttrType::String),
    AttrSpec::new("end_date", AttrType::String),
    AttrSpec::new("end_date_relative", AttrType::String),
    AttrSpec::new("description", AttrType::String),
];

const fn with_parent(parent_attr: &'static str, attrs: [AttrSpec; 6]) -> [AttrSpec; 7] {
    [
        AttrSpec::new(parent_attr, AttrType::String),
        attrs[0],
        attrs[1],
        attrs[2],
        attrs[3],
        attrs[4],
        attrs[5],
    ]
}

pub(crate) const APPLICATION_CERTIFICATE_SCHEMA: Schema =
    &with_parent("application_object_id", CERTIFICATE_ATTRS);
pub(crate) const APPLICATION_PASSWORD_SCHEMA: Schema =
    &with_parent("application_object_id", PASSWORD_ATTRS);
pub(crate) const SERVICE_PRINCIPAL_CERTIFICATE_SCHEMA: Schema =
    &with_parent("service_principal_id", CERTIFICATE_ATTRS);
pub(crate) const SERVICE_PRINCIPAL_PASSWORD_SCHEMA: Schema =
    &with_parent("service_principal_id", PASSWORD_ATTRS);

/// Certificate or password credential stored in a parent's credential
/// collection of wire type `M`.
pub(crate) struct CredentialResource<M, S> {
    resource_type: ResourceType,
    kind: CredentialKind,
    store: S,
    locks: Arc<LockRegistry>,
    _model: PhantomData<fn() -> M>,
}

impl<M, S> CredentialResource<M, S>
where
    M: CredentialModel,
    S: CollectionStore<M>,
{
    pub(crate) fn new(resource_type: ResourceType, store: S, locks: Arc<LockRegistry>) -> Self {
        let kind = match resource_type {
            ResourceType::ApplicationCertificate | ResourceType::ServicePrincipalCertificate => {
                CredentialKind::Certificate
            }
            _ => CredentialKind::Password,
        };
        Self {
            resource_type,
            kind,
            store,
            locks,
            _model: PhantomData,
        }
    }

    fn target(&self) -> Target {
        self.resource_type.target()
    }

    fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(&self.locks, self.target())
    }
}

#[async_trait]
impl<M, S> ResourceHandler for CredentialResource<M, S>
where
    M: CredentialModel,
    S: CollectionStore<M>,
{
    fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    async fn create(&self, d: &mut ResourceData) -> Result<(), Error> {
        let target = self.target();
        let object_id = required_uuid(d, target.parent_attr)?;
        let credential = match self.kind {
            CredentialKind::Certificate => key_credential_for_resource(d),
            CredentialKind::Password => password_credential_for_resource(d),
        }
        .map_err(|e| {
            Error::from(e).context(
                format!(
                    "Generating {}s for {} with object ID {object_id:?}",
                    target.what, target.parent
                ),
                None,
            )
        })?;

        let id = self
            .reconciler()
            .create(&self.store, &object_id, M::from(credential))
            .await?;
        d.set_id(id.to_string());
        self.read(d).await
    }

    async fn read(&self, d: &mut ResourceData) -> Result<(), Error> {
        let target = self.target();
        let id = tracked_id(d, self.resource_type, target.what)?;
        let Some(credential) = self.reconciler().read::<M, _>(&self.store, &id).await? else {
            d.clear_id();
            return Ok(());
        };

        let view = credential.view();
        set(d, target.parent_attr, id.object_id.as_str())?;
        set(d, "key_id", id.sub_id.as_str())?;
        match self.kind {
            CredentialKind::Certificate => {
                set(d, "type", view.key_type.unwrap_or_default())?;
            }
            CredentialKind::Password => {
                set(d, "description", view.description.unwrap_or_default())?;
            }
        }
        set(d, "start_date", format_timestamp(view.start_date))?;
        set(d, "end_date", format_timestamp(view.end_date))?;
        Ok(())
    }

    async fn delete(&self, d: &ResourceData) -> Result<(), Error> {
        let id = tracked_id(d, self.resource_type, self.target().what)?;
        self.reconciler().delete::<M, _>(&self.store, &id).await
    }
}
