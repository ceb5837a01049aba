//! Read-only lookup of an existing group and its links.

use super::{
    exactly_one_of, required_uuid, set, single_match, DataSourceHandler, DataSourceType,
};
use crate::common::{odata_eq, GroupLinkKind};
use crate::error::Error;
use crate::resource_data::{AttrSpec, AttrType, ResourceData, Schema};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

pub(crate) const SCHEMA: Schema = &[
    AttrSpec::new("display_name", AttrType::String),
    AttrSpec::new("object_id", AttrType::String),
    AttrSpec::new("description", AttrType::String),
    AttrSpec::new("members", AttrType::StringSet),
    AttrSpec::new("owners", AttrType::StringSet),
];

const LOOKUP: &[&str] = &["display_name", "object_id"];

/// Observed state of a group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupView {
    pub object_id: String,
    pub display_name: String,
    pub description: String,
}

/// Group lookups of one API.
///
/// `get` returns `Ok(None)` when the object does not exist.
#[async_trait]
pub(crate) trait GroupDirectory: Send + Sync {
    async fn get(&self, object_id: &str) -> Result<Option<GroupView>, Error>;

    /// Groups matching an OData `$filter` expression.
    async fn list(&self, filter: &str) -> Result<Vec<GroupView>, Error>;

    /// Object IDs of the group's members or owners.
    async fn links(&self, object_id: &str, kind: GroupLinkKind) -> Result<Vec<String>, Error>;
}

#[async_trait]
impl<S: GroupDirectory + ?Sized> GroupDirectory for Arc<S> {
    async fn get(&self, object_id: &str) -> Result<Option<GroupView>, Error> {
        (**self).get(object_id).await
    }

    async fn list(&self, filter: &str) -> Result<Vec<GroupView>, Error> {
        (**self).list(filter).await
    }

    async fn links(&self, object_id: &str, kind: GroupLinkKind) -> Result<Vec<String>, Error> {
        (**self).links(object_id, kind).await
    }
}

pub(crate) struct GroupDataSource<S> {
    store: S,
}

impl<S: GroupDirectory> GroupDataSource<S> {
    pub(crate) fn new(store: S) -> Self {
        Self { store }
    }

    async fn lookup(&self, d: &ResourceData) -> Result<GroupView, Error> {
        if exactly_one_of(d, LOOKUP)? == "object_id" {
            let object_id = required_uuid(d, "object_id")?;
            let found = self.store.get(&object_id).await.map_err(|e| {
                e.context(
                    format!("Retrieving group with object ID {object_id:?}"),
                    Some("object_id"),
                )
            })?;
            return found.ok_or_else(|| Error::Lookup {
                attribute: "object_id",
                message: format!("no group found with object ID {object_id:?}"),
            });
        }

        let display_name = d.get_str("display_name");
        let filter = odata_eq("displayName", &display_name);
        let mut matches = self.store.list(&filter).await.map_err(|e| {
            e.context(format!("Listing groups with filter {filter:?}"), None)
        })?;
        matches.retain(|group| group.display_name == display_name);
        single_match(
            matches,
            "groups",
            "display_name",
            &format!("display name {display_name:?}"),
        )
    }

    async fn links(&self, object_id: &str, kind: GroupLinkKind) -> Result<BTreeSet<String>, Error> {
        let ids = self.store.links(object_id, kind).await.map_err(|e| {
            e.context(
                format!("Listing {} of group with object ID {object_id:?}", kind.segment()),
                None,
            )
        })?;
        Ok(ids.into_iter().collect())
    }
}

#[async_trait]
impl<S: GroupDirectory> DataSourceHandler for GroupDataSource<S> {
    fn data_source_type(&self) -> DataSourceType {
        DataSourceType::Group
    }

    async fn read(&self, d: &mut ResourceData) -> Result<(), Error> {
        let group = self.lookup(d).await?;
        if group.object_id.is_empty() {
            return Err(Error::UnexpectedResponse(format!(
                "group {:?} has no object ID",
                group.display_name
            )));
        }
        let members = self.links(&group.object_id, GroupLinkKind::Members).await?;
        let owners = self.links(&group.object_id, GroupLinkKind::Owners).await?;

        d.set_id(group.object_id.as_str());
        set(d, "object_id", group.object_id)?;
        set(d, "display_name", group.display_name)?;
        set(d, "description", group.description)?;
        set(d, "members", members)?;
        set(d, "owners", owners)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{GroupDataSource, GroupDirectory, GroupView, SCHEMA};
    use crate::common::GroupLinkKind;
    use crate::error::{Error, GraphError};
    use crate::resource_data::ResourceData;
    use crate::resources::DataSourceHandler;
    use async_trait::async_trait;
    use std::collections::BTreeSet;

    const GROUP: &str = "44444444-4444-4444-4444-444444444444";
    const TWIN: &str = "77777777-7777-7777-7777-777777777777";
    const USER: &str = "55555555-5555-5555-5555-555555555555";
    const ADMIN: &str = "66666666-6666-6666-6666-666666666666";

    #[derive(Default)]
    struct Directory {
        groups: Vec<GroupView>,
        links_status: Option<u16>,
    }

    #[async_trait]
    impl GroupDirectory for Directory {
        async fn get(&self, object_id: &str) -> Result<Option<GroupView>, Error> {
            Ok(self.groups.iter().find(|g| g.object_id == object_id).cloned())
        }

        async fn list(&self, _filter: &str) -> Result<Vec<GroupView>, Error> {
            Ok(self.groups.clone())
        }

        async fn links(&self, _object_id: &str, kind: GroupLinkKind) -> Result<Vec<String>, Error> {
            if let Some(status) = self.links_status {
                return Err(Error::Api(GraphError {
                    status,
                    ..GraphError::default()
                }));
            }
            Ok(match kind {
                GroupLinkKind::Members => vec![USER.to_string(), ADMIN.to_string()],
                GroupLinkKind::Owners => vec![ADMIN.to_string()],
            })
        }
    }

    fn group(object_id: &str, display_name: &str) -> GroupView {
        GroupView {
            object_id: object_id.to_string(),
            display_name: display_name.to_string(),
            description: "Operations".to_string(),
        }
    }

    fn lookup(name: &str, value: &str) -> ResourceData {
        ResourceData::builder(SCHEMA)
            .with(name, value)
            .build()
            .expect("config")
    }

    #[tokio::test]
    async fn display_name_lookup_fills_members_and_owners() {
        let handler = GroupDataSource::new(Directory {
            groups: vec![group(GROUP, "ops"), group(TWIN, "ops-oncall")],
            ..Directory::default()
        });
        let mut d = lookup("display_name", "ops");

        handler.read(&mut d).await.expect("read");

        assert_eq!(d.id(), GROUP);
        assert_eq!(d.get_str("object_id"), GROUP);
        assert_eq!(d.get_str("description"), "Operations");
        assert_eq!(
            d.get_string_set("members"),
            BTreeSet::from([USER.to_string(), ADMIN.to_string()])
        );
        assert_eq!(d.get_string_set("owners"), BTreeSet::from([ADMIN.to_string()]));
    }

    #[tokio::test]
    async fn missing_object_id_is_reported_on_object_id() {
        let handler = GroupDataSource::new(Directory::default());
        let mut d = lookup("object_id", GROUP);
        let err = handler.read(&mut d).await.unwrap_err();
        assert_eq!(err.attribute(), Some("object_id"));
        assert_eq!(
            err.to_string(),
            format!("no group found with object ID {GROUP:?}")
        );
        assert!(!d.is_tracked());
    }

    #[tokio::test]
    async fn duplicate_display_names_are_rejected() {
        let handler = GroupDataSource::new(Directory {
            groups: vec![group(GROUP, "ops"), group(TWIN, "ops")],
            ..Directory::default()
        });
        let mut d = lookup("display_name", "ops");
        let err = handler.read(&mut d).await.unwrap_err();
        assert!(matches!(err, Error::Lookup { attribute: "display_name", .. }));
        assert!(!d.is_tracked());
    }

    #[tokio::test]
    async fn link_listing_failure_leaves_the_lookup_untracked() {
        let handler = GroupDataSource::new(Directory {
            groups: vec![group(GROUP, "ops")],
            links_status: Some(403),
        });
        let mut d = lookup("object_id", GROUP);
        let err = handler.read(&mut d).await.unwrap_err();
        assert!(matches!(err.root(), Error::Api(api) if api.status == 403));
        assert!(!d.is_tracked());
    }
}
