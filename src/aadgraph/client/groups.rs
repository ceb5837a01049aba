use super::AadGraphClient;
use crate::common::GroupLinkKind;
use crate::error::Error;
use crate::models::aadgraph::{DirectoryObject, DirectoryObjectLink, Group};

impl AadGraphClient {
    /// Retrieves a group by object ID.
    pub async fn get_group(&self, object_id: &str) -> Result<Group, Error> {
        let url = self.build_url(&["groups", object_id])?;
        let mut req = self.http.get(url);
        req = self.apply_auth(req).await?;
        let resp = req.send().await?;
        self.expect_ok_json(resp).await
    }

    /// Lists the groups matching an OData `$filter` expression.
    pub async fn list_groups(&self, filter: &str) -> Result<Vec<Group>, Error> {
        let mut url = self.build_url(&["groups"])?;
        url.query_pairs_mut().append_pair("$filter", filter);
        self.get_all(url).await
    }

    /// Lists every member or owner of a group, following `odata.nextLink`.
    pub async fn list_group_links(
        &self,
        group_id: &str,
        kind: GroupLinkKind,
    ) -> Result<Vec<DirectoryObject>, Error> {
        let url = self.build_url(&["groups", group_id, kind.segment()])?;
        self.get_all(url).await
    }

    /// Adds a directory object as a member or owner of a group.
    pub async fn add_group_link(
        &self,
        group_id: &str,
        kind: GroupLinkKind,
        object_id: &str,
    ) -> Result<(), Error> {
        let url = self.build_url(&["groups", group_id, "$links", kind.segment()])?;
        let body = DirectoryObjectLink {
            url: self.directory_object_url(object_id)?,
        };
        let mut req = self.http.post(url).json(&body);
        req = self.apply_auth(req).await?;
        let resp = req.send().await?;
        self.expect_no_content(resp).await
    }

    /// Removes a member or owner from a group.
    pub async fn remove_group_link(
        &self,
        group_id: &str,
        kind: GroupLinkKind,
        object_id: &str,
    ) -> Result<(), Error> {
        let url = self.build_url(&["groups", group_id, "$links", kind.segment(), object_id])?;
        let mut req = self.http.delete(url);
        req = self.apply_auth(req).await?;
        let resp = req.send().await?;
        self.expect_no_content(resp).await
    }
}
