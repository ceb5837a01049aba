use super::AadGraphClient;
use crate::error::Error;
use crate::models::aadgraph::{Application, DirectoryObject, KeyCredential, PasswordCredential};

impl AadGraphClient {
    /// Retrieves an application by object ID.
    pub async fn get_application(&self, object_id: &str) -> Result<Application, Error> {
        let url = self.build_url(&["applications", object_id])?;
        let mut req = self.http.get(url);
        req = self.apply_auth(req).await?;
        let resp = req.send().await?;
        self.expect_ok_json(resp).await
    }

    /// Lists the applications matching an OData `$filter` expression.
    pub async fn list_applications(&self, filter: &str) -> Result<Vec<Application>, Error> {
        let mut url = self.build_url(&["applications"])?;
        url.query_pairs_mut().append_pair("$filter", filter);
        self.get_all(url).await
    }

    pub async fn list_application_owners(
        &self,
        object_id: &str,
    ) -> Result<Vec<DirectoryObject>, Error> {
        let url = self.build_url(&["applications", object_id, "owners"])?;
        self.get_all(url).await
    }

    /// Patches an application; only the properties set on `patch` change.
    pub async fn update_application(
        &self,
        object_id: &str,
        patch: &Application,
    ) -> Result<(), Error> {
        let url = self.build_url(&["applications", object_id])?;
        let mut req = self.http.patch(url).json(patch);
        req = self.apply_auth(req).await?;
        let resp = req.send().await?;
        self.expect_no_content(resp).await
    }

    pub async fn list_application_key_credentials(
        &self,
        object_id: &str,
    ) -> Result<Vec<KeyCredential>, Error> {
        let url = self.build_url(&["applications", object_id, "keyCredentials"])?;
        self.get_all(url).await
    }

    pub async fn update_application_key_credentials(
        &self,
        object_id: &str,
        credentials: Vec<KeyCredential>,
    ) -> Result<(), Error> {
        let url = self.build_url(&["applications", object_id, "keyCredentials"])?;
        self.patch_collection(url, credentials).await
    }

    pub async fn list_application_password_credentials(
        &self,
        object_id: &str,
    ) -> Result<Vec<PasswordCredential>, Error> {
        let url = self.build_url(&["applications", object_id, "passwordCredentials"])?;
        self.get_all(url).await
    }

    pub async fn update_application_password_credentials(
        &self,
        object_id: &str,
        credentials: Vec<PasswordCredential>,
    ) -> Result<(), Error> {
        let url = self.build_url(&["applications", object_id, "passwordCredentials"])?;
        self.patch_collection(url, credentials).await
    }
}
