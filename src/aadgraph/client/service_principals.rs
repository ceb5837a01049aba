use super::AadGraphClient;
use crate::common;
use crate::error::Error;
use crate::models::aadgraph::{
    KeyCredential, PasswordCredential, ServicePrincipal, ServicePrincipalCreateParameters,
};
use reqwest::StatusCode;

impl AadGraphClient {
    /// Creates a service principal and returns the stored object.
    pub async fn create_service_principal(
        &self,
        parameters: &ServicePrincipalCreateParameters,
    ) -> Result<ServicePrincipal, Error> {
        let url = self.build_url(&["servicePrincipals"])?;
        let mut req = self.http.post(url).json(parameters);
        req = self.apply_auth(req).await?;
        let resp = req.send().await?;
        common::expect_json(resp, StatusCode::CREATED).await
    }

    /// Retrieves a service principal by object ID.
    pub async fn get_service_principal(&self, object_id: &str) -> Result<ServicePrincipal, Error> {
        let url = self.build_url(&["servicePrincipals", object_id])?;
        let mut req = self.http.get(url);
        req = self.apply_auth(req).await?;
        let resp = req.send().await?;
        self.expect_ok_json(resp).await
    }

    /// Deletes a service principal.
    pub async fn delete_service_principal(&self, object_id: &str) -> Result<(), Error> {
        let url = self.build_url(&["servicePrincipals", object_id])?;
        let mut req = self.http.delete(url);
        req = self.apply_auth(req).await?;
        let resp = req.send().await?;
        self.expect_no_content(resp).await
    }

    pub async fn list_service_principal_key_credentials(
        &self,
        object_id: &str,
    ) -> Result<Vec<KeyCredential>, Error> {
        let url = self.build_url(&["servicePrincipals", object_id, "keyCredentials"])?;
        self.get_all(url).await
    }

    pub async fn update_service_principal_key_credentials(
        &self,
        object_id: &str,
        credentials: Vec<KeyCredential>,
    ) -> Result<(), Error> {
        let url = self.build_url(&["servicePrincipals", object_id, "keyCredentials"])?;
        self.patch_collection(url, credentials).await
    }

    pub async fn list_service_principal_password_credentials(
        &self,
        object_id: &str,
    ) -> Result<Vec<PasswordCredential>, Error> {
        let url = self.build_url(&["servicePrincipals", object_id, "passwordCredentials"])?;
        self.get_all(url).await
    }

    pub async fn update_service_principal_password_credentials(
        &self,
        object_id: &str,
        credentials: Vec<PasswordCredential>,
    ) -> Result<(), Error> {
        let url = self.build_url(&["servicePrincipals", object_id, "passwordCredentials"])?;
        self.patch_collection(url, credentials).await
    }
}
