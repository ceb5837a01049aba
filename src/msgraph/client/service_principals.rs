use super::MsGraphClient;
use crate::common;
use crate::error::Error;
use crate::models::msgraph::ServicePrincipal;
use reqwest::StatusCode;

impl MsGraphClient {
    /// Creates a service principal and returns the stored object.
    pub async fn create_service_principal(
        &self,
        service_principal: &ServicePrincipal,
    ) -> Result<ServicePrincipal, Error> {
        let url = self.build_url(&["servicePrincipals"])?;
        let mut req = self.http.post(url).json(service_principal);
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

    /// Patches a service principal; only the properties set on `patch` change.
    pub async fn update_service_principal(
        &self,
        object_id: &str,
        patch: &ServicePrincipal,
    ) -> Result<(), Error> {
        let url = self.build_url(&["servicePrincipals", object_id])?;
        let mut req = self.http.patch(url).json(patch);
        req = self.apply_auth(req).await?;
        let resp = req.send().await?;
        self.expect_no_content(resp).await
    }

    /// Deletes a service principal.
    pub async fn delete_service_principal(&self, object_id: &str) -> Result<(), Error> {
        let url = self.build_url(&["servicePrincipals", object_id])?;
        let mut req = self.http.delete(url);
        req = self.apply_auth(req).await?;
        let resp = req.send().await?;
        self.expect_no_content(resp).await
    }
}
