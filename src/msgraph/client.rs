use crate::client_defaults::DEFAULT_TIMEOUT;
use crate::common::{self, AuthProvider, GraphApi, TokenProvider};
use crate::error::{Error, CONFIG_ERROR_REDIRECT_WITH_AUTH};
use crate::models::msgraph::ODataList;
use log::debug;
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

mod applications;
mod groups;
mod service_principals;

/// Builder for [`MsGraphClient`].
///
/// The `base_url` should point to the versioned API root, for example
/// `https://graph.microsoft.com/beta`.
pub struct MsGraphClientBuilder {
    base_url: Url,
    timeout: Option<Duration>,
    disable_redirect: bool,
    http: Option<HttpClient>,
    auth: Option<AuthProvider>,
}

impl MsGraphClientBuilder {
    /// Creates a builder for the provided base URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, Error> {
        Ok(Self {
            base_url: Url::parse(base_url.as_ref())?,
            timeout: Some(DEFAULT_TIMEOUT),
            disable_redirect: true,
            http: None,
            auth: None,
        })
    }

    /// Sets the request timeout for the underlying HTTP client.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Control whether HTTP redirects should be followed.
    ///
    /// If authorization is configured, enabling redirects is rejected to avoid
    /// leaking tokens to redirected hosts.
    pub fn follow_redirects(mut self, follow_redirects: bool) -> Self {
        self.disable_redirect = !follow_redirects;
        self
    }

    /// Reuses an already configured HTTP client; timeout and redirect
    /// settings of this builder are then ignored.
    pub fn http_client(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    /// Sends a fixed bearer token with every request.
    pub fn bearer_token(mut self, token: impl AsRef<str>) -> Result<Self, Error> {
        self.auth = Some(AuthProvider::static_token(token)?);
        Ok(self)
    }

    /// Asks `provider` for a bearer token before every request.
    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.auth = Some(AuthProvider::Provider(provider));
        self
    }

    pub(crate) fn auth(mut self, auth: Option<AuthProvider>) -> Self {
        self.auth = auth;
        self
    }

    /// Builds the client from the configured options.
    pub fn build(self) -> Result<MsGraphClient, Error> {
        if self.auth.is_some() && !self.disable_redirect {
            return Err(Error::Config(CONFIG_ERROR_REDIRECT_WITH_AUTH.to_string()));
        }
        let http = match self.http {
            Some(http) => http,
            None => {
                let mut builder = HttpClient::builder();
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                if self.disable_redirect {
                    builder = builder.redirect(reqwest::redirect::Policy::none());
                }
                builder.build()?
            }
        };
        Ok(MsGraphClient {
            base_url: self.base_url,
            http,
            auth: self.auth,
        })
    }
}

/// Client for the new graph API.
pub struct MsGraphClient {
    base_url: Url,
    http: HttpClient,
    auth: Option<AuthProvider>,
}

impl MsGraphClient {
    /// Returns a builder for a client rooted at `base_url`.
    pub fn builder(base_url: impl AsRef<str>) -> Result<MsGraphClientBuilder, Error> {
        MsGraphClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn build_url(&self, segments: &[&str]) -> Result<Url, Error> {
        common::build_url(&self.base_url, segments, common::BuildUrlOptions::REQUEST)
    }

    /// Absolute `@odata.id` of a directory object, as the `$ref` endpoints expect.
    fn directory_object_ref(&self, object_id: &str) -> Result<String, Error> {
        Ok(self.build_url(&["directoryObjects", object_id])?.to_string())
    }

    async fn apply_auth(&self, req: RequestBuilder) -> Result<RequestBuilder, Error> {
        common::apply_auth(req, &self.auth, GraphApi::MsGraph).await
    }

    /// Resolves an `@odata.nextLink`, which must stay on the API's origin.
    fn next_page_url(&self, link: &str) -> Result<Url, Error> {
        let url = Url::parse(link)?;
        if url.origin() != self.base_url.origin() {
            return Err(Error::InvalidBaseUrl(format!(
                "refusing to follow next link to another origin: {link}"
            )));
        }
        Ok(url)
    }

    /// Reads every page of a collection endpoint, following `@odata.nextLink`.
    async fn get_all<T: DeserializeOwned>(&self, mut url: Url) -> Result<Vec<T>, Error> {
        let mut items = Vec::new();
        loop {
            let mut req = self.http.get(url);
            req = self.apply_auth(req).await?;
            let resp = req.send().await?;
            let page: ODataList<T> = self.expect_ok_json(resp).await?;
            items.extend(page.value);
            match page.next_link {
                Some(link) => {
                    url = self.next_page_url(&link)?;
                    debug!("Fetching next page of {}", url.path());
                }
                None => return Ok(items),
            }
        }
    }

    async fn expect_ok_json<T: DeserializeOwned>(&self, resp: Response) -> Result<T, Error> {
        common::expect_ok_json(resp).await
    }

    async fn expect_no_content(&self, resp: Response) -> Result<(), Error> {
        common::expect_no_content(resp).await
    }
}
