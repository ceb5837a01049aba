use crate::client_defaults::{AAD_GRAPH_API_VERSION, DEFAULT_TIMEOUT};
use crate::common::{self, AuthProvider, GraphApi, TokenProvider};
use crate::error::{Error, CONFIG_ERROR_REDIRECT_WITH_AUTH};
use crate::models::aadgraph::ODataList;
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

mod applications;
mod groups;
mod service_principals;

const API_VERSION_PARAM: &str = "api-version";

/// Builder for [`AadGraphClient`].
///
/// The `base_url` should point to the tenant root, for example
/// `https://graph.windows.net/00000000-0000-0000-0000-000000000000`.
pub struct AadGraphClientBuilder {
    base_url: Url,
    api_version: String,
    timeout: Option<Duration>,
    disable_redirect: bool,
    http: Option<HttpClient>,
    auth: Option<AuthProvider>,
}

impl AadGraphClientBuilder {
    /// Creates a builder for the provided tenant root URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, Error> {
        Ok(Self {
            base_url: Url::parse(base_url.as_ref())?,
            api_version: AAD_GRAPH_API_VERSION.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
            disable_redirect: true,
            http: None,
            auth: None,
        })
    }

    /// Overrides the `api-version` query parameter sent with every request.
    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
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

    /// Reuses an already configured HTTP client.
    pub fn http_client(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    pub fn bearer_token(mut self, token: impl AsRef<str>) -> Result<Self, Error> {
        self.auth = Some(AuthProvider::static_token(token)?);
        Ok(self)
    }

    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.auth = Some(AuthProvider::Provider(provider));
        self
    }

    pub(crate) fn auth(mut self, auth: Option<AuthProvider>) -> Self {
        self.auth = auth;
        self
    }

    /// Builds the client from the configured options.
    pub fn build(self) -> Result<AadGraphClient, Error> {
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
        Ok(AadGraphClient {
            base_url: self.base_url,
            api_version: self.api_version,
            http,
            auth: self.auth,
        })
    }
}

/// Client for the legacy directory graph API.
pub struct AadGraphClient {
    base_url: Url,
    api_version: String,
    http: HttpClient,
    auth: Option<AuthProvider>,
}

impl AadGraphClient {
    pub fn builder(base_url: impl AsRef<str>) -> Result<AadGraphClientBuilder, Error> {
        AadGraphClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn build_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = common::build_url(&self.base_url, segments, common::BuildUrlOptions::REQUEST)?;
        url.query_pairs_mut()
            .append_pair(API_VERSION_PARAM, &self.api_version);
        Ok(url)
    }

    /// Absolute URL of a directory object, as the `$links` endpoints expect.
    fn directory_object_url(&self, object_id: &str) -> Result<String, Error> {
        let url = common::build_url(
            &self.base_url,
            &["directoryObjects", object_id],
            common::BuildUrlOptions::REQUEST,
        )?;
        Ok(url.to_string())
    }

    async fn apply_auth(&self, req: RequestBuilder) -> Result<RequestBuilder, Error> {
        common::apply_auth(req, &self.auth, GraphApi::AadGraph).await
    }

    /// Resolves an `odata.nextLink`, which the legacy API returns relative to
    /// the tenant root and without the `api-version` parameter.
    fn next_page_url(&self, link: &str) -> Result<Url, Error> {
        let mut root = self.base_url.clone();
        root.set_query(None);
        root.set_fragment(None);
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        let mut url = root.join(link)?;
        if url.origin() != self.base_url.origin() {
            return Err(Error::InvalidBaseUrl(format!(
                "refusing to follow next link to another origin: {link}"
            )));
        }
        if !url.query_pairs().any(|(key, _)| key == API_VERSION_PARAM) {
            url.query_pairs_mut()
                .append_pair(API_VERSION_PARAM, &self.api_version);
        }
        Ok(url)
    }

    /// Reads every page of a collection endpoint.
    async fn get_all<T: DeserializeOwned>(&self, mut url: Url) -> Result<Vec<T>, Error> {
        let mut items = Vec::new();
        loop {
            let mut req = self.http.get(url);
            req = self.apply_auth(req).await?;
            let resp = req.send().await?;
            let page: ODataList<T> = self.expect_ok_json(resp).await?;
            items.extend(page.value);
            match page.next_link {
                Some(link) => url = self.next_page_url(&link)?,
                None => return Ok(items),
            }
        }
    }

    /// Replaces a collection endpoint with `{"value": items}`.
    async fn patch_collection<T: Serialize>(&self, url: Url, items: Vec<T>) -> Result<(), Error> {
        let body = ODataList::new(items);
        let mut req = self.http.patch(url).json(&body);
        req = self.apply_auth(req).await?;
        let resp = req.send().await?;
        self.expect_no_content(resp).await
    }

    async fn expect_ok_json<T: DeserializeOwned>(&self, resp: Response) -> Result<T, Error> {
        common::expect_ok_json(resp).await
    }

    async fn expect_no_content(&self, resp: Response) -> Result<(), Error> {
        common::expect_no_content(resp).await
    }
}
