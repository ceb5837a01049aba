//! Provider configuration and backend selection.

use crate::aadgraph::{self, AadGraphClient};
use crate::client_defaults::{DEFAULT_TIMEOUT, MSGRAPH_API_VERSION};
use crate::common::{build_url, AuthProvider, BuildUrlOptions, GraphApi, TokenProvider};
use crate::error::{Error, CONFIG_ERROR_REDIRECT_WITH_AUTH};
use crate::id::is_uuid;
use crate::locks::LockRegistry;
use crate::msgraph::{self, MsGraphClient};
use crate::resource_data::ResourceData;
use crate::resources::{
    self, DataSourceHandler, DataSourceType, HandlerSet, ResourceHandler, ResourceType,
};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Cloud the tenant lives in; selects the default endpoints of both APIs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Environment {
    #[default]
    Public,
    UsGovernment,
    China,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Public => "public",
            Environment::UsGovernment => "usgovernment",
            Environment::China => "china",
        }
    }

    pub fn aad_graph_endpoint(self) -> &'static str {
        match self {
            Environment::Public => "https://graph.windows.net",
            Environment::UsGovernment => "https://graph.microsoftazure.us",
            Environment::China => "https://graph.chinacloudapi.cn",
        }
    }

    pub fn msgraph_endpoint(self) -> &'static str {
        match self {
            Environment::Public => "https://graph.microsoft.com",
            Environment::UsGovernment => "https://graph.microsoft.us",
            Environment::China => "https://microsoftgraph.chinacloudapi.cn",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "public" => Ok(Environment::Public),
            "usgovernment" => Ok(Environment::UsGovernment),
            "china" => Ok(Environment::China),
            _ => Err(Error::Config(format!(
                "unknown environment {value:?}: expected public, usgovernment or china"
            ))),
        }
    }
}

/// Builder for [`Provider`].
pub struct ProviderBuilder {
    tenant_id: String,
    environment: Environment,
    enable_msgraph: bool,
    aad_graph_endpoint: Option<String>,
    msgraph_endpoint: Option<String>,
    timeout: Duration,
    disable_redirect: bool,
    auth: Option<AuthProvider>,
    locks: Option<Arc<LockRegistry>>,
}

impl ProviderBuilder {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            environment: Environment::default(),
            enable_msgraph: false,
            aad_graph_endpoint: None,
            msgraph_endpoint: None,
            timeout: DEFAULT_TIMEOUT,
            disable_redirect: true,
            auth: None,
            locks: None,
        }
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Routes every resource type through the new graph API instead of the
    /// legacy one.
    pub fn enable_msgraph(mut self, enable: bool) -> Self {
        self.enable_msgraph = enable;
        self
    }

    /// Overrides the legacy API endpoint of the selected environment.
    pub fn aad_graph_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.aad_graph_endpoint = Some(endpoint.into());
        self
    }

    /// Overrides the new API endpoint of the selected environment.
    pub fn msgraph_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.msgraph_endpoint = Some(endpoint.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Control whether HTTP redirects should be followed.
    ///
    /// If authorization is configured, enabling redirects is rejected.
    pub fn follow_redirects(mut self, follow_redirects: bool) -> Self {
        self.disable_redirect = !follow_redirects;
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

    /// Shares a lock registry with other providers in the same process.
    pub fn locks(mut self, locks: Arc<LockRegistry>) -> Self {
        self.locks = Some(locks);
        self
    }

    pub fn build(self) -> Result<Provider, Error> {
        if !is_uuid(&self.tenant_id) {
            return Err(Error::Validation {
                attribute: "tenant_id",
                message: format!("expected a UUID, got {:?}", self.tenant_id),
            });
        }
        if self.auth.is_some() && !self.disable_redirect {
            return Err(Error::Config(CONFIG_ERROR_REDIRECT_WITH_AUTH.to_string()));
        }
        let locks = self.locks.unwrap_or_default();

        let (api, handlers) = if self.enable_msgraph {
            let endpoint = self
                .msgraph_endpoint
                .as_deref()
                .unwrap_or(self.environment.msgraph_endpoint());
            let base_url = api_root(endpoint, MSGRAPH_API_VERSION)?;
            let client = MsGraphClient::builder(base_url)?
                .timeout(self.timeout)
                .follow_redirects(!self.disable_redirect)
                .auth(self.auth)
                .build()?;
            (
                GraphApi::MsGraph,
                msgraph::handlers(Arc::new(client), Arc::clone(&locks)),
            )
        } else {
            let endpoint = self
                .aad_graph_endpoint
                .as_deref()
                .unwrap_or(self.environment.aad_graph_endpoint());
            let base_url = api_root(endpoint, &self.tenant_id)?;
            let client = AadGraphClient::builder(base_url)?
                .timeout(self.timeout)
                .follow_redirects(!self.disable_redirect)
                .auth(self.auth)
                .build()?;
            (
                GraphApi::AadGraph,
                aadgraph::handlers(Arc::new(client), Arc::clone(&locks)),
            )
        };

        Ok(Provider {
            tenant_id: self.tenant_id,
            environment: self.environment,
            api,
            handlers,
            locks,
        })
    }
}

/// Appends `segment` to the endpoint path.
fn api_root(endpoint: &str, segment: &str) -> Result<String, Error> {
    let url = Url::parse(endpoint)?;
    let url = build_url(&url, &[segment], BuildUrlOptions::REQUEST)?;
    Ok(url.to_string())
}

/// Configured provider: one handler per resource type, all backed by the
/// API selected at construction.
pub struct Provider {
    tenant_id: String,
    environment: Environment,
    api: GraphApi,
    handlers: HandlerSet,
    locks: Arc<LockRegistry>,
}

impl Provider {
    pub fn builder(tenant_id: impl Into<String>) -> ProviderBuilder {
        ProviderBuilder::new(tenant_id)
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn api(&self) -> GraphApi {
        self.api
    }

    pub fn uses_msgraph(&self) -> bool {
        self.api == GraphApi::MsGraph
    }

    pub fn locks(&self) -> &Arc<LockRegistry> {
        &self.locks
    }

    pub fn resource(&self, resource_type: ResourceType) -> &dyn ResourceHandler {
        self.handlers.get(resource_type)
    }

    /// Validates an existing identity and returns configuration tracking it.
    pub fn import(&self, resource_type: ResourceType, id: &str) -> Result<ResourceData, Error> {
        resources::import(resource_type, id)
    }

    pub async fn create(
        &self,
        resource_type: ResourceType,
        d: &mut ResourceData,
    ) -> Result<(), Error> {
        self.resource(resource_type).create(d).await
    }

    pub async fn read(&self, resource_type: ResourceType, d: &mut ResourceData) -> Result<(), Error> {
        self.resource(resource_type).read(d).await
    }

    pub async fn update(
        &self,
        resource_type: ResourceType,
        d: &mut ResourceData,
    ) -> Result<(), Error> {
        self.resource(resource_type).update(d).await
    }

    pub async fn delete(&self, resource_type: ResourceType, d: &ResourceData) -> Result<(), Error> {
        self.resource(resource_type).delete(d).await
    }

    pub fn data_source(&self, data_source: DataSourceType) -> &dyn DataSourceHandler {
        self.handlers.data_source(data_source)
    }

    /// Looks up an existing object and fills the computed attributes of `d`.
    pub async fn read_data_source(
        &self,
        data_source: DataSourceType,
        d: &mut ResourceData,
    ) -> Result<(), Error> {
        self.data_source(data_source).read(d).await
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("tenant_id", &self.tenant_id)
            .field("environment", &self.environment)
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}
