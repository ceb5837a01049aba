//! HTTP plumbing shared by both graph clients.

use crate::error::{parse_error_from_body, read_body_with_limit_async, Error, MAX_ERROR_BODY_BYTES};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use url::Url;

pub(crate) use crate::build_url::BuildUrlOptions;

/// The API a token is requested for; the two APIs use different audiences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphApi {
    AadGraph,
    MsGraph,
}

impl GraphApi {
    pub fn as_str(self) -> &'static str {
        match self {
            GraphApi::AadGraph => "aadgraph",
            GraphApi::MsGraph => "msgraph",
        }
    }
}

impl fmt::Display for GraphApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory links a group holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupLinkKind {
    Members,
    Owners,
}

impl GroupLinkKind {
    /// Path segment naming the link collection in both APIs.
    pub fn segment(self) -> &'static str {
        match self {
            GroupLinkKind::Members => "members",
            GroupLinkKind::Owners => "owners",
        }
    }
}

/// External source of bearer tokens.
///
/// Called once per request, so implementations are expected to cache.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self, api: GraphApi) -> Result<String, Error>;
}

#[derive(Clone)]
pub(crate) enum AuthProvider {
    StaticToken(String),
    Provider(Arc<dyn TokenProvider>),
}

impl AuthProvider {
    pub(crate) fn static_token(token: impl AsRef<str>) -> Result<Self, Error> {
        let token = token.as_ref().to_string();
        bearer_value(&token).map_err(|e| Error::Config(format!("config error: {e}")))?;
        Ok(AuthProvider::StaticToken(token))
    }
}

impl fmt::Debug for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthProvider::StaticToken(_) => f.write_str("StaticToken(<redacted>)"),
            AuthProvider::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

fn bearer_value(token: &str) -> Result<HeaderValue, String> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| format!("invalid bearer token: {e}"))?;
    value.set_sensitive(true);
    Ok(value)
}

pub(crate) async fn apply_auth(
    req: RequestBuilder,
    auth: &Option<AuthProvider>,
    api: GraphApi,
) -> Result<RequestBuilder, Error> {
    let Some(auth) = auth else {
        return Ok(req);
    };
    let value = match auth {
        AuthProvider::StaticToken(token) => {
            bearer_value(token).map_err(|e| Error::Config(format!("config error: {e}")))?
        }
        AuthProvider::Provider(provider) => {
            let token = provider.token(api).await?;
            bearer_value(&token).map_err(|e| {
                Error::Auth(format!("token provider returned an unusable token for {api}: {e}"))
            })?
        }
    };
    Ok(req.header(AUTHORIZATION, value))
}

pub(crate) fn build_url(
    base_url: &Url,
    segments: &[&str],
    options: BuildUrlOptions,
) -> Result<Url, Error> {
    let mut url = base_url.clone();
    if options.clear_query {
        url.set_query(None);
    }
    if options.clear_fragment {
        url.set_fragment(None);
    }
    {
        let mut path_segments = url
            .path_segments_mut()
            .map_err(|_| Error::InvalidBaseUrl(base_url.to_string()))?;
        if options.pop_if_empty {
            path_segments.pop_if_empty();
        }
        for segment in segments {
            path_segments.push(segment);
        }
    }
    Ok(url)
}

/// `$filter` expression matching `field` against a string literal.
///
/// Single quotes inside the value are doubled as OData requires.
pub(crate) fn odata_eq(field: &str, value: &str) -> String {
    format!("{field} eq '{}'", value.replace('\'', "''"))
}

pub(crate) async fn expect_json<T: DeserializeOwned>(
    resp: Response,
    expected: StatusCode,
) -> Result<T, Error> {
    if resp.status() == expected {
        resp.json::<T>().await.map_err(Error::from)
    } else {
        parse_error(resp).await
    }
}

pub(crate) async fn expect_ok_json<T: DeserializeOwned>(resp: Response) -> Result<T, Error> {
    expect_json(resp, StatusCode::OK).await
}

pub(crate) async fn expect_no_content(resp: Response) -> Result<(), Error> {
    if resp.status() == StatusCode::NO_CONTENT {
        Ok(())
    } else {
        parse_error(resp).await
    }
}

pub(crate) async fn parse_error<T>(mut resp: Response) -> Result<T, Error> {
    let status = resp.status();
    let body = read_body_with_limit_async(&mut resp, MAX_ERROR_BODY_BYTES).await?;
    Err(parse_error_from_body(status, &body))
}
