use crate::credentials::CredentialError;
use crate::id::IdError;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;

pub(crate) const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;
pub(crate) const CONFIG_ERROR_REDIRECT_WITH_AUTH: &str =
    "config error: redirects must be disabled when authorization is configured";

/// Error payload returned by either graph API.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct GraphError {
    pub status: u16,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl GraphError {
    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND.as_u16()
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code.is_empty(), self.message.is_empty()) {
            (true, true) => write!(f, "status={}", self.status),
            (true, false) => write!(f, "status={}, message={}", self.status, self.message),
            (false, true) => write!(f, "status={}, code={}", self.status, self.code),
            (false, false) => write!(
                f,
                "status={}, code={}, message={}",
                self.status, self.code, self.message
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("graph api error: {0}")]
    Api(GraphError),
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("authorization error: {0}")]
    Auth(String),
    #[error("{0}")]
    Config(String),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    InvalidId(#[from] IdError),
    #[error("invalid value for `{attribute}`: {message}")]
    Validation {
        attribute: &'static str,
        message: String,
    },
    #[error("setting `{attribute}`: {message}")]
    Attribute { attribute: String, message: String },
    /// A data source lookup matched no object, or more than one.
    #[error("{message}")]
    Lookup {
        attribute: &'static str,
        message: String,
    },
    #[error("{parent} with object ID {object_id:?} was not found")]
    ParentNotFound {
        parent: &'static str,
        attribute: &'static str,
        object_id: String,
    },
    #[error(
        "a resource with the ID {id:?} already exists - to be managed via Terraform this resource \
         needs to be imported into the State. Please see the resource documentation for \
         {resource_type:?} for more information"
    )]
    AlreadyExists {
        resource_type: &'static str,
        id: String,
    },
    #[error("{what} {sub_id:?} was not found on {parent} with object ID {object_id:?}")]
    SubObjectNotFound {
        what: &'static str,
        parent: &'static str,
        object_id: String,
        sub_id: String,
    },
    #[error("waiting for {what} with object ID {object_id:?} to replicate: timed out after {waited_secs}s")]
    ReplicationTimeout {
        what: &'static str,
        object_id: String,
        waited_secs: u64,
    },
    #[error("{resource_type} does not support {operation}")]
    Unsupported {
        resource_type: &'static str,
        operation: &'static str,
    },
    #[error("{summary}: {source}")]
    Context {
        summary: String,
        attribute: Option<String>,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps `self` with a user-facing summary and optional attribute path.
    pub(crate) fn context(self, summary: impl Into<String>, attribute: Option<&str>) -> Self {
        Error::Context {
            summary: summary.into(),
            attribute: attribute.map(str::to_string),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping any `Context` wrappers.
    pub fn root(&self) -> &Error {
        let mut current = self;
        while let Error::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// Returns true when the API reported the target object as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Error::Api(err) if err.is_not_found())
    }

    /// Configuration attribute this error should be reported against, when known.
    ///
    /// The outermost attribute wins, so a `Context` can re-home a lower error
    /// onto the field the user actually configured.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Error::Context {
                attribute: Some(attribute),
                ..
            } => Some(attribute.as_str()),
            Error::Context { source, .. } => source.attribute(),
            Error::Credential(err) => Some(err.attr()),
            Error::InvalidId(_) => Some("id"),
            Error::Validation { attribute, .. } => Some(*attribute),
            Error::Attribute { attribute, .. } => Some(attribute.as_str()),
            Error::ParentNotFound { attribute, .. } => Some(*attribute),
            Error::Lookup { attribute, .. } => Some(*attribute),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ODataErrorEnvelope {
    error: ODataErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ODataErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    inner_error: Option<ODataInnerError>,
}

#[derive(Debug, Deserialize)]
struct ODataInnerError {
    #[serde(default, rename = "request-id")]
    request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyErrorEnvelope {
    #[serde(rename = "odata.error")]
    error: LegacyErrorBody,
}

#[derive(Debug, Deserialize)]
struct LegacyErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: Option<LegacyErrorMessage>,
    #[serde(default, rename = "requestId")]
    request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyErrorMessage {
    #[serde(default)]
    value: String,
}

pub(crate) fn fallback_message(status: StatusCode, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body).trim().to_string();
    let reason = status.canonical_reason().unwrap_or("unknown status");
    if text.is_empty() {
        reason.to_string()
    } else {
        format!("{reason}: {text}")
    }
}

/// Builds an [`Error::Api`] from a non-success response body.
///
/// Understands the OData envelope of the new API and the `odata.error`
/// envelope of the legacy API; anything else falls back to the status text.
pub(crate) fn parse_error_from_body(status: StatusCode, body: &[u8]) -> Error {
    let mut err = if let Ok(envelope) = serde_json::from_slice::<ODataErrorEnvelope>(body) {
        GraphError {
            status: status.as_u16(),
            code: envelope.error.code,
            message: envelope.error.message,
            request_id: envelope.error.inner_error.and_then(|inner| inner.request_id),
        }
    } else if let Ok(envelope) = serde_json::from_slice::<LegacyErrorEnvelope>(body) {
        GraphError {
            status: status.as_u16(),
            code: envelope.error.code,
            message: envelope
                .error
                .message
                .map(|message| message.value)
                .unwrap_or_default(),
            request_id: envelope.error.request_id,
        }
    } else {
        GraphError {
            status: status.as_u16(),
            ..GraphError::default()
        }
    };
    if err.message.is_empty() {
        err.message = fallback_message(status, body);
    }
    Error::Api(err)
}

pub(crate) async fn read_body_with_limit_async(
    resp: &mut Response,
    limit: usize,
) -> Result<Vec<u8>, Error> {
    let mut body = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        let remaining = limit.saturating_sub(body.len());
        if remaining == 0 {
            break;
        }
        let take = chunk.len().min(remaining);
        body.extend_from_slice(&chunk[..take]);
    }
    Ok(body)
}
