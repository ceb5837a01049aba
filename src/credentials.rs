//! Builds backend-neutral credentials from resource configuration.
//!
//! The builders perform no I/O. Their only inputs besides the configuration
//! are a fresh random key ID (when none is configured) and the current time
//! used to resolve `end_date_relative`.

use crate::id::{canonical_uuid, new_uuid};
use crate::reconcile::SubObject;
use crate::resource_data::ResourceData;
use base64::engine::general_purpose::STANDARD as BASE64_STD;
use base64::Engine as _;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const KEY_TYPE_ASYMMETRIC_X509: &str = "AsymmetricX509Cert";
pub const KEY_TYPE_SYMMETRIC: &str = "Symmetric";
pub const KEY_USAGE_VERIFY: &str = "Verify";

/// Credential construction failure attributed to one configuration field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CredentialError {
    message: String,
    attr: &'static str,
}

impl CredentialError {
    pub(crate) fn new(attr: &'static str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attr,
        }
    }

    pub fn attr(&self) -> &'static str {
        self.attr
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Certificate,
    Password,
}

impl CredentialKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CredentialKind::Certificate => crate::id::KIND_CERTIFICATE,
            CredentialKind::Password => crate::id::KIND_PASSWORD,
        }
    }
}

/// Credential ready to be converted into either API's wire model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub key_id: String,
    pub kind: CredentialKind,
    /// Certificate key type; `None` for passwords.
    pub key_type: Option<String>,
    /// Base64 payload for certificates, the verbatim secret for passwords.
    pub value: String,
    pub start_date: Option<OffsetDateTime>,
    pub end_date: OffsetDateTime,
    pub description: Option<String>,
}

/// Observable fields of a stored credential, as either API reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialView {
    pub key_type: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<OffsetDateTime>,
    pub end_date: Option<OffsetDateTime>,
}

/// Wire credential of one API.
pub(crate) trait CredentialModel: SubObject + From<Credential> {
    fn view(&self) -> CredentialView;
}

/// Raw credential configuration, with every optional field explicit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialConfig {
    pub key_type: Option<String>,
    pub value: String,
    pub key_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub end_date_relative: Option<String>,
    pub description: Option<String>,
}

impl CredentialConfig {
    pub fn from_resource(d: &ResourceData) -> Self {
        Self {
            key_type: d.get_ok_str("type"),
            value: d.get_str("value"),
            key_id: d.get_ok_str("key_id"),
            start_date: d.get_ok_str("start_date"),
            end_date: d.get_ok_str("end_date"),
            end_date_relative: d.get_ok_str("end_date_relative"),
            description: d.get_ok_str("description"),
        }
    }

    /// Builds a certificate credential, base64-encoding the configured value.
    pub fn build_certificate(self, now: OffsetDateTime) -> Result<Credential, CredentialError> {
        let key_type = self
            .key_type
            .clone()
            .unwrap_or_else(|| KEY_TYPE_ASYMMETRIC_X509.to_string());
        if key_type != KEY_TYPE_ASYMMETRIC_X509 && key_type != KEY_TYPE_SYMMETRIC {
            return Err(CredentialError::new(
                "type",
                format!(
                    "Unsupported certificate type {key_type:?}, expected \
                     {KEY_TYPE_ASYMMETRIC_X509:?} or {KEY_TYPE_SYMMETRIC:?}"
                ),
            ));
        }
        let mut credential = self.build(CredentialKind::Certificate, now)?;
        credential.value = BASE64_STD.encode(credential.value.as_bytes());
        credential.key_type = Some(key_type);
        Ok(credential)
    }

    /// Builds a password credential carrying the configured secret verbatim.
    pub fn build_password(self, now: OffsetDateTime) -> Result<Credential, CredentialError> {
        self.build(CredentialKind::Password, now)
    }

    fn build(self, kind: CredentialKind, now: OffsetDateTime) -> Result<Credential, CredentialError> {
        if self.value.is_empty() {
            return Err(CredentialError::new("value", "`value` must not be empty"));
        }
        let key_id = match self.key_id {
            Some(key_id) => canonical_uuid(&key_id).ok_or_else(|| {
                CredentialError::new(
                    "key_id",
                    format!("`key_id` {key_id:?} is not a valid UUID"),
                )
            })?,
            None => new_uuid(),
        };
        let end_date = resolve_end_date(
            self.end_date.as_deref(),
            self.end_date_relative.as_deref(),
            now,
        )?;
        let start_date = match self.start_date.as_deref() {
            Some(value) => Some(OffsetDateTime::parse(value, &Rfc3339).map_err(|e| {
                CredentialError::new(
                    "start_date",
                    format!("Unable to parse the provided start date {value:?}: {e}"),
                )
            })?),
            None => None,
        };
        Ok(Credential {
            key_id,
            kind,
            key_type: None,
            value: self.value,
            start_date,
            end_date,
            description: self.description,
        })
    }
}

/// The absolute date is consulted first, so it wins when both are set.
fn resolve_end_date(
    end_date: Option<&str>,
    end_date_relative: Option<&str>,
    now: OffsetDateTime,
) -> Result<OffsetDateTime, CredentialError> {
    if let Some(value) = end_date {
        return OffsetDateTime::parse(value, &Rfc3339).map_err(|e| {
            CredentialError::new(
                "end_date",
                format!("Unable to parse the provided end date {value:?}: {e}"),
            )
        });
    }
    if let Some(value) = end_date_relative {
        let relative_error = || {
            CredentialError::new(
                "end_date_relative",
                format!("Unable to parse `end_date_relative` ({value:?}) as a duration"),
            )
        };
        let offset = humantime::parse_duration(value).map_err(|_| relative_error())?;
        let offset = time::Duration::try_from(offset).map_err(|_| relative_error())?;
        return now.checked_add(offset).ok_or_else(relative_error);
    }
    Err(CredentialError::new(
        "end_date",
        "One of `end_date` or `end_date_relative` must be specified",
    ))
}

pub fn key_credential_for_resource(d: &ResourceData) -> Result<Credential, CredentialError> {
    CredentialConfig::from_resource(d).build_certificate(OffsetDateTime::now_utc())
}

pub fn password_credential_for_resource(d: &ResourceData) -> Result<Credential, CredentialError> {
    CredentialConfig::from_resource(d).build_password(OffsetDateTime::now_utc())
}

pub(crate) fn format_timestamp(value: Option<OffsetDateTime>) -> String {
    value
        .and_then(|value| value.format(&Rfc3339).ok())
        .unwrap_or_default()
}

/// Serde adapter for optional RFC 3339 timestamps used by both wire models.
pub(crate) mod rfc3339_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::format_description::well_known::Rfc3339;
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(
        value: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => {
                let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
                serializer.serialize_some(&formatted)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(value) if !value.is_empty() => OffsetDateTime::parse(&value, &Rfc3339)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}
