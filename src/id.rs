//! Composite resource identities of the form `{objectId}/{kind}/{subId}`.
//!
//! Both object and sub IDs are hyphenated UUIDs, which never contain `/`,
//! so the separator is unambiguous and the encoding is lossless. The
//! directory stores GUIDs lowercased, so every accepted UUID is folded to
//! lowercase before it is compared, stored or used as a lock name.

use std::fmt;
use uuid::Uuid;

pub const KIND_CERTIFICATE: &str = "certificate";
pub const KIND_PASSWORD: &str = "password";
pub const KIND_ROLE: &str = "role";
pub const KIND_MEMBER: &str = "member";
pub const KIND_OWNER: &str = "owner";

const SEPARATOR: char = '/';
const SEGMENTS: usize = 3;

/// Segment of a composite ID that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSegment {
    Whole,
    ObjectId,
    Kind,
    SubId,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("ID {id:?} should have 3 segments separated by '/', found {found}")]
    SegmentCount { id: String, found: usize },
    #[error("object ID segment {value:?} of ID {id:?} is not a valid UUID")]
    InvalidObjectId { id: String, value: String },
    #[error("type segment of ID {id:?} is empty")]
    EmptyKind { id: String },
    #[error("type segment of ID {id:?} is {found:?}, expected {expected:?}")]
    UnexpectedKind {
        id: String,
        found: String,
        expected: String,
    },
    #[error("sub-resource ID segment {value:?} of ID {id:?} is not a valid UUID")]
    InvalidSubId { id: String, value: String },
    #[error("ID {id:?} is not a valid UUID")]
    InvalidObject { id: String },
}

impl IdError {
    pub fn segment(&self) -> IdSegment {
        match self {
            IdError::SegmentCount { .. } | IdError::InvalidObject { .. } => IdSegment::Whole,
            IdError::InvalidObjectId { .. } => IdSegment::ObjectId,
            IdError::EmptyKind { .. } | IdError::UnexpectedKind { .. } => IdSegment::Kind,
            IdError::InvalidSubId { .. } => IdSegment::SubId,
        }
    }
}

/// Returns true for a canonical, hyphenated UUID.
pub fn is_uuid(value: &str) -> bool {
    value.len() == 36 && Uuid::try_parse(value).is_ok()
}

/// Lowercase form of a canonical UUID, or `None` when `value` is not one.
pub fn canonical_uuid(value: &str) -> Option<String> {
    is_uuid(value).then(|| value.to_ascii_lowercase())
}

/// Directory object IDs compare without regard to hex case.
pub(crate) fn same_id(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

pub(crate) fn new_uuid() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Validates the identity of a top-level object, which is a bare UUID.
pub fn parse_object_id(id: &str) -> Result<String, IdError> {
    canonical_uuid(id).ok_or_else(|| IdError::InvalidObject { id: id.to_string() })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectSubResourceId {
    pub object_id: String,
    pub kind: String,
    pub sub_id: String,
}

impl ObjectSubResourceId {
    pub fn new(
        object_id: impl Into<String>,
        kind: impl Into<String>,
        sub_id: impl Into<String>,
    ) -> Self {
        Self {
            object_id: object_id.into(),
            kind: kind.into(),
            sub_id: sub_id.into(),
        }
    }

    /// Decodes any composite ID, accepting whatever kind it carries. Both
    /// UUID segments come back lowercased.
    pub fn parse(id: &str) -> Result<Self, IdError> {
        let parts: Vec<&str> = id.split(SEPARATOR).collect();
        if parts.len() != SEGMENTS {
            return Err(IdError::SegmentCount {
                id: id.to_string(),
                found: parts.len(),
            });
        }
        let (object_id, kind, sub_id) = (parts[0], parts[1], parts[2]);
        let object_id = canonical_uuid(object_id).ok_or_else(|| IdError::InvalidObjectId {
            id: id.to_string(),
            value: object_id.to_string(),
        })?;
        if kind.is_empty() {
            return Err(IdError::EmptyKind { id: id.to_string() });
        }
        let sub_id = canonical_uuid(sub_id).ok_or_else(|| IdError::InvalidSubId {
            id: id.to_string(),
            value: sub_id.to_string(),
        })?;
        Ok(Self::new(object_id, kind, sub_id))
    }

    /// Decodes a composite ID and requires its kind to be `expected`.
    pub fn parse_as(id: &str, expected: &str) -> Result<Self, IdError> {
        let parsed = Self::parse(id)?;
        if parsed.kind != expected {
            return Err(IdError::UnexpectedKind {
                id: id.to_string(),
                found: parsed.kind,
                expected: expected.to_string(),
            });
        }
        Ok(parsed)
    }
}

impl fmt::Display for ObjectSubResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            self.object_id, self.kind, self.sub_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBJECT: &str = "11111111-1111-1111-1111-111111111111";
    const SUB: &str = "22222222-2222-2222-2222-222222222222";

    #[test]
    fn encode_then_parse_is_lossless() {
        for kind in [KIND_CERTIFICATE, KIND_PASSWORD, KIND_ROLE, KIND_MEMBER, KIND_OWNER] {
            let id = ObjectSubResourceId::new(OBJECT, kind, SUB);
            let encoded = id.to_string();
            assert_eq!(encoded, format!("{OBJECT}/{kind}/{SUB}"));
            assert_eq!(ObjectSubResourceId::parse(&encoded).expect("parse"), id);
        }
    }

    #[test]
    fn missing_segment_is_rejected() {
        let err = ObjectSubResourceId::parse(&format!("{OBJECT}/{SUB}")).unwrap_err();
        assert_eq!(err.segment(), IdSegment::Whole);
        assert!(matches!(err, IdError::SegmentCount { found: 2, .. }));
    }

    #[test]
    fn extra_segment_is_rejected() {
        let err =
            ObjectSubResourceId::parse(&format!("{OBJECT}/password/{SUB}/extra")).unwrap_err();
        assert!(matches!(err, IdError::SegmentCount { found: 4, .. }));
    }

    #[test]
    fn invalid_uuids_name_their_segment() {
        let err = ObjectSubResourceId::parse(&format!("not-a-uuid/password/{SUB}")).unwrap_err();
        assert_eq!(err.segment(), IdSegment::ObjectId);

        let err = ObjectSubResourceId::parse(&format!("{OBJECT}/password/1234")).unwrap_err();
        assert_eq!(err.segment(), IdSegment::SubId);

        let err = ObjectSubResourceId::parse(&format!("{OBJECT}//{SUB}")).unwrap_err();
        assert_eq!(err.segment(), IdSegment::Kind);
    }

    #[test]
    fn non_hyphenated_uuid_is_not_accepted() {
        let simple = OBJECT.replace('-', "");
        let err = ObjectSubResourceId::parse(&format!("{simple}/password/{SUB}")).unwrap_err();
        assert_eq!(err.segment(), IdSegment::ObjectId);
    }

    #[test]
    fn parse_as_checks_kind() {
        let encoded = format!("{OBJECT}/certificate/{SUB}");
        ObjectSubResourceId::parse_as(&encoded, KIND_CERTIFICATE).expect("certificate");
        let err = ObjectSubResourceId::parse_as(&encoded, KIND_PASSWORD).unwrap_err();
        assert_eq!(
            err,
            IdError::UnexpectedKind {
                id: encoded.clone(),
                found: "certificate".to_string(),
                expected: "password".to_string(),
            }
        );
    }

    #[test]
    fn generated_uuids_are_canonical_and_unique() {
        let first = new_uuid();
        let second = new_uuid();
        assert!(is_uuid(&first));
        assert!(is_uuid(&second));
        assert_ne!(first, second);
    }

    #[test]
    fn object_ids_must_be_uuids() {
        assert_eq!(parse_object_id(OBJECT), Ok(OBJECT.to_string()));
        assert_eq!(
            parse_object_id("abc").unwrap_err().segment(),
            IdSegment::Whole
        );
    }

    #[test]
    fn uppercase_uuids_are_folded_to_lowercase() {
        let upper = format!(
            "{}/role/AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE",
            OBJECT.to_uppercase()
        );
        let id = ObjectSubResourceId::parse(&upper).expect("parse");
        assert_eq!(id.object_id, OBJECT);
        assert_eq!(id.sub_id, "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee");
        assert_eq!(
            parse_object_id("ABCDEF01-2345-6789-ABCD-EF0123456789"),
            Ok("abcdef01-2345-6789-abcd-ef0123456789".to_string())
        );
        assert_eq!(canonical_uuid("not-a-uuid"), None);
        assert!(same_id(
            "ABCDEF01-2345-6789-ABCD-EF0123456789",
            "abcdef01-2345-6789-abcd-ef0123456789"
        ));
    }
}
