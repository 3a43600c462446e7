//! Guestbook entry model and validation.
//!
//! An entry carries two notions of time:
//!
//! - `date`: the moment the signer's browser claims the entry was signed.
//!   Display only; the server fills it from `created_at` when omitted.
//! - `created_at`: assigned by the document store on insert. This is the
//!   authoritative timestamp and the only one used for ordering.
//!
//! The signature is an opaque image data URI. It is length-checked and
//! prefix-checked but never decoded or re-encoded.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use guestbook_storage::StoredDocument;

use crate::error::{RepositoryError, ValidationError};

/// Required prefix of every signature payload.
pub const SIGNATURE_PREFIX: &str = "data:image/";

/// Byte-length limits applied to entry fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryLimits {
    pub max_name_len: usize,
    pub max_message_len: usize,
    pub max_signature_len: usize,
    pub max_date_len: usize,
}

impl Default for EntryLimits {
    fn default() -> Self {
        Self {
            max_name_len: 100,
            max_message_len: 1000,
            max_signature_len: 100_000,
            max_date_len: 64,
        }
    }
}

/// An entry as submitted by a client. Every field is optional on the wire so
/// absence surfaces as a validation error rather than a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub name: Option<String>,
    pub message: Option<String>,
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// The persisted document body of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct EntryBody {
    pub name: String,
    pub message: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// A stored guestbook entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: Uuid,
    pub name: String,
    pub message: String,
    pub signature: String,
    /// Client-asserted signing date, for display.
    pub date: String,
    /// Server-assigned creation time, used for ordering.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn required(
    value: Option<String>,
    field: &'static str,
    max: usize,
) -> Result<String, ValidationError> {
    let value = value.ok_or(ValidationError::Missing { field })?;
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field,
            max,
            actual: value.len(),
        });
    }
    Ok(value)
}

impl NewEntry {
    /// Validate against `limits`, producing the body to persist.
    ///
    /// Fields are checked in order name, message, signature, date; the
    /// first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub(crate) fn validate(self, limits: &EntryLimits) -> Result<EntryBody, ValidationError> {
        let name = required(self.name, "name", limits.max_name_len)?;
        let message = required(self.message, "message", limits.max_message_len)?;
        let signature = required(self.signature, "signature", limits.max_signature_len)?;
        if !signature.starts_with(SIGNATURE_PREFIX) {
            return Err(ValidationError::InvalidSignature);
        }

        let date = self
            .date
            .map(|d| required(Some(d), "date", limits.max_date_len))
            .transpose()?;

        Ok(EntryBody {
            name,
            message,
            signature,
            date,
        })
    }
}

impl TryFrom<StoredDocument> for Entry {
    type Error = RepositoryError;

    fn try_from(doc: StoredDocument) -> Result<Self, Self::Error> {
        let body: EntryBody =
            serde_json::from_value(doc.body).map_err(|e| RepositoryError::Corrupt {
                id: doc.id,
                reason: e.to_string(),
            })?;

        let date = body
            .date
            .unwrap_or_else(|| doc.created_at.to_rfc3339_opts(SecondsFormat::Millis, true));

        Ok(Self {
            id: doc.id,
            name: body.name,
            message: body.message,
            signature: body.signature,
            date,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn valid() -> NewEntry {
        NewEntry {
            name: Some("Ada".to_owned()),
            message: Some("Congratulations!".to_owned()),
            signature: Some("data:image/png;base64,iVBORw0KGgo=".to_owned()),
            date: Some("2024-01-01T00:00:00Z".to_owned()),
        }
    }

    #[test]
    fn valid_entry_passes_unchanged() {
        let body = valid().validate(&EntryLimits::default()).unwrap();
        assert_eq!(body.name, "Ada");
        assert_eq!(body.signature, "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(body.date.as_deref(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn missing_fields_are_reported_by_name() {
        for field in ["name", "message", "signature"] {
            let mut entry = valid();
            match field {
                "name" => entry.name = None,
                "message" => entry.message = None,
                _ => entry.signature = None,
            }
            let err = entry.validate(&EntryLimits::default()).unwrap_err();
            assert_eq!(err, ValidationError::Missing { field });
        }
    }

    #[test]
    fn whitespace_only_is_empty() {
        let entry = NewEntry {
            message: Some("   \n".to_owned()),
            ..valid()
        };
        assert_eq!(
            entry.validate(&EntryLimits::default()).unwrap_err(),
            ValidationError::Empty { field: "message" }
        );
    }

    #[test]
    fn over_limit_is_rejected_with_lengths() {
        let limits = EntryLimits {
            max_name_len: 3,
            ..EntryLimits::default()
        };
        let entry = NewEntry {
            name: Some("Grace".to_owned()),
            ..valid()
        };
        assert_eq!(
            entry.validate(&limits).unwrap_err(),
            ValidationError::TooLong {
                field: "name",
                max: 3,
                actual: 5
            }
        );
    }

    #[test]
    fn limit_counts_bytes_not_chars() {
        let limits = EntryLimits {
            max_name_len: 4,
            ..EntryLimits::default()
        };
        // Three characters, six bytes.
        let entry = NewEntry {
            name: Some("äöü".to_owned()),
            ..valid()
        };
        assert!(matches!(
            entry.validate(&limits),
            Err(ValidationError::TooLong { actual: 6, .. })
        ));
    }

    #[test]
    fn signature_must_be_image_data_uri() {
        let entry = NewEntry {
            signature: Some("https://example.com/sig.png".to_owned()),
            ..valid()
        };
        assert_eq!(
            entry.validate(&EntryLimits::default()).unwrap_err(),
            ValidationError::InvalidSignature
        );
    }

    #[test]
    fn date_is_optional_but_not_blank() {
        let without = NewEntry { date: None, ..valid() };
        assert!(without.validate(&EntryLimits::default()).unwrap().date.is_none());

        let blank = NewEntry {
            date: Some(String::new()),
            ..valid()
        };
        assert_eq!(
            blank.validate(&EntryLimits::default()).unwrap_err(),
            ValidationError::Empty { field: "date" }
        );

        let long = NewEntry {
            date: Some("2024-01-01T00:00:00Z".repeat(4)),
            ..valid()
        };
        assert!(matches!(
            long.validate(&EntryLimits::default()).unwrap_err(),
            ValidationError::TooLong {
                field: "date",
                max: 64,
                actual: 80,
            }
        ));
    }

    #[test]
    fn stored_document_without_date_uses_created_at() {
        let created_at = Utc::now();
        let doc = StoredDocument {
            id: Uuid::new_v4(),
            collection: "entries".to_owned(),
            body: json!({"name": "A", "message": "hi", "signature": "data:image/png;base64,AA=="}),
            created_at,
            updated_at: created_at,
        };

        let entry = Entry::try_from(doc).unwrap();
        assert_eq!(
            entry.date,
            created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
    }

    #[test]
    fn corrupt_document_is_an_error() {
        let doc = StoredDocument {
            id: Uuid::new_v4(),
            collection: "entries".to_owned(),
            body: json!({"unexpected": true}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(
            Entry::try_from(doc),
            Err(RepositoryError::Corrupt { .. })
        ));
    }

    #[test]
    fn entry_serializes_camel_case_timestamps() {
        let now = Utc::now();
        let entry = Entry {
            id: Uuid::nil(),
            name: "A".to_owned(),
            message: "hi".to_owned(),
            signature: "data:image/png;base64,AA==".to_owned(),
            date: "2024-01-01T00:00:00Z".to_owned(),
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("created_at").is_none());
    }
}
