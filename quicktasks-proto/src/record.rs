//! Loosely-typed remote records and the patch format used to mutate them.
//!
//! A [`RawRecord`] is what the data service hands out: an identifier it
//! assigned plus a JSON object of fields. Typed schemas in the sibling
//! modules decode these through [`FieldReader`], which turns every
//! missing or mistyped field into a [`SchemaError`] instead of a panic.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::time::Timestamp;

/// Field holding the owner identifier on every persisted record.
pub const OWNER_FIELD: &str = "uid";

/// Opaque, stable record identifier assigned by the data service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wraps an identifier issued by the data service.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of the user owning a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Wraps an owner identifier issued by the authentication provider.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three owner-scoped collections the client mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Collection {
    /// Task documents.
    Tasks,
    /// Custom domain documents (defaults are never persisted).
    Domains,
    /// Tag documents.
    Tags,
}

impl Collection {
    /// Every collection, in subscription order.
    pub const ALL: [Self; 3] = [Self::Tasks, Self::Domains, Self::Tags];

    /// Collection name as known to the data service.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Domains => "userDomains",
            Self::Tags => "userTags",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A document as delivered by the data service, before schema validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Identifier assigned by the data service.
    pub id: RecordId,
    /// Document fields. Absent and `null` are treated alike by decoders.
    pub fields: Map<String, Value>,
}

impl RawRecord {
    /// Creates a record from an identifier and its fields.
    #[must_use]
    pub const fn new(id: RecordId, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    /// Returns the owner identifier stored on the record, if any.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.fields.get(OWNER_FIELD).and_then(Value::as_str)
    }
}

/// Errors raised when a raw record does not match its schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A required field is absent or `null`.
    #[error("record {id}: missing field `{field}`")]
    MissingField {
        /// Offending record.
        id: RecordId,
        /// Name of the missing field.
        field: &'static str,
    },

    /// A field is present but has the wrong shape or value.
    #[error("record {id}: field `{field}` {reason}")]
    InvalidField {
        /// Offending record.
        id: RecordId,
        /// Name of the invalid field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// The record belongs to someone other than the subscribed owner.
    #[error("record {id}: owned by `{found}`, expected `{expected}`")]
    OwnerMismatch {
        /// Offending record.
        id: RecordId,
        /// Owner the subscription was scoped to.
        expected: OwnerId,
        /// Owner found on the record (empty if absent).
        found: String,
    },
}

/// Typed accessors over a [`RawRecord`] used by the schema decoders.
pub(crate) struct FieldReader<'a> {
    record: &'a RawRecord,
}

impl<'a> FieldReader<'a> {
    pub(crate) const fn new(record: &'a RawRecord) -> Self {
        Self { record }
    }

    fn value(&self, field: &str) -> Option<&'a Value> {
        self.record.fields.get(field).filter(|v| !v.is_null())
    }

    fn invalid(&self, field: &'static str, reason: impl Into<String>) -> SchemaError {
        SchemaError::InvalidField {
            id: self.record.id.clone(),
            field,
            reason: reason.into(),
        }
    }

    fn missing(&self, field: &'static str) -> SchemaError {
        SchemaError::MissingField {
            id: self.record.id.clone(),
            field,
        }
    }

    /// Rejects records not owned by `expected`.
    pub(crate) fn check_owner(&self, expected: &OwnerId) -> Result<OwnerId, SchemaError> {
        match self.record.owner() {
            Some(found) if found == expected.as_str() => Ok(expected.clone()),
            found => Err(SchemaError::OwnerMismatch {
                id: self.record.id.clone(),
                expected: expected.clone(),
                found: found.unwrap_or_default().to_string(),
            }),
        }
    }

    pub(crate) fn required_str(&self, field: &'static str) -> Result<&'a str, SchemaError> {
        self.optional_str(field)?.ok_or_else(|| self.missing(field))
    }

    pub(crate) fn optional_str(&self, field: &'static str) -> Result<Option<&'a str>, SchemaError> {
        match self.value(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(self.invalid(field, "is not a string")),
        }
    }

    /// Reads a string field that must also be non-blank.
    pub(crate) fn non_empty_str(&self, field: &'static str) -> Result<&'a str, SchemaError> {
        let value = self.required_str(field)?;
        if value.trim().is_empty() {
            return Err(self.invalid(field, "is empty"));
        }
        Ok(value)
    }

    pub(crate) fn optional_u64(
        &self,
        field: &'static str,
        max: u64,
    ) -> Result<Option<u64>, SchemaError> {
        match self.value(field).map(Value::as_u64) {
            None => Ok(None),
            Some(Some(n)) if n <= max => Ok(Some(n)),
            Some(Some(_)) => Err(self.invalid(field, format!("exceeds {max}"))),
            Some(None) => Err(self.invalid(field, "is not a non-negative integer")),
        }
    }

    pub(crate) fn optional_timestamp(
        &self,
        field: &'static str,
    ) -> Result<Option<Timestamp>, SchemaError> {
        match self.value(field).map(|v| v.as_i64().map(Timestamp::from_millis)) {
            None => Ok(None),
            Some(Some(ts)) if ts.to_datetime().is_some() => Ok(Some(ts)),
            Some(Some(_)) => Err(self.invalid(field, "is outside the representable date range")),
            Some(None) => Err(self.invalid(field, "is not an instant in milliseconds")),
        }
    }

    pub(crate) fn required_timestamp(&self, field: &'static str) -> Result<Timestamp, SchemaError> {
        self.optional_timestamp(field)?
            .ok_or_else(|| self.missing(field))
    }

    pub(crate) fn id_list(&self, field: &'static str) -> Result<Vec<RecordId>, SchemaError> {
        let Some(value) = self.value(field) else {
            return Ok(Vec::new());
        };
        let Value::Array(items) = value else {
            return Err(self.invalid(field, "is not a list"));
        };
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(RecordId::new)
                    .ok_or_else(|| self.invalid(field, "contains a non-string identifier"))
            })
            .collect()
    }

    /// Parses an enum-like string field with `parse`, naming the value on failure.
    pub(crate) fn variant<T>(
        &self,
        field: &'static str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<T, SchemaError> {
        let raw = self.required_str(field)?;
        parse(raw).ok_or_else(|| self.invalid(field, format!("has unknown value `{raw}`")))
    }
}

/// A change to a single field inside a [`Patch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldChange {
    /// Overwrite the field with a new value.
    Set(Value),
    /// Remove the field. Distinct from leaving it out of the patch.
    Clear,
}

/// A partial update: fields not mentioned are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patch(BTreeMap<String, FieldChange>);

impl Patch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field` to `value`.
    #[must_use]
    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), FieldChange::Set(value.into()));
        self
    }

    /// Marks `field` for removal.
    #[must_use]
    pub fn clear(mut self, field: &str) -> Self {
        self.0.insert(field.to_string(), FieldChange::Clear);
        self
    }

    /// Returns the change recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.0.get(field)
    }

    /// Returns `true` if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(field, change)` pairs in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldChange)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Applies the patch to a document's fields.
    pub fn apply_to(&self, fields: &mut Map<String, Value>) {
        for (field, change) in &self.0 {
            match change {
                FieldChange::Set(value) => {
                    fields.insert(field.clone(), value.clone());
                }
                FieldChange::Clear => {
                    fields.remove(field);
                }
            }
        }
    }
}
