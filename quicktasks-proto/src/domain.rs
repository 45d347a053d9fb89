//! Domains: the coarse buckets tasks are filed under.
//!
//! Two defaults always exist and are never persisted. Owners may add
//! custom domains, which live in the `userDomains` collection.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::{FieldReader, OWNER_FIELD, OwnerId, RawRecord, RecordId, SchemaError};

/// Built-in domains, in display order.
pub const DEFAULT_DOMAINS: [&str; 2] = ["Work", "Admin"];

/// Field holding the domain name.
pub const NAME_FIELD: &str = "name";

/// A domain visible to the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Backing document, `None` for the built-in defaults.
    pub id: Option<RecordId>,
    /// Case-sensitive name, unique per owner.
    pub name: String,
    /// `true` for the built-in defaults.
    pub is_default: bool,
}

impl Domain {
    /// The built-in defaults.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        DEFAULT_DOMAINS
            .iter()
            .map(|name| Self {
                id: None,
                name: (*name).to_string(),
                is_default: true,
            })
            .collect()
    }

    /// Returns `true` if `name` is one of the built-in defaults.
    #[must_use]
    pub fn is_default_name(name: &str) -> bool {
        DEFAULT_DOMAINS.contains(&name)
    }

    /// Decodes and validates a custom domain document owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the document is owned by someone else or
    /// has no usable name.
    pub fn decode(record: &RawRecord, owner: &OwnerId) -> Result<Self, SchemaError> {
        let r = FieldReader::new(record);
        r.check_owner(owner)?;
        Ok(Self {
            id: Some(record.id.clone()),
            name: r.non_empty_str(NAME_FIELD)?.to_string(),
            is_default: false,
        })
    }

    /// Builds the document fields for a new custom domain.
    #[must_use]
    pub fn new_fields(owner: &OwnerId, name: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(OWNER_FIELD.to_string(), owner.as_str().into());
        map.insert(NAME_FIELD.to_string(), name.into());
        map
    }
}
