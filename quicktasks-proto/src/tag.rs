//! Tags and their fixed colour palette.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::{FieldReader, OWNER_FIELD, OwnerId, RawRecord, RecordId, SchemaError};

/// Field holding the tag name.
pub const NAME_FIELD: &str = "name";
/// Field holding the swatch, as a `#rrggbb` string.
pub const COLOR_FIELD: &str = "color";

/// A swatch from the fixed tag palette.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagColor {
    /// `#3b82f6`
    #[default]
    Blue,
    /// `#10b981`
    Green,
    /// `#f59e0b`
    Amber,
    /// `#ef4444`
    Red,
    /// `#8b5cf6`
    Purple,
    /// `#ec4899`
    Pink,
    /// `#06b6d4`
    Cyan,
    /// `#84cc16`
    Lime,
}

impl TagColor {
    /// Every swatch, in picker order.
    pub const PALETTE: [Self; 8] = [
        Self::Blue,
        Self::Green,
        Self::Amber,
        Self::Red,
        Self::Purple,
        Self::Pink,
        Self::Cyan,
        Self::Lime,
    ];

    /// Stored `#rrggbb` value.
    #[must_use]
    pub const fn hex(self) -> &'static str {
        match self {
            Self::Blue => "#3b82f6",
            Self::Green => "#10b981",
            Self::Amber => "#f59e0b",
            Self::Red => "#ef4444",
            Self::Purple => "#8b5cf6",
            Self::Pink => "#ec4899",
            Self::Cyan => "#06b6d4",
            Self::Lime => "#84cc16",
        }
    }

    /// Human-readable swatch name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Blue => "Blue",
            Self::Green => "Green",
            Self::Amber => "Amber",
            Self::Red => "Red",
            Self::Purple => "Purple",
            Self::Pink => "Pink",
            Self::Cyan => "Cyan",
            Self::Lime => "Lime",
        }
    }

    /// Looks up a swatch by its stored value (case-insensitive).
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        Self::PALETTE
            .into_iter()
            .find(|c| c.hex().eq_ignore_ascii_case(hex))
    }
}

impl fmt::Display for TagColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated tag mirrored from the data service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Identifier assigned by the data service.
    pub id: RecordId,
    /// Owning user.
    pub owner: OwnerId,
    /// Display name.
    pub name: String,
    /// Badge colour.
    pub color: TagColor,
}

impl Tag {
    /// Decodes and validates a tag document owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the document is owned by someone else, has
    /// no usable name, or uses a colour outside the palette.
    pub fn decode(record: &RawRecord, owner: &OwnerId) -> Result<Self, SchemaError> {
        let r = FieldReader::new(record);
        Ok(Self {
            id: record.id.clone(),
            owner: r.check_owner(owner)?,
            name: r.non_empty_str(NAME_FIELD)?.to_string(),
            color: r.variant(COLOR_FIELD, TagColor::from_hex)?,
        })
    }

    /// Builds the document fields for a new tag.
    #[must_use]
    pub fn new_fields(owner: &OwnerId, name: &str, color: TagColor) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(OWNER_FIELD.to_string(), owner.as_str().into());
        map.insert(NAME_FIELD.to_string(), name.into());
        map.insert(COLOR_FIELD.to_string(), color.hex().into());
        map
    }
}
