//! Tag management. Deleting a tag does not touch the tasks that use it.

use quicktasks_proto::record::{Patch, RecordId};
use quicktasks_proto::tag::{self, Tag, TagColor};
use serde_json::{Map, Value};

use super::ValidationError;
use crate::store::EntityStore;

/// Changes to a tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagEdit {
    /// New name, trimmed before validation.
    pub name: Option<String>,
    /// New colour.
    pub color: Option<TagColor>,
}

fn clean_name<'a>(
    store: &EntityStore,
    name: &'a str,
    except: Option<&RecordId>,
) -> Result<&'a str, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::TagNameEmpty);
    }
    let taken = store
        .tags()
        .any(|t| t.name == name && Some(&t.id) != except);
    if taken {
        return Err(ValidationError::TagExists(name.to_string()));
    }
    Ok(name)
}

/// Validates a new tag into the fields to create.
///
/// # Errors
///
/// Returns [`ValidationError::TagNameEmpty`] or [`ValidationError::TagExists`].
pub fn prepare_add(
    store: &EntityStore,
    name: &str,
    color: TagColor,
) -> Result<Map<String, Value>, ValidationError> {
    let name = clean_name(store, name, None)?;
    Ok(Tag::new_fields(store.owner(), name, color))
}

/// Validates `edit` of tag `id` into the patch to send.
///
/// # Errors
///
/// Returns [`ValidationError::UnknownTag`] or a name error.
pub fn prepare_update(
    store: &EntityStore,
    id: &RecordId,
    edit: &TagEdit,
) -> Result<Patch, ValidationError> {
    require_tag(store, id)?;
    let mut patch = Patch::new();
    if let Some(name) = &edit.name {
        patch = patch.set(tag::NAME_FIELD, clean_name(store, name, Some(id))?);
    }
    if let Some(color) = edit.color {
        patch = patch.set(tag::COLOR_FIELD, color.hex());
    }
    Ok(patch)
}

/// Checks that tag `id` exists.
///
/// # Errors
///
/// Returns [`ValidationError::UnknownTag`].
pub fn require_tag(store: &EntityStore, id: &RecordId) -> Result<(), ValidationError> {
    store
        .tag(id)
        .map(|_| ())
        .ok_or_else(|| ValidationError::UnknownTag(id.clone()))
}
