//! Custom domain management. The defaults are fixed.

use quicktasks_proto::domain::{self, Domain};
use quicktasks_proto::record::{Patch, RecordId};
use serde_json::{Map, Value};

use super::ValidationError;
use crate::store::EntityStore;

fn clean_name(name: &str) -> Result<&str, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::DomainNameEmpty);
    }
    Ok(name)
}

fn custom(store: &EntityStore, name: &str) -> Result<RecordId, ValidationError> {
    if Domain::is_default_name(name) {
        return Err(ValidationError::DefaultDomainImmutable(name.to_string()));
    }
    store
        .custom_domain(name)
        .and_then(|d| d.id.clone())
        .ok_or_else(|| ValidationError::UnknownDomain(name.to_string()))
}

/// Validates a new custom domain name into the fields to create.
///
/// # Errors
///
/// Returns [`ValidationError::DomainNameEmpty`] or
/// [`ValidationError::DomainExists`].
pub fn prepare_add(store: &EntityStore, name: &str) -> Result<Map<String, Value>, ValidationError> {
    let name = clean_name(name)?;
    if store.has_domain(name) {
        return Err(ValidationError::DomainExists(name.to_string()));
    }
    Ok(Domain::new_fields(store.owner(), name))
}

/// Validates renaming custom domain `current` to `new_name`.
///
/// Returns the domain's id and the patch to send. Tasks filed under the
/// old name keep it.
///
/// # Errors
///
/// Returns [`ValidationError::DefaultDomainImmutable`] for a default,
/// [`ValidationError::UnknownDomain`] if `current` is not a custom domain,
/// or a name error for `new_name`.
pub fn prepare_rename(
    store: &EntityStore,
    current: &str,
    new_name: &str,
) -> Result<(RecordId, Patch), ValidationError> {
    let id = custom(store, current)?;
    let new_name = clean_name(new_name)?;
    if new_name != current && store.has_domain(new_name) {
        return Err(ValidationError::DomainExists(new_name.to_string()));
    }
    Ok((id, Patch::new().set(domain::NAME_FIELD, new_name)))
}

/// Validates deleting custom domain `name`. Returns its id.
///
/// # Errors
///
/// Returns [`ValidationError::DefaultDomainImmutable`] for a default or
/// [`ValidationError::UnknownDomain`].
pub fn prepare_delete(store: &EntityStore, name: &str) -> Result<RecordId, ValidationError> {
    custom(store, name)
}
