//! Authentication collaborator boundary.
//!
//! The client only reads who is signed in and can ask the provider to end
//! the session. It never changes session state on its own.

use parking_lot::RwLock;
use quicktasks_proto::record::OwnerId;

/// Label shown when the owner has neither a display name nor an email.
const FALLBACK_LABEL: &str = "User";

/// Errors reported by an authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Nobody is signed in.
    #[error("not signed in")]
    NotSignedIn,

    /// The provider could not end the session.
    #[error("logout failed: {0}")]
    Logout(String),
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    /// Identifier that scopes every persisted record.
    pub id: OwnerId,
    /// Optional display name.
    pub display_name: Option<String>,
    /// Optional email address.
    pub email: Option<String>,
}

impl Owner {
    /// Creates an owner with no profile details.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: OwnerId::new(id),
            display_name: None,
            email: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Name to greet the owner with: display name, else email, else "User".
    #[must_use]
    pub fn label(&self) -> &str {
        [&self.display_name, &self.email]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.trim().is_empty())
            .unwrap_or(FALLBACK_LABEL)
    }
}

/// Read-only view of the session plus a logout operation.
pub trait AuthProvider: Send + Sync {
    /// The signed-in owner, or `None` when unauthenticated.
    fn current_owner(&self) -> Option<Owner>;

    /// End the session.
    fn logout(&self) -> impl std::future::Future<Output = Result<(), AuthError>> + Send;
}

/// Provider with a fixed session, configured up front.
///
/// Used by the demo binary and tests. Logging out clears the session.
#[derive(Debug, Default)]
pub struct StaticAuth {
    owner: RwLock<Option<Owner>>,
}

impl StaticAuth {
    /// A provider with `owner` signed in.
    #[must_use]
    pub fn signed_in(owner: Owner) -> Self {
        Self {
            owner: RwLock::new(Some(owner)),
        }
    }

    /// A provider with nobody signed in.
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }
}

impl AuthProvider for StaticAuth {
    fn current_owner(&self) -> Option<Owner> {
        self.owner.read().clone()
    }

    async fn logout(&self) -> Result<(), AuthError> {
        let previous = self.owner.write().take();
        match previous {
            Some(owner) => {
                tracing::info!(owner = %owner.id, "signed out");
                Ok(())
            }
            None => Err(AuthError::NotSignedIn),
        }
    }
}
