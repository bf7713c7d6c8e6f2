//! Trusted-contact store port (read path).

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::TrustedContact;

/// Errors from the contact store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContactStoreError {
    /// Storage backend error (database, preferences file, etc.).
    #[error("Contact storage error: {0}")]
    Storage(String),
}

/// Read-only port over the trusted-contact collection.
///
/// Contact CRUD lives with the embedding application; the engine only takes
/// a snapshot at the moment of escalation.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// List all trusted contacts.
    async fn list_contacts(&self) -> Result<Vec<TrustedContact>, ContactStoreError>;
}
