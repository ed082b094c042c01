//! Registry error taxonomy (§7).

use thiserror::Error;

/// Failures from [`crate::registry::Registry`] operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// `register` was called with a name that already has a binding.
    #[error("name already registered: {0}")]
    AlreadyRegistered(String),
    /// `lookup` was called with a name that has no binding.
    #[error("name not registered: {0}")]
    NotRegistered(String),
}
