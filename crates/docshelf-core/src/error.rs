//! Error types
//!
//! Pure transforms (parsing, rendering, library filters) never fail. Errors
//! only come from library mutations that break an invariant and from
//! operations that cross a collaborator boundary.

use thiserror::Error;

/// Errors from library mutations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    /// Insert of an id that is already in the library
    #[error("Document '{0}' is already in the library")]
    DuplicateId(String),

    /// Update of an id that is not in the library
    #[error("Document '{0}' not found in the library")]
    NotFound(String),
}

/// Failure reported by a remote collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network or protocol failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The collaborator did not answer in time
    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The collaborator has nothing under the requested key
    #[error("Remote document not found: '{0}'")]
    Missing(String),
}

/// Errors from sync operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Query rejected before reaching the collaborator
    #[error("Invalid search query: {0}")]
    InvalidQuery(String),

    /// Local record missing
    #[error("Document '{0}' not found in the library")]
    NotFound(String),

    /// Fetching the latest content failed; the record is unchanged
    #[error("Failed to fetch latest content for '{id}': {source}")]
    Fetch {
        id: String,
        #[source]
        source: RemoteError,
    },

    /// Remote search failed
    #[error("Remote search failed: {0}")]
    Search(#[source] RemoteError),

    /// The record was replaced while its latest content was being fetched
    #[error("Document '{0}' was replaced during refresh")]
    Replaced(String),

    /// Remote operations require a validated credential
    #[error("Credential has not been validated. Save and validate a credential first.")]
    CredentialNotValid,

    #[error(transparent)]
    Library(#[from] LibraryError),
}

impl SyncError {
    /// Check if retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Fetch { source, .. } | SyncError::Search(source) => matches!(
                source,
                RemoteError::Transport(_) | RemoteError::Timeout { .. }
            ),
            SyncError::Replaced(_) => true,
            _ => false,
        }
    }
}

/// Errors from credential validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// The validator could not be reached or failed
    #[error("Credential validation failed: {0}")]
    ValidationTransport(#[source] RemoteError),
}
