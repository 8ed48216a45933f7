//! Error taxonomy shared across the workspace.

/// Errors produced by index lookups, mutations, and the session layer.
#[derive(Debug, thiserror::Error)]
pub enum QuillError {
    /// Malformed or semantically invalid input (bad ID syntax, bad arguments).
    #[error("Validation error: {0}")]
    Validation(String),

    /// An element or resource ID that does not exist in the current index.
    #[error("Not found: {id}")]
    NotFound {
        /// The ID that failed to resolve.
        id: String,
    },

    /// A character range outside the addressable text.
    #[error("Range error: {0}")]
    Range(String),

    /// The operation conflicts with current state (run already active,
    /// tool result for a different run).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A pending tool request was not resolved within its deadline.
    #[error("Tool request {request_id} timed out after {timeout_ms} ms")]
    Timeout {
        /// The expired request ID.
        request_id: String,
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// An element of the wrong kind was given to an operation.
    #[error("Unsupported element kind {kind} (accepted: {accepted})")]
    UnsupportedKind {
        /// The offending kind name or ID prefix.
        kind: String,
        /// Comma-joined accepted prefixes, e.g. `p, it, tr, tc`.
        accepted: String,
    },

    /// Invariant violation or unexpected internal state.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QuillError {
    /// Machine-readable error code for wire payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Range(_) => "RANGE_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Timeout { .. } => "TIMEOUT",
            Self::UnsupportedKind { .. } => "UNSUPPORTED_KIND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller can fix the input and retry within the same run.
    ///
    /// Stale-ID and bad-argument failures are recoverable: the agent
    /// re-reads the document and retries. Conflicts, timeouts, and internal
    /// failures terminate the run.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Validation(_)
            | Self::NotFound { .. }
            | Self::Range(_)
            | Self::UnsupportedKind { .. } => true,
            Self::Conflict(_) | Self::Timeout { .. } | Self::Internal(_) => false,
        }
    }

    /// Shorthand for a `NotFound` with the given ID.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }
}

/// Workspace-wide result alias.
pub type QuillResult<T> = Result<T, QuillError>;
