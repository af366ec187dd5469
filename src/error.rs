//! Portal error taxonomy.
//!
//! Every fallible request-time operation returns a [`PortalError`]. The HTTP
//! front door ([`crate::server`]) owns the translation into status codes and
//! user-facing JSON; nothing below the front door formats a response.

use thiserror::Error;

use crate::completion::CompletionError;

/// Request-time failures, classified once and mapped to HTTP at the boundary.
#[derive(Debug, Error)]
pub enum PortalError {
    /// A required request field was empty or absent.
    #[error("required input is missing")]
    MissingInput,

    /// No record matched the normalized identifier.
    #[error("no matching record")]
    NotFound,

    /// A backing dataset failed to load at startup; the feature is degraded.
    #[error("backing data is unavailable")]
    DataUnavailable,

    /// The completion credential was not configured at startup.
    #[error("completion service is not configured")]
    NotConfigured,

    /// The external completion call failed. Detail stays in operator logs.
    #[error(transparent)]
    Completion(#[from] CompletionError),

    /// Catch-all for unexpected conditions, surfaced as a generic message.
    #[error("internal error: {0}")]
    Internal(String),
}
