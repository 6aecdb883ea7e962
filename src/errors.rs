//! Error types for clustering-service client operations.

use thiserror::Error;

/// Errors that can occur while talking to the clustering service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The requested resource does not exist.
    #[error("{resource} could not be found")]
    NotFound {
        /// Description of the missing resource, e.g. `node my_node`.
        resource: String,
    },
    /// A name matched more than one resource.
    #[error("more than one node is named {identifier} ({count} matches); use an ID instead")]
    Ambiguous {
        /// The name or ID that was looked up.
        identifier: String,
        /// How many records matched.
        count: usize,
    },
    /// The service answered with a non-success status.
    #[error("HTTP {status}: {details}")]
    Http {
        /// The HTTP status code.
        status: u16,
        /// The response body, or a placeholder when it was empty.
        details: String,
    },
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
    /// The request could not be built, e.g. an unusable header value.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Returns true when the error means the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns the HTTP status code carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Ambiguous { .. } | Self::Decode(_) | Self::InvalidRequest(_) => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}
