//! Cluster client errors

use thiserror::Error;

/// Errors that can occur when talking to the cluster store
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Object already exists or was modified concurrently
    #[error("Conflict: {0}")]
    Conflict(String),

    /// API server rejected the object (validation, immutable field)
    #[error("Invalid object: {0}")]
    Invalid(String),

    /// Any other API server status
    #[error("API error ({code}): {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Server-provided message
        message: String,
    },

    /// Transport or client-side failure
    #[error("Kubernetes client error: {0}")]
    Kube(#[source] kube::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClusterError {
    /// Returns true for the expected "object is absent" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound(_))
    }
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) => match ae.code {
                404 => ClusterError::NotFound(ae.message),
                409 => ClusterError::Conflict(ae.message),
                422 => ClusterError::Invalid(ae.message),
                code => ClusterError::Api { code, message: ae.message },
            },
            kube::Error::SerdeError(e) => ClusterError::Serialization(e),
            other => ClusterError::Kube(other),
        }
    }
}
