//! Cluster client errors

use thiserror::Error;

/// Errors that can occur when reading or writing cluster objects.
///
/// A missing object is not an error at this layer: lookups return `Ok(None)`
/// so callers can treat deletions as a normal outcome.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Kubernetes API or transport error
    #[error("Kubernetes error: {0}")]
    Kube(#[source] kube::Error),

    /// Optimistic concurrency check failed (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// API server rejected the request with a status other than 409
    #[error("API error: {0}")]
    Api(String),

    /// Request could not be built from the given object
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClusterError {
    /// True when the write lost an optimistic concurrency race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClusterError::Conflict(_))
    }
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ref response) if response.code == 409 => {
                ClusterError::Conflict(response.message.clone())
            }
            kube::Error::Api(ref response) => {
                ClusterError::Api(format!("{} (HTTP {})", response.message, response.code))
            }
            other => ClusterError::Kube(other),
        }
    }
}
