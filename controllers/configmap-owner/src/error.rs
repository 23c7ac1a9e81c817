//! Controller-specific error types.
//!
//! This module defines error types specific to the ConfigMap Owner Controller
//! that are not covered by upstream library errors.

use cluster_client::ClusterError;
use thiserror::Error;

/// Errors that can occur in the ConfigMap Owner Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Reading or writing a cluster object failed (includes write conflicts)
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The workload lacks the identity needed for an owner reference
    #[error("Cannot build owner reference: {0}")]
    OwnerReference(String),

    /// Work was aborted by shutdown or a reconcile deadline
    #[error("Reconciliation cancelled")]
    Cancelled,
}

impl ControllerError {
    /// Whether the reconciliation should be requeued with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ControllerError::Cluster(_) | ControllerError::Cancelled)
    }
}
