//! ClusterClient trait for mocking
//!
//! This trait abstracts the handful of object-store calls the controller
//! makes, so reconcilers can be unit tested against an in-memory store.

use crate::error::ClusterError;
use k8s_openapi::api::apps::v1::ReplicaSet;
use k8s_openapi::api::core::v1::ConfigMap;

/// Trait for cluster object access
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ClusterClientTrait: Send + Sync {
    /// Fetch a ReplicaSet. `Ok(None)` when it does not exist.
    async fn get_replica_set(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ReplicaSet>, ClusterError>;

    /// Fetch a ConfigMap. `Ok(None)` when it does not exist.
    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, ClusterError>;

    /// Replace a ConfigMap.
    ///
    /// The object's `resourceVersion` is sent along, so a write racing another
    /// writer fails with [`ClusterError::Conflict`] instead of clobbering it.
    async fn replace_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap, ClusterError>;
}
