//! Mock ClusterClient for unit testing
//!
//! This module provides an in-memory implementation of `ClusterClientTrait`
//! that behaves like the API server for the calls the controller makes:
//! lookups of missing objects return `None`, writes bump `resourceVersion`,
//! and a stale `resourceVersion` on replace is rejected as a conflict.

use crate::common::object_key;
use crate::error::ClusterError;
use crate::cluster_trait::ClusterClientTrait;
use k8s_openapi::api::apps::v1::ReplicaSet;
use k8s_openapi::api::core::v1::ConfigMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

type ObjectKey = (String, String);

fn key(namespace: &str, name: &str) -> ObjectKey {
    (namespace.to_string(), name.to_string())
}

/// Mock ClusterClient for testing
///
/// Clones share the same store, so a test can keep a handle for assertions
/// after moving a clone into the reconciler.
#[derive(Clone, Default)]
pub struct MockClusterClient {
    replica_sets: Arc<Mutex<HashMap<ObjectKey, ReplicaSet>>>,
    config_maps: Arc<Mutex<HashMap<ObjectKey, ConfigMap>>>,
    next_resource_version: Arc<Mutex<u64>>,
    // Names passed to replace_config_map, in call order
    replace_calls: Arc<Mutex<Vec<String>>>,
    // Failure injection
    failing_config_map_gets: Arc<Mutex<HashSet<String>>>,
    fail_replica_set_gets: Arc<Mutex<bool>>,
    pending_replace_conflicts: Arc<Mutex<u32>>,
    // Calls that never complete, for cancellation tests
    stall_config_map_gets: Arc<Mutex<bool>>,
    stall_replaces: Arc<Mutex<bool>>,
    stalled_calls: Arc<Mutex<u32>>,
}

impl std::fmt::Debug for MockClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockClusterClient").finish_non_exhaustive()
    }
}

impl MockClusterClient {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    fn next_resource_version(&self) -> String {
        let mut rv = self.next_resource_version.lock().unwrap();
        *rv += 1;
        rv.to_string()
    }

    /// Add a ReplicaSet to the mock store (for test setup)
    pub fn add_replica_set(&self, replica_set: ReplicaSet) {
        let namespace = replica_set.metadata.namespace.clone().unwrap_or_default();
        let name = replica_set.metadata.name.clone().unwrap_or_default();
        self.replica_sets
            .lock()
            .unwrap()
            .insert((namespace, name), replica_set);
    }

    /// Add a ConfigMap to the mock store (for test setup)
    ///
    /// A fresh `resourceVersion` is assigned, as the API server would on create.
    pub fn add_config_map(&self, mut config_map: ConfigMap) {
        let namespace = config_map.metadata.namespace.clone().unwrap_or_default();
        let name = config_map.metadata.name.clone().unwrap_or_default();
        config_map.metadata.resource_version = Some(self.next_resource_version());
        self.config_maps
            .lock()
            .unwrap()
            .insert((namespace, name), config_map);
    }

    /// Current stored copy of a ConfigMap
    pub fn config_map(&self, namespace: &str, name: &str) -> Option<ConfigMap> {
        self.config_maps
            .lock()
            .unwrap()
            .get(&key(namespace, name))
            .cloned()
    }

    /// Simulate another writer touching a ConfigMap (bumps its `resourceVersion`)
    pub fn touch_config_map(&self, namespace: &str, name: &str) {
        let rv = self.next_resource_version();
        if let Some(cm) = self.config_maps.lock().unwrap().get_mut(&key(namespace, name)) {
            cm.metadata.resource_version = Some(rv);
        }
    }

    /// Names of ConfigMaps written so far, in call order
    pub fn replace_calls(&self) -> Vec<String> {
        self.replace_calls.lock().unwrap().clone()
    }

    /// Make every lookup of the named ConfigMap fail with an API error
    pub fn fail_config_map_get(&self, name: &str) {
        self.failing_config_map_gets
            .lock()
            .unwrap()
            .insert(name.to_string());
    }

    /// Make every ReplicaSet lookup fail with an API error
    pub fn fail_replica_set_gets(&self) {
        *self.fail_replica_set_gets.lock().unwrap() = true;
    }

    /// Reject the next `count` replace calls with a conflict
    pub fn conflict_next_replaces(&self, count: u32) {
        *self.pending_replace_conflicts.lock().unwrap() = count;
    }

    /// Make every ConfigMap lookup hang until the caller gives up on it
    pub fn stall_config_map_gets(&self) {
        *self.stall_config_map_gets.lock().unwrap() = true;
    }

    /// Make every replace hang, after it is recorded, without storing anything
    pub fn stall_replaces(&self) {
        *self.stall_replaces.lock().unwrap() = true;
    }

    /// Number of calls currently or previously left hanging
    pub fn stalled_calls(&self) -> u32 {
        *self.stalled_calls.lock().unwrap()
    }

    async fn stall_if(&self, flag: &Mutex<bool>) {
        let stalled = *flag.lock().unwrap();
        if stalled {
            *self.stalled_calls.lock().unwrap() += 1;
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for MockClusterClient {
    async fn get_replica_set(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ReplicaSet>, ClusterError> {
        if *self.fail_replica_set_gets.lock().unwrap() {
            return Err(ClusterError::Api(format!(
                "injected failure reading replicaset {namespace}/{name}"
            )));
        }
        Ok(self
            .replica_sets
            .lock()
            .unwrap()
            .get(&key(namespace, name))
            .cloned())
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, ClusterError> {
        if self.failing_config_map_gets.lock().unwrap().contains(name) {
            return Err(ClusterError::Api(format!(
                "injected failure reading configmap {namespace}/{name}"
            )));
        }
        self.stall_if(&self.stall_config_map_gets).await;
        Ok(self.config_map(namespace, name))
    }

    async fn replace_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap, ClusterError> {
        let (namespace, name) = object_key(&config_map.metadata)?;
        self.replace_calls.lock().unwrap().push(name.to_string());
        self.stall_if(&self.stall_replaces).await;

        {
            let mut pending = self.pending_replace_conflicts.lock().unwrap();
            if *pending > 0 {
                *pending -= 1;
                return Err(ClusterError::Conflict(format!(
                    "Operation cannot be fulfilled on configmaps \"{name}\": injected conflict"
                )));
            }
        }

        let rv = self.next_resource_version();
        let mut store = self.config_maps.lock().unwrap();
        let stored = store
            .get_mut(&key(namespace, name))
            .ok_or_else(|| ClusterError::Api(format!("configmaps \"{name}\" not found")))?;

        if config_map.metadata.resource_version.is_some()
            && config_map.metadata.resource_version != stored.metadata.resource_version
        {
            return Err(ClusterError::Conflict(format!(
                "Operation cannot be fulfilled on configmaps \"{name}\": {}",
                "the object has been modified"
            )));
        }

        let mut updated = config_map.clone();
        updated.metadata.resource_version = Some(rv);
        *stored = updated.clone();
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn config_map(name: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_objects_are_none() {
        let mock = MockClusterClient::new();
        assert!(mock.get_config_map("default", "nope").await.unwrap().is_none());
        assert!(mock.get_replica_set("default", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_bumps_resource_version() {
        let mock = MockClusterClient::new();
        mock.add_config_map(config_map("app-config"));

        let current = mock.get_config_map("default", "app-config").await.unwrap().unwrap();
        let written = mock.replace_config_map(&current).await.unwrap();

        assert_ne!(current.metadata.resource_version, written.metadata.resource_version);
        assert_eq!(mock.replace_calls(), vec!["app-config".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_resource_version_conflicts() {
        let mock = MockClusterClient::new();
        mock.add_config_map(config_map("app-config"));

        let stale = mock.get_config_map("default", "app-config").await.unwrap().unwrap();
        mock.touch_config_map("default", "app-config");

        let err = mock.replace_config_map(&stale).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_injected_conflicts_are_consumed() {
        let mock = MockClusterClient::new();
        mock.add_config_map(config_map("app-config"));
        mock.conflict_next_replaces(1);

        let current = mock.get_config_map("default", "app-config").await.unwrap().unwrap();
        assert!(mock.replace_config_map(&current).await.unwrap_err().is_conflict());
        assert!(mock.replace_config_map(&current).await.is_ok());
    }

    #[tokio::test]
    async fn test_stalled_calls_never_complete() {
        let mock = MockClusterClient::new();
        mock.add_config_map(config_map("app-config"));
        let current = mock.get_config_map("default", "app-config").await.unwrap().unwrap();
        mock.stall_config_map_gets();
        mock.stall_replaces();

        let wait = std::time::Duration::from_millis(20);
        let get = mock.get_config_map("default", "app-config");
        assert!(tokio::time::timeout(wait, get).await.is_err());
        let replace = mock.replace_config_map(&current);
        assert!(tokio::time::timeout(wait, replace).await.is_err());

        assert_eq!(mock.stalled_calls(), 2);
        assert_eq!(mock.replace_calls(), vec!["app-config".to_string()]);
        let stored = mock.config_map("default", "app-config").unwrap();
        assert_eq!(stored.metadata.resource_version, current.metadata.resource_version);
    }
}
