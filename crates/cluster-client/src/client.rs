//! Kubernetes-backed implementation of [`ClusterClientTrait`].

use crate::error::ClusterError;
use crate::common::object_key;
use crate::cluster_trait::ClusterClientTrait;
use k8s_openapi::api::apps::v1::ReplicaSet;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, PostParams};
use kube::Client;
use tracing::{debug, trace};

/// Cluster client that talks to the API server through `kube`.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl std::fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterClient").finish_non_exhaustive()
    }
}

impl KubeClusterClient {
    /// Wrap an existing `kube::Client`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the in-cluster service account or local kubeconfig.
    pub async fn try_default() -> Result<Self, ClusterError> {
        let client = Client::try_default().await?;
        Ok(Self::new(client))
    }

    /// The underlying `kube::Client`, for watchers that need their own `Api`.
    pub fn kube_client(&self) -> Client {
        self.client.clone()
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for KubeClusterClient {
    async fn get_replica_set(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ReplicaSet>, ClusterError> {
        trace!("GET replicaset {}/{}", namespace, name);
        let api: Api<ReplicaSet> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, ClusterError> {
        trace!("GET configmap {}/{}", namespace, name);
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn replace_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap, ClusterError> {
        let (namespace, name) = object_key(&config_map.metadata)?;
        debug!(
            "PUT configmap {}/{} (resourceVersion {:?})",
            namespace, name, config_map.metadata.resource_version
        );
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.replace(name, &PostParams::default(), config_map).await?)
    }
}
