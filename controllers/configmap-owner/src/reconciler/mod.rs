//! Reconciliation logic linking ConfigMaps to the ReplicaSets that mount them.
//!
//! - `namespace_filter`: which namespaces are in scope
//! - `watermark`: ignore objects that predate the controller
//! - `references`: ConfigMaps a pod template mounts
//! - `ownership`: building and inserting owner references

pub mod namespace_filter;
pub mod ownership;
pub mod references;
pub mod watermark;


use crate::backoff::FibonacciBackoff;
use crate::config::OperatorConfig;
use crate::error::ControllerError;
use chrono::{DateTime, Utc};
use cluster_client::{ClusterClientTrait, ClusterError};
use k8s_openapi::api::apps::v1::ReplicaSet;
use kube_runtime::reflector::ObjectRef;
use namespace_filter::NamespaceFilter;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Immutable inputs shared by every reconciliation.
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    pub namespace_filter: NamespaceFilter,
    pub dry_run: bool,
    /// Objects created at or before this instant are left alone
    pub start_time: DateTime<Utc>,
}

impl ReconcileContext {
    pub fn new(config: &OperatorConfig, start_time: DateTime<Utc>) -> Self {
        Self {
            namespace_filter: NamespaceFilter::new(&config.namespace_regex),
            dry_run: config.dry_run,
            start_time,
        }
    }
}

/// Why a ReplicaSet was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NamespaceExcluded,
    WorkloadNotFound,
    CreatedBeforeStart,
    NoConfigMapVolumes,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::NamespaceExcluded => "namespace not selected",
            SkipReason::WorkloadNotFound => "replicaset not found",
            SkipReason::CreatedBeforeStart => "created before controller start",
            SkipReason::NoConfigMapVolumes => "no mounted configmaps",
        };
        f.write_str(reason)
    }
}

/// What happened to each ConfigMap a ReplicaSet mounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSummary {
    /// Owner reference written
    pub linked: Vec<String>,
    /// Owner reference was already there
    pub already_owned: Vec<String>,
    /// ConfigMap does not exist
    pub missing: Vec<String>,
    /// Would have been linked without `--dry-run`
    pub dry_run: Vec<String>,
}

impl fmt::Display for LinkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "linked={} already_owned={} missing={} dry_run={}",
            self.linked.len(),
            self.already_owned.len(),
            self.missing.len(),
            self.dry_run.len()
        )
    }
}

/// Result of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Skipped(SkipReason),
    Applied(LinkSummary),
}

/// Reconciles ReplicaSets against the ConfigMaps they mount.
pub struct Reconciler {
    pub(crate) client: Box<dyn ClusterClientTrait + Send + Sync>,
    /// Retry backoff per ReplicaSet, advanced on each retryable failure
    backoff_states: Mutex<HashMap<ObjectRef<ReplicaSet>, FibonacciBackoff>>,
}

impl Reconciler {
    pub fn new(client: Box<dyn ClusterClientTrait + Send + Sync>) -> Self {
        Self {
            client,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    /// Delay before the next retry of `key`, advancing its backoff.
    pub fn next_backoff(&self, key: &ObjectRef<ReplicaSet>) -> Duration {
        match self.backoff_states.lock() {
            Ok(mut states) => states.entry(key.clone()).or_default().next_backoff(),
            Err(e) => {
                warn!("Failed to lock backoff states: {}, using default backoff", e);
                FibonacciBackoff::default().next_backoff()
            }
        }
    }

    /// Restart the backoff of `key` after a successful reconciliation.
    pub fn reset_backoff(&self, key: &ObjectRef<ReplicaSet>) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(backoff) = states.get_mut(key) {
                backoff.reset();
            }
        }
    }

    /// Make every ConfigMap mounted by ReplicaSet `namespace/name` list it
    /// as a non-controller owner.
    ///
    /// Writes already committed stay committed if a later one fails; a retry
    /// skips them because the reference is already present.
    pub async fn reconcile(
        &self,
        ctx: &ReconcileContext,
        namespace: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, ControllerError> {
        if !ctx.namespace_filter.matches(namespace) {
            debug!("Skipping ReplicaSet {}/{}: namespace not selected", namespace, name);
            return Ok(ReconcileOutcome::Skipped(SkipReason::NamespaceExcluded));
        }

        let Some(replica_set) =
            guarded(cancel, self.client.get_replica_set(namespace, name)).await?
        else {
            debug!("ReplicaSet {}/{} no longer exists", namespace, name);
            return Ok(ReconcileOutcome::Skipped(SkipReason::WorkloadNotFound));
        };

        if !watermark::created_after(&replica_set.metadata, ctx.start_time) {
            debug!(
                "Skipping ReplicaSet {}/{}: created before controller start",
                namespace, name
            );
            return Ok(ReconcileOutcome::Skipped(SkipReason::CreatedBeforeStart));
        }

        let config_maps = references::extract_config_map_refs(&replica_set);
        if config_maps.is_empty() {
            debug!("ReplicaSet {}/{} mounts no ConfigMaps", namespace, name);
            return Ok(ReconcileOutcome::Skipped(SkipReason::NoConfigMapVolumes));
        }
        debug!(
            "ReplicaSet {}/{} mounts ConfigMaps {:?}",
            namespace, name, config_maps
        );

        let mut summary = LinkSummary::default();
        for cm_name in config_maps {
            let Some(mut config_map) =
                guarded(cancel, self.client.get_config_map(namespace, &cm_name)).await?
            else {
                debug!(
                    "ConfigMap {}/{} referenced by ReplicaSet {} not found",
                    namespace, cm_name, name
                );
                summary.missing.push(cm_name);
                continue;
            };

            if ownership::has_owner_reference(&config_map, &replica_set) {
                debug!(
                    "ConfigMap {}/{} already owned by ReplicaSet {}",
                    namespace, cm_name, name
                );
                summary.already_owned.push(cm_name);
                continue;
            }

            if ctx.dry_run {
                info!(
                    "DRY-RUN: would add ownerReference to ConfigMap {}/{} for ReplicaSet {}",
                    namespace, cm_name, name
                );
                summary.dry_run.push(cm_name);
                continue;
            }

            ownership::set_owner_reference(&mut config_map, &replica_set)?;
            guarded(cancel, self.client.replace_config_map(&config_map)).await?;
            info!(
                "Added ownerReference to ConfigMap {}/{} for ReplicaSet {}",
                namespace, cm_name, name
            );
            summary.linked.push(cm_name);
        }

        Ok(ReconcileOutcome::Applied(summary))
    }
}

/// Run a cluster call unless `cancel` fires first.
async fn guarded<T, F>(cancel: &CancellationToken, call: F) -> Result<T, ControllerError>
where
    F: Future<Output = Result<T, ClusterError>>,
{
    if cancel.is_cancelled() {
        return Err(ControllerError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ControllerError::Cancelled),
        result = call => Ok(result?),
    }
}
