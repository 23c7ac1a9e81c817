//! Test utilities for unit testing the reconciler
//!
//! Builders for ReplicaSets, pod specs and ConfigMaps, plus a fixed process
//! start time so watermark checks are deterministic.

use crate::config::OperatorConfig;
use crate::reconciler::ReconcileContext;
use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use k8s_openapi::api::apps::v1::{ReplicaSet, ReplicaSetSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, EmptyDirVolumeSource, PodSpec, PodTemplateSpec,
    Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, Time};
use std::collections::BTreeMap;

/// Process start time used by every test
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

/// A creation time safely after [`start_time`]
pub fn after_start() -> DateTime<Utc> {
    start_time() + Duration::minutes(1)
}

/// A creation time before [`start_time`]
pub fn before_start() -> DateTime<Utc> {
    start_time() - Duration::hours(1)
}

/// Convert to the API's `Time` through its wire format
pub fn kube_time(at: DateTime<Utc>) -> Time {
    let raw = serde_json::Value::String(at.to_rfc3339_opts(SecondsFormat::Secs, true));
    serde_json::from_value(raw).unwrap()
}

/// Helper to create a container mounting the named volumes
pub fn container(name: &str, mounts: &[&str]) -> Container {
    Container {
        name: name.to_string(),
        image: Some("registry.example/app:1.0".to_string()),
        volume_mounts: Some(
            mounts
                .iter()
                .map(|volume| VolumeMount {
                    name: volume.to_string(),
                    mount_path: format!("/etc/{volume}"),
                    ..Default::default()
                })
                .collect(),
        ),
        ..Default::default()
    }
}

/// Helper to create a volume backed by a ConfigMap
pub fn config_map_volume(volume: &str, config_map: &str) -> Volume {
    Volume {
        name: volume.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: config_map.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Helper to create a scratch volume
pub fn empty_dir_volume(volume: &str) -> Volume {
    Volume {
        name: volume.to_string(),
        empty_dir: Some(EmptyDirVolumeSource::default()),
        ..Default::default()
    }
}

/// Pod spec with one container `app` mounting one ConfigMap per name
pub fn mounting(config_maps: &[&str]) -> PodSpec {
    let volumes: Vec<String> = config_maps.iter().map(|cm| format!("{cm}-vol")).collect();
    let mounts: Vec<&str> = volumes.iter().map(String::as_str).collect();
    PodSpec {
        containers: vec![container("app", &mounts)],
        volumes: Some(
            config_maps
                .iter()
                .zip(&volumes)
                .map(|(cm, volume)| config_map_volume(volume, cm))
                .collect(),
        ),
        ..Default::default()
    }
}

/// Helper to create a ReplicaSet with the given pod spec
pub fn replica_set(
    namespace: &str,
    name: &str,
    uid: &str,
    created: DateTime<Utc>,
    pod_spec: PodSpec,
) -> ReplicaSet {
    let labels = BTreeMap::from([("app".to_string(), name.to_string())]);
    ReplicaSet {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(uid.to_string()),
            creation_timestamp: Some(kube_time(created)),
            ..Default::default()
        },
        spec: Some(ReplicaSetSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: Some(PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(pod_spec),
            }),
            ..Default::default()
        }),
        status: None,
    }
}

/// Helper to create an empty ConfigMap
pub fn config_map(namespace: &str, name: &str) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([("key".to_string(), "value".to_string())])),
        ..Default::default()
    }
}

/// Reconcile context anchored at [`start_time`]
pub fn context(namespace_regex: &[&str], dry_run: bool) -> ReconcileContext {
    let config = OperatorConfig {
        namespace_regex: namespace_regex.iter().map(|p| p.to_string()).collect(),
        dry_run,
        ..Default::default()
    };
    ReconcileContext::new(&config, start_time())
}
