//! ConfigMap references in a ReplicaSet's pod template.

use k8s_openapi::api::apps::v1::ReplicaSet;
use k8s_openapi::api::core::v1::{PodSpec, Volume};
use std::collections::HashSet;

/// Names in first-seen order, each kept once.
#[derive(Debug, Default, Clone)]
pub struct OrderedNameSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl OrderedNameSet {
    /// Append `name` unless already present. Returns whether it was added.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.seen.contains(name) {
            return false;
        }
        self.seen.insert(name.to_string());
        self.order.push(name.to_string());
        true
    }

    pub fn into_vec(self) -> Vec<String> {
        self.order
    }
}

/// ConfigMaps mounted by any container of the ReplicaSet's pod template.
///
/// Primary containers are walked before init containers, mounts in
/// declaration order. A ConfigMap volume no container mounts is ignored.
pub fn extract_config_map_refs(replica_set: &ReplicaSet) -> Vec<String> {
    replica_set
        .spec
        .as_ref()
        .and_then(|spec| spec.template.as_ref())
        .and_then(|template| template.spec.as_ref())
        .map(config_map_refs)
        .unwrap_or_default()
}

/// Same as [`extract_config_map_refs`], for a bare pod spec.
pub fn config_map_refs(pod_spec: &PodSpec) -> Vec<String> {
    let volumes: &[Volume] = pod_spec.volumes.as_deref().unwrap_or_default();
    let containers = pod_spec
        .containers
        .iter()
        .chain(pod_spec.init_containers.iter().flatten());

    let mut refs = OrderedNameSet::default();
    for container in containers {
        for mount in container.volume_mounts.iter().flatten() {
            let config_maps = volumes
                .iter()
                .filter(|volume| volume.name == mount.name)
                .filter_map(|volume| volume.config_map.as_ref())
                .filter(|source| !source.name.is_empty());
            for source in config_maps {
                refs.insert(&source.name);
            }
        }
    }
    refs.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use k8s_openapi::api::core::v1::PodSpec;

    #[test]
    fn test_ordered_name_set() {
        let mut set = OrderedNameSet::default();
        assert!(set.insert("b"));
        assert!(set.insert("a"));
        assert!(!set.insert("b"));
        assert_eq!(set.into_vec(), vec!["b", "a"]);
    }

    #[test]
    fn test_single_mounted_config_map() {
        let pod = PodSpec {
            containers: vec![container("app", &["config-vol"])],
            volumes: Some(vec![config_map_volume("config-vol", "app-config")]),
            ..Default::default()
        };
        assert_eq!(config_map_refs(&pod), vec!["app-config"]);
    }

    #[test]
    fn test_primary_before_init_in_mount_order() {
        let pod = PodSpec {
            containers: vec![
                container("app", &["b-vol", "a-vol"]),
                container("sidecar", &["c-vol"]),
            ],
            init_containers: Some(vec![container("init", &["init-vol", "a-vol"])]),
            volumes: Some(vec![
                config_map_volume("a-vol", "a"),
                config_map_volume("b-vol", "b"),
                config_map_volume("c-vol", "c"),
                config_map_volume("init-vol", "init"),
            ]),
            ..Default::default()
        };
        assert_eq!(config_map_refs(&pod), vec!["b", "a", "c", "init"]);
    }

    #[test]
    fn test_same_config_map_through_two_volumes_is_listed_once() {
        let pod = PodSpec {
            containers: vec![container("app", &["vol-a"])],
            init_containers: Some(vec![container("init", &["vol-b"])]),
            volumes: Some(vec![
                config_map_volume("vol-a", "shared"),
                config_map_volume("vol-b", "shared"),
            ]),
            ..Default::default()
        };
        assert_eq!(config_map_refs(&pod), vec!["shared"]);
    }

    #[test]
    fn test_unmounted_volume_is_ignored() {
        let pod = PodSpec {
            containers: vec![container("app", &["used"])],
            volumes: Some(vec![
                config_map_volume("used", "used-config"),
                config_map_volume("orphan", "orphan-config"),
            ]),
            ..Default::default()
        };
        assert_eq!(config_map_refs(&pod), vec!["used-config"]);
    }

    #[test]
    fn test_non_config_map_volumes_are_ignored() {
        let pod = PodSpec {
            containers: vec![container("app", &["scratch", "missing-volume"])],
            volumes: Some(vec![empty_dir_volume("scratch")]),
            ..Default::default()
        };
        assert!(config_map_refs(&pod).is_empty());
    }

    #[test]
    fn test_replica_set_without_template() {
        let mut rs = replica_set("default", "app-rs", "u1", after_start(), PodSpec::default());
        rs.spec = None;
        assert!(extract_config_map_refs(&rs).is_empty());
    }
}
