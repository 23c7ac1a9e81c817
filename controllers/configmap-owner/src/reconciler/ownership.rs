//! Owner references from ReplicaSets onto ConfigMaps.
//!
//! The reference is neither a controller reference nor blocking, so the
//! ConfigMap keeps whatever controller it already has and deleting the
//! ReplicaSet in foreground mode does not wait on it.

use crate::error::ControllerError;
use k8s_openapi::api::apps::v1::ReplicaSet;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;

/// `kind` written into owner references for ReplicaSets.
pub const WORKLOAD_KIND: &str = <ReplicaSet as k8s_openapi::Resource>::KIND;

/// API group part of an `apiVersion` (`apps/v1` -> `apps`, `v1` -> ``).
fn api_group(api_version: &str) -> &str {
    match api_version.split_once('/') {
        Some((group, _)) => group,
        None => "",
    }
}

/// Whether `config_map` already names `replica_set` (kind, name, uid) as an owner.
pub fn has_owner_reference(config_map: &ConfigMap, replica_set: &ReplicaSet) -> bool {
    let (Some(name), Some(uid)) = (
        replica_set.metadata.name.as_deref(),
        replica_set.metadata.uid.as_deref(),
    ) else {
        return false;
    };

    config_map
        .metadata
        .owner_references
        .iter()
        .flatten()
        .any(|owner| owner.kind == WORKLOAD_KIND && owner.name == name && owner.uid == uid)
}

/// Build the garbage-collection owner reference for `replica_set`.
pub fn gc_owner_reference(replica_set: &ReplicaSet) -> Result<OwnerReference, ControllerError> {
    if replica_set.metadata.uid.is_none() {
        return Err(ControllerError::OwnerReference(format!(
            "ReplicaSet {:?} has no uid",
            replica_set.metadata.name
        )));
    }
    let mut owner = replica_set.owner_ref(&()).ok_or_else(|| {
        ControllerError::OwnerReference("ReplicaSet has no name or uid".to_string())
    })?;
    owner.controller = Some(false);
    owner.block_owner_deletion = Some(false);
    Ok(owner)
}

/// Insert `owner` into `references`.
///
/// An existing record for the same API group, kind and name is overwritten
/// in place (the uid changes when an object is recreated under the same
/// name); otherwise `owner` is appended. Records for other owners are kept.
pub fn upsert_owner_reference(references: &mut Vec<OwnerReference>, owner: OwnerReference) {
    let existing = references.iter_mut().find(|r| {
        api_group(&r.api_version) == api_group(&owner.api_version)
            && r.kind == owner.kind
            && r.name == owner.name
    });
    match existing {
        Some(slot) => *slot = owner,
        None => references.push(owner),
    }
}

/// Record `replica_set` as a non-controller owner of `config_map`.
pub fn set_owner_reference(
    config_map: &mut ConfigMap,
    replica_set: &ReplicaSet,
) -> Result<(), ControllerError> {
    let owner = gc_owner_reference(replica_set)?;
    let references = config_map.metadata.owner_references.get_or_insert_with(Vec::new);
    upsert_owner_reference(references, owner);
    Ok(())
}
