//! Helpers shared by the real and mock clients

use crate::error::ClusterError;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Namespace and name of a namespaced object, or an error when either is unset.
pub fn object_key(meta: &ObjectMeta) -> Result<(&str, &str), ClusterError> {
    let namespace = meta
        .namespace
        .as_deref()
        .ok_or_else(|| ClusterError::InvalidRequest("object has no namespace".to_string()))?;
    let name = meta
        .name
        .as_deref()
        .ok_or_else(|| ClusterError::InvalidRequest("object has no name".to_string()))?;
    Ok((namespace, name))
}
