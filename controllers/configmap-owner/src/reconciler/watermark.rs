//! Startup watermark.
//!
//! Objects that existed before the controller started are never touched, so
//! restarting or redeploying the controller cannot rewrite owner references on
//! workloads that were already running.

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Strictly after: an object stamped exactly at `start` is not new.
pub fn is_new_since(creation: DateTime<Utc>, start: DateTime<Utc>) -> bool {
    creation > start
}

/// The object's `creationTimestamp`, if set and well formed.
///
/// Read through the RFC 3339 wire form so this does not depend on which
/// date-time type `k8s-openapi` wraps.
pub fn creation_time(meta: &ObjectMeta) -> Option<DateTime<Utc>> {
    let raw = serde_json::to_value(meta.creation_timestamp.as_ref()?).ok()?;
    DateTime::parse_from_rfc3339(raw.as_str()?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Whether the object was created strictly after `start`.
///
/// Objects without a creation timestamp are treated as pre-existing.
pub fn created_after(meta: &ObjectMeta, start: DateTime<Utc>) -> bool {
    creation_time(meta).is_some_and(|created| is_new_since(created, start))
}
