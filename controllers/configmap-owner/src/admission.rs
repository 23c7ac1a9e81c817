//! Event admission.
//!
//! Only the creation of a ReplicaSet that appeared after the controller
//! started leads to a reconciliation. Updates, deletions and resyncs are
//! dropped here, before anything reaches the controller.

use crate::reconciler::watermark;
use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::ReplicaSet;
use kube_runtime::reflector::ObjectRef;
use std::sync::Arc;

/// Object carried by a [`WorkloadEvent`].
#[derive(Debug, Clone)]
pub enum Payload {
    Workload(Arc<ReplicaSet>),
    /// Anything that is not a ReplicaSet
    #[allow(dead_code)] // Reserved for future use
    Other { kind: String },
}

impl Payload {
    fn workload(&self) -> Option<&ReplicaSet> {
        match self {
            Payload::Workload(rs) => Some(rs.as_ref()),
            Payload::Other { .. } => None,
        }
    }
}

/// A change observed on the watched resource.
#[derive(Debug, Clone)]
pub enum WorkloadEvent {
    Create(Payload),
    Update { old: Payload, new: Payload },
    Delete(Payload),
    /// Resync or any other notification without a clear cause
    Generic(Payload),
}

impl WorkloadEvent {
    /// Reference to the ReplicaSet this event is about.
    pub fn object_key(&self) -> Option<ObjectRef<ReplicaSet>> {
        let payload = match self {
            WorkloadEvent::Create(p) | WorkloadEvent::Delete(p) | WorkloadEvent::Generic(p) => p,
            WorkloadEvent::Update { new, .. } => new,
        };
        payload.workload().map(ObjectRef::from_obj)
    }
}

/// Whether `event` should be reconciled.
pub fn admit(event: &WorkloadEvent, start: DateTime<Utc>) -> bool {
    match event {
        WorkloadEvent::Create(payload) => payload
            .workload()
            .is_some_and(|rs| watermark::created_after(&rs.metadata, start)),
        WorkloadEvent::Update { .. } | WorkloadEvent::Delete(_) | WorkloadEvent::Generic(_) => {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use k8s_openapi::api::core::v1::PodSpec;

    fn payload(created: DateTime<Utc>) -> Payload {
        Payload::Workload(Arc::new(replica_set(
            "default",
            "app-rs",
            "u1",
            created,
            PodSpec::default(),
        )))
    }

    #[test]
    fn test_create_after_start_is_admitted() {
        assert!(admit(&WorkloadEvent::Create(payload(after_start())), start_time()));
    }

    #[test]
    fn test_create_before_or_at_start_is_rejected() {
        assert!(!admit(&WorkloadEvent::Create(payload(before_start())), start_time()));
        assert!(!admit(&WorkloadEvent::Create(payload(start_time())), start_time()));
    }

    #[test]
    fn test_other_event_kinds_are_rejected() {
        let new = payload(after_start());
        let events = [
            WorkloadEvent::Update {
                old: new.clone(),
                new: new.clone(),
            },
            WorkloadEvent::Delete(new.clone()),
            WorkloadEvent::Generic(new),
        ];
        for event in &events {
            assert!(!admit(event, start_time()), "{event:?} should be rejected");
        }
    }

    #[test]
    fn test_non_workload_payload_is_rejected() {
        let event = WorkloadEvent::Create(Payload::Other {
            kind: "Deployment".to_string(),
        });
        assert!(!admit(&event, start_time()));
        assert!(event.object_key().is_none());
    }

    #[test]
    fn test_object_key() {
        let key = WorkloadEvent::Create(payload(after_start()))
            .object_key()
            .unwrap();
        assert_eq!(key.name, "app-rs");
        assert_eq!(key.namespace.as_deref(), Some("default"));
    }
}
