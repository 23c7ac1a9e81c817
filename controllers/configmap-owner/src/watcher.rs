//! Kubernetes resource watchers.
//!
//! ReplicaSet watch events are classified into create/update/delete
//! notifications. Only admitted creations trigger the `kube_runtime`
//! controller, which bounds concurrency, de-duplicates keys and requeues
//! failures with per-key backoff.

use crate::admission::{admit, Payload, WorkloadEvent};
use crate::error::ControllerError;
use crate::reconciler::{ReconcileContext, ReconcileOutcome, Reconciler};
use chrono::{DateTime, Utc};
use futures::{future, Stream, StreamExt};
use k8s_openapi::api::apps::v1::ReplicaSet;
use kube::Api;
use kube_runtime::controller::{self, Action, Config as ControllerConfig};
use kube_runtime::reflector::{self, ObjectRef};
use kube_runtime::{watcher, Controller, WatchStreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Upper bound on a single reconciliation
const RECONCILE_TIMEOUT: Duration = Duration::from_secs(30);

type ObjectsByUid = HashMap<String, Arc<ReplicaSet>>;

/// Tells creations apart from updates.
///
/// A watch only reports the current state of an object. The first time a
/// uid shows up it is a creation, afterwards an update. When the watch
/// re-lists, objects that were known before the re-list stay updates and
/// objects that vanished during it are forgotten.
#[derive(Debug, Default)]
pub struct EventClassifier {
    known: ObjectsByUid,
    relist: Option<ObjectsByUid>,
}

impl EventClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&mut self, event: watcher::Event<ReplicaSet>) -> Option<WorkloadEvent> {
        match event {
            watcher::Event::Apply(rs) | watcher::Event::InitApply(rs) => Some(self.observe(rs)),
            watcher::Event::Delete(rs) => {
                if let Some(uid) = rs.metadata.uid.as_deref() {
                    self.known.remove(uid);
                    if let Some(relist) = self.relist.as_mut() {
                        relist.remove(uid);
                    }
                }
                Some(WorkloadEvent::Delete(Payload::Workload(Arc::new(rs))))
            }
            watcher::Event::Init => {
                debug!("ReplicaSet watcher (re)listing");
                self.relist = Some(HashMap::new());
                None
            }
            watcher::Event::InitDone => {
                if let Some(seen) = self.relist.take() {
                    self.known = seen;
                }
                debug!("ReplicaSet watcher listed {} objects", self.tracked());
                None
            }
        }
    }

    /// Number of ReplicaSets currently known.
    fn tracked(&self) -> usize {
        self.known.len()
    }

    fn observe(&mut self, rs: ReplicaSet) -> WorkloadEvent {
        let rs = Arc::new(rs);
        let Some(uid) = rs.metadata.uid.clone() else {
            return WorkloadEvent::Generic(Payload::Workload(rs));
        };

        if let Some(relist) = self.relist.as_mut() {
            relist.insert(uid.clone(), Arc::clone(&rs));
        }
        match self.known.insert(uid, Arc::clone(&rs)) {
            Some(old) => WorkloadEvent::Update {
                old: Payload::Workload(old),
                new: Payload::Workload(rs),
            },
            None => WorkloadEvent::Create(Payload::Workload(rs)),
        }
    }
}

/// State shared by every reconciliation the controller runs.
pub struct ControllerContext {
    pub reconciler: Reconciler,
    pub reconcile: ReconcileContext,
    /// Cancelled on shutdown; each reconciliation runs under a child token
    pub shutdown: CancellationToken,
}

/// Narrow a ReplicaSet watch stream down to admitted creations.
///
/// Watch errors pass through so the controller can report them.
pub fn admitted_creations<S>(
    events: S,
    start_time: DateTime<Utc>,
) -> impl Stream<Item = Result<ReplicaSet, watcher::Error>> + Send + 'static
where
    S: Stream<Item = Result<watcher::Event<ReplicaSet>, watcher::Error>> + Send + 'static,
{
    let mut classifier = EventClassifier::new();
    events.filter_map(move |result| {
        let admitted = match result {
            Ok(event) => classifier
                .classify(event)
                .and_then(|event| admitted_workload(event, start_time))
                .map(Ok),
            Err(e) => Some(Err(e)),
        };
        future::ready(admitted)
    })
}

fn admitted_workload(event: WorkloadEvent, start_time: DateTime<Utc>) -> Option<ReplicaSet> {
    if !admit(&event, start_time) {
        trace!("Ignoring {:?}", event.object_key());
        return None;
    }
    if let Some(key) = event.object_key() {
        info!("ReplicaSet created: {}", key);
    }
    match event {
        WorkloadEvent::Create(Payload::Workload(rs)) => Some(Arc::unwrap_or_clone(rs)),
        _ => None,
    }
}

/// Reconcile one ReplicaSet, bounded by [`RECONCILE_TIMEOUT`] and shutdown.
pub async fn reconcile_replica_set(
    rs: Arc<ReplicaSet>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ControllerError> {
    let key = ObjectRef::from_obj(rs.as_ref());
    let namespace = key.namespace.clone().unwrap_or_default();

    let cancel = ctx.shutdown.child_token();
    let reconcile = ctx
        .reconciler
        .reconcile(&ctx.reconcile, &namespace, &key.name, &cancel);

    let outcome = match tokio::time::timeout(RECONCILE_TIMEOUT, reconcile).await {
        Ok(outcome) => outcome?,
        Err(_elapsed) => {
            cancel.cancel();
            return Err(ControllerError::Cancelled);
        }
    };

    ctx.reconciler.reset_backoff(&key);
    match outcome {
        ReconcileOutcome::Skipped(reason) => debug!("Skipped ReplicaSet {}: {}", key, reason),
        ReconcileOutcome::Applied(summary) => info!("Reconciled ReplicaSet {}: {}", key, summary),
    }
    Ok(Action::await_change())
}

/// Requeue retryable failures with the ReplicaSet's next backoff delay.
pub fn error_policy(
    rs: Arc<ReplicaSet>,
    error: &ControllerError,
    ctx: Arc<ControllerContext>,
) -> Action {
    let key = ObjectRef::from_obj(rs.as_ref());
    if error.is_retryable() {
        let delay = ctx.reconciler.next_backoff(&key);
        warn!(
            "Reconciliation of ReplicaSet {} failed, retrying in {:?}: {}",
            key, delay, error
        );
        Action::requeue(delay)
    } else {
        error!("Reconciliation of ReplicaSet {} failed: {}", key, error);
        ctx.reconciler.reset_backoff(&key);
        Action::await_change()
    }
}

/// Watch ReplicaSets and reconcile admitted creations until `shutdown`
/// resolves. In-flight reconciliations are drained before returning.
pub async fn watch_replica_sets<F>(
    api: Api<ReplicaSet>,
    ctx: Arc<ControllerContext>,
    start_time: DateTime<Utc>,
    concurrency: u16,
    shutdown: F,
) where
    F: Future<Output = ()> + Send + Sync + 'static,
{
    info!("Starting ReplicaSet watcher");

    let (reader, writer) = reflector::store();
    let events = watcher(api, watcher::Config::default())
        .default_backoff()
        .reflect(writer);

    Controller::for_stream(admitted_creations(events, start_time), reader)
        .with_config(ControllerConfig::default().concurrency(concurrency))
        .graceful_shutdown_on(shutdown)
        .run(reconcile_replica_set, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((key, _action)) => trace!("Reconciled {}", key),
                // Already logged by the error policy
                Err(controller::Error::ReconcilerFailed(e, key)) => {
                    debug!("Reconciler failed for {}: {}", key, e)
                }
                Err(controller::Error::ObjectNotFound(key)) => {
                    debug!("ReplicaSet {} vanished before reconciliation", key)
                }
                Err(e) => warn!("ReplicaSet controller error: {}", e),
            }
        })
        .await;

    info!("ReplicaSet watcher stopped");
}
