//! Main controller implementation.
//!
//! Builds the cluster client and reconciler, then hands the ReplicaSet
//! watch to the `kube_runtime` controller until SIGINT or SIGTERM.

use crate::config::OperatorConfig;
use crate::error::ControllerError;
use crate::reconciler::{ReconcileContext, Reconciler};
use crate::watcher::{self, ControllerContext};
use chrono::{DateTime, Utc};
use cluster_client::KubeClusterClient;
use futures::channel::oneshot;
use k8s_openapi::api::apps::v1::ReplicaSet;
use kube::Api;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Main controller for ConfigMap ownership.
pub struct Controller {
    replica_set_api: Api<ReplicaSet>,
    context: Arc<ControllerContext>,
    start_time: DateTime<Utc>,
    max_concurrent_reconciles: u16,
}

impl Controller {
    /// Creates a new controller instance.
    ///
    /// The process start time used as the watermark is captured here, before
    /// the watch begins.
    pub async fn new(config: &OperatorConfig) -> Result<Self, ControllerError> {
        info!("Initializing ConfigMap Owner Controller");

        let client = KubeClusterClient::try_default().await?;
        let start_time = Utc::now();

        let replica_set_api: Api<ReplicaSet> = match config.watch_namespace.as_deref() {
            Some(namespace) => Api::namespaced(client.kube_client(), namespace),
            None => Api::all(client.kube_client()),
        };

        let max_concurrent_reconciles = u16::try_from(config.max_concurrent_reconciles)
            .unwrap_or_else(|_| {
                warn!(
                    "Max concurrent reconciles {} too large, using {}",
                    config.max_concurrent_reconciles,
                    u16::MAX
                );
                u16::MAX
            });

        let context = Arc::new(ControllerContext {
            reconciler: Reconciler::new(Box::new(client)),
            reconcile: ReconcileContext::new(config, start_time),
            shutdown: CancellationToken::new(),
        });

        info!("Ignoring ReplicaSets created at or before {}", start_time);

        Ok(Self {
            replica_set_api,
            context,
            start_time,
            max_concurrent_reconciles,
        })
    }

    /// Runs the controller until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<(), ControllerError> {
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let shutdown = self.context.shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("Shutdown signal received, stopping");
            shutdown.cancel();
            let _ = stop_tx.send(());
        });

        info!("ConfigMap Owner Controller running");

        watcher::watch_replica_sets(
            self.replica_set_api,
            self.context,
            self.start_time,
            self.max_concurrent_reconciles,
            async move {
                let _ = stop_rx.await;
            },
        )
        .await;

        info!("ConfigMap Owner Controller stopped");
        Ok(())
    }
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
