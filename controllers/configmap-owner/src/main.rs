//! ConfigMap Owner Controller
//!
//! Watches for newly created ReplicaSets and adds a non-controller owner
//! reference to every ConfigMap they mount, so the garbage collector removes
//! the ConfigMaps together with the ReplicaSet.
//!
//! ReplicaSets that existed before the controller started are left alone.

mod admission;
mod backoff;
mod config;
mod controller;
mod error;
mod logging;
mod reconciler;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::{CliArgs, OperatorConfig};
use crate::error::ControllerError;
use clap::Parser;
use controller::Controller;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    let args = CliArgs::parse();
    let config = OperatorConfig::from_args_and_env(args)?;
    logging::init_logging(&config);

    // kube's rustls client needs a process-wide crypto provider
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    info!("Starting ConfigMap Owner Controller");
    info!("Configuration:");
    if config.namespace_regex.is_empty() {
        info!("  Namespace patterns: <all namespaces>");
    } else {
        info!("  Namespace patterns: {:?}", config.namespace_regex);
    }
    info!(
        "  Watch scope: {}",
        config.watch_namespace.as_deref().unwrap_or("all namespaces")
    );
    info!("  Dry run: {}", config.dry_run);
    info!("  Debug: {}, Trace: {}", config.debug, config.trace);
    info!("  Max concurrent reconciles: {}", config.max_concurrent_reconciles);

    let controller = Controller::new(&config).await?;
    controller.run().await?;

    Ok(())
}
