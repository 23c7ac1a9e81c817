//! Operator configuration.
//!
//! Flags are parsed with clap, then environment variables are overlaid on
//! top. Environment always wins, which is what the deployment manifests rely
//! on: `NAMESPACE_REGEX`, `DRY_RUN`, `DEBUG`, `TRACE`, `WATCH_NAMESPACE` and
//! `MAX_CONCURRENT_RECONCILES`.

use crate::error::ControllerError;
use clap::{ArgAction, Parser};

const TRUE_VALUE: &str = "true";

/// Default number of ReplicaSets reconciled in parallel
pub const DEFAULT_MAX_CONCURRENT_RECONCILES: usize = 3;

/// Command line flags
#[derive(Parser, Debug, Clone)]
#[command(name = "configmap-owner-controller")]
#[command(
    about = "Adds ReplicaSet owner references to the ConfigMaps they mount",
    long_about = None
)]
pub struct CliArgs {
    /// Comma-separated list of regex patterns to match namespaces (default: all namespaces).
    /// Blank entries such as the trailing one in "^kube-," are ignored; they do
    /// not act as an empty pattern matching every namespace.
    #[arg(long = "namespace-regex", default_value = "")]
    pub namespace_regex: String,

    /// If true, only log what changes would be made without actually making them
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true"
    )]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true"
    )]
    pub debug: bool,

    /// Enable trace logging (implies debug)
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true"
    )]
    pub trace: bool,

    /// Only watch ReplicaSets in this namespace (default: all namespaces)
    #[arg(long)]
    pub watch_namespace: Option<String>,

    /// Maximum number of ReplicaSets reconciled in parallel
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_RECONCILES)]
    pub max_concurrent_reconciles: usize,
}

/// Resolved, immutable operator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Regular expressions selecting namespaces; empty means every namespace
    pub namespace_regex: Vec<String>,
    /// Log intended changes instead of writing them
    pub dry_run: bool,
    /// Verbose logging
    pub debug: bool,
    /// Very verbose logging, always implies `debug`
    pub trace: bool,
    /// Restrict the ReplicaSet watch to one namespace
    pub watch_namespace: Option<String>,
    /// Worker pool size
    pub max_concurrent_reconciles: usize,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            namespace_regex: Vec::new(),
            dry_run: false,
            debug: false,
            trace: false,
            watch_namespace: None,
            max_concurrent_reconciles: DEFAULT_MAX_CONCURRENT_RECONCILES,
        }
    }
}

impl OperatorConfig {
    /// Resolve configuration from parsed flags and the process environment.
    pub fn from_args_and_env(args: CliArgs) -> Result<Self, ControllerError> {
        Self::resolve(args, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from parsed flags and an environment lookup.
    pub fn resolve<F>(args: CliArgs, env: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            namespace_regex: split_patterns(&args.namespace_regex),
            dry_run: args.dry_run,
            debug: args.debug,
            trace: args.trace,
            watch_namespace: args.watch_namespace.filter(|ns| !ns.is_empty()),
            max_concurrent_reconciles: args.max_concurrent_reconciles,
        };

        if let Some(raw) = env("NAMESPACE_REGEX").filter(|v| !v.is_empty()) {
            config.namespace_regex = split_patterns(&raw);
        }
        if env("DRY_RUN").as_deref() == Some(TRUE_VALUE) {
            config.dry_run = true;
        }
        if env("DEBUG").as_deref() == Some(TRUE_VALUE) {
            config.debug = true;
        }
        if env("TRACE").as_deref() == Some(TRUE_VALUE) {
            config.trace = true;
        }
        if let Some(ns) = env("WATCH_NAMESPACE").filter(|v| !v.is_empty()) {
            config.watch_namespace = Some(ns);
        }
        if let Some(raw) = env("MAX_CONCURRENT_RECONCILES").filter(|v| !v.is_empty()) {
            config.max_concurrent_reconciles = raw.trim().parse().map_err(|_| {
                ControllerError::InvalidConfig(format!(
                    "MAX_CONCURRENT_RECONCILES must be a positive integer, got {raw:?}"
                ))
            })?;
        }

        // Trace implies debug
        config.debug |= config.trace;

        if config.max_concurrent_reconciles == 0 {
            return Err(ControllerError::InvalidConfig(
                "max concurrent reconciles must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }

    /// Default `tracing` filter directive for this configuration.
    ///
    /// `RUST_LOG` takes precedence when set.
    pub fn log_filter(&self) -> &'static str {
        if self.trace {
            "trace"
        } else if self.debug {
            "debug,kube=info,hyper=info,tower=info"
        } else {
            "info"
        }
    }
}

/// Split a comma-separated pattern list, trimming each entry and dropping blanks.
pub fn split_patterns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(str::to_string)
        .collect()
}
