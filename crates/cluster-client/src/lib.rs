//! Cluster Client
//!
//! Narrow, typed access to the two object kinds the ConfigMap owner controller
//! touches: ReplicaSets (read) and ConfigMaps (read and replace).
//!
//! # Example
//!
//! ```no_run
//! use cluster_client::{ClusterClientTrait, KubeClusterClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubeClusterClient::try_default().await?;
//!
//! if let Some(cm) = client.get_config_map("default", "app-config").await? {
//!     println!("resourceVersion: {:?}", cm.metadata.resource_version);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod common;
pub mod error;
#[path = "trait.rs"]
pub mod cluster_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubeClusterClient;
pub use cluster_trait::ClusterClientTrait;
pub use error::ClusterError;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockClusterClient;
