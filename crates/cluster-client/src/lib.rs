//! Cluster Store Client
//!
//! Typed access to the three object kinds the MyApp controller touches:
//! the `MyApp` primary resource, its `Deployment` and its `Service`.
//!
//! # Example
//!
//! ```no_run
//! use cluster_client::{ClusterClientTrait, DependentKind, KubeClusterClient, ObjectKey};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubeClusterClient::new(kube::Client::try_default().await?);
//! let key = ObjectKey::new("default", "demo");
//!
//! let app = client.get_app(&key).await?;
//! let workload = client.get_dependent(DependentKind::Workload, &key).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `test-util`: exposes [`MockClusterClient`], an in-memory store that
//!   records every call and mimics the API server's create/update rules.

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod cluster_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KubeClusterClient;
pub use error::ClusterError;
pub use models::*;
pub use cluster_trait::ClusterClientTrait;
#[cfg(feature = "test-util")]
pub use mock::{MockCall, MockClusterClient};
