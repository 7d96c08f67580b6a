//! ClusterClient trait for mocking
//!
//! This trait abstracts cluster store access so the reconciler can be unit
//! tested without an API server. [`crate::KubeClusterClient`] implements it
//! against a live cluster.

use crate::error::ClusterError;
use crate::models::{DependentKind, DependentResource, ObjectKey};
use crds::MyApp;

/// Trait for cluster store operations
///
/// Reads return [`ClusterError::NotFound`] when the object is absent.
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ClusterClientTrait: Send + Sync {
    /// Get a `MyApp` by key
    async fn get_app(&self, key: &ObjectKey) -> Result<MyApp, ClusterError>;

    /// Replace a `MyApp` (metadata and spec; status is untouched)
    async fn update_app(&self, app: &MyApp) -> Result<MyApp, ClusterError>;

    /// Get a dependent object of the given kind by key
    async fn get_dependent(
        &self,
        kind: DependentKind,
        key: &ObjectKey,
    ) -> Result<DependentResource, ClusterError>;

    /// Create a dependent object
    async fn create_dependent(
        &self,
        resource: &DependentResource,
    ) -> Result<DependentResource, ClusterError>;

    /// Replace a dependent object
    async fn update_dependent(
        &self,
        resource: &DependentResource,
    ) -> Result<DependentResource, ClusterError>;
}
