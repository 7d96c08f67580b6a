//! Controller-specific error types.
//!
//! This module defines error types specific to the MyApp Controller
//! that are not covered by upstream library errors.

use cluster_client::ClusterError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the MyApp Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Cluster store error other than the expected NotFound
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// Kubernetes client setup error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Applied-spec annotation is absent
    #[error("Applied-spec snapshot missing: {0}")]
    MissingSnapshot(String),

    /// Applied-spec annotation could not be decoded
    #[error("Failed to decode applied-spec snapshot: {0}")]
    SnapshotDecode(#[source] serde_json::Error),

    /// Spec could not be encoded into the annotation
    #[error("Failed to encode spec: {0}")]
    Serialization(#[source] serde_json::Error),

    /// MyApp spec is out of bounds
    #[error("Invalid MyApp spec: {0}")]
    InvalidSpec(String),

    /// Object metadata lacks a field the controller needs (name, namespace, uid)
    #[error("Missing metadata: {0}")]
    MissingMetadata(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reconciliation failed
    #[error("Reconciliation failed: {0}")]
    Reconciliation(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
