//! Test utilities for unit testing the reconciler
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::reconciler::drift::MissingSnapshotPolicy;
use crate::reconciler::Reconciler;
use cluster_client::{MockClusterClient, ObjectKey};
use crds::{MyApp, MyAppSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference, Time};

/// Namespace used by all test objects
pub const TEST_NAMESPACE: &str = "default";

/// Spec from the bootstrap scenario: 2 replicas of app:v1, 80 -> 8080
pub fn test_spec() -> MyAppSpec {
    MyAppSpec {
        image: "app:v1".to_string(),
        replica_count: 2,
        container_port: 8080,
        service_port: 80,
    }
}

/// Deterministic uid for a test `MyApp`
pub fn test_uid(name: &str) -> String {
    format!("uid-{}", name)
}

/// Key of a test `MyApp`
pub fn test_key(name: &str) -> ObjectKey {
    ObjectKey::new(TEST_NAMESPACE, name)
}

/// Helper to create a persisted-looking `MyApp` (uid and resourceVersion set)
pub fn create_test_app(name: &str, spec: MyAppSpec) -> MyApp {
    MyApp {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            uid: Some(test_uid(name)),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec,
    }
}

/// Owner reference the controller should put on dependents of `name`
pub fn test_owner(name: &str) -> OwnerReference {
    OwnerReference {
        api_version: "apps.microscaler.io/v1".to_string(),
        kind: "MyApp".to_string(),
        name: name.to_string(),
        uid: test_uid(name),
        controller: Some(true),
        ..Default::default()
    }
}

/// Deletion timestamp for marking a test object as being deleted
pub fn deletion_time() -> Time {
    serde_json::from_value(serde_json::json!("2024-01-01T00:00:00Z"))
        .unwrap_or_else(|e| panic!("invalid test timestamp: {}", e))
}

/// Reconciler backed by (a clone of) the given mock
pub fn create_test_reconciler(mock: &MockClusterClient, policy: MissingSnapshotPolicy) -> Reconciler {
    Reconciler::new(Box::new(mock.clone()), policy)
}
