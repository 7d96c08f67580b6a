//! Tests for the in-memory mock cluster client.
//!
//! The reconciler tests rely on the mock behaving like the API server for the
//! fields the controller must preserve, so that behaviour is pinned here.

use cluster_client::{
    ClusterClientTrait, ClusterError, DependentKind, DependentResource, MockCall,
    MockClusterClient, ObjectKey,
};
use crds::{MyApp, MyAppSpec};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;

fn meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some("default".to_string()),
        ..Default::default()
    }
}

fn selector(app: &str) -> LabelSelector {
    LabelSelector {
        match_labels: Some(BTreeMap::from([("app".to_string(), app.to_string())])),
        ..Default::default()
    }
}

fn service(name: &str, port: i32) -> Service {
    Service {
        metadata: meta(name),
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                port,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn deployment(name: &str, app: &str) -> Deployment {
    Deployment {
        metadata: meta(name),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: selector(app),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_get_missing_objects_is_not_found() {
    let client = MockClusterClient::new();
    let key = ObjectKey::new("default", "demo");

    let err = client.get_app(&key).await.unwrap_err();
    assert!(err.is_not_found());

    let err = client
        .get_dependent(DependentKind::NetworkEndpoint, &key)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_create_service_assigns_cluster_ip() {
    let client = MockClusterClient::new();
    let created = client
        .create_dependent(&service("demo", 80).into())
        .await
        .unwrap();

    let DependentResource::NetworkEndpoint(svc) = created else {
        panic!("expected a Service");
    };
    let spec = svc.spec.unwrap();
    assert!(spec.cluster_ip.is_some());
    assert_eq!(spec.cluster_ips, spec.cluster_ip.map(|ip| vec![ip]));
    assert!(svc.metadata.uid.is_some());
}

#[tokio::test]
async fn test_create_twice_conflicts() {
    let client = MockClusterClient::new();
    client.create_dependent(&deployment("demo", "demo").into()).await.unwrap();
    let err = client
        .create_dependent(&deployment("demo", "demo").into())
        .await
        .unwrap_err();
    assert!(matches!(err, ClusterError::Conflict(_)));
}

#[tokio::test]
async fn test_update_rejects_selector_change() {
    let client = MockClusterClient::new();
    client.create_dependent(&deployment("demo", "demo").into()).await.unwrap();

    let err = client
        .update_dependent(&deployment("demo", "other").into())
        .await
        .unwrap_err();
    assert!(matches!(err, ClusterError::Invalid(_)));
}

#[tokio::test]
async fn test_update_rejects_cluster_ip_change() {
    let client = MockClusterClient::new();
    client.create_dependent(&service("demo", 80).into()).await.unwrap();

    // A freshly built Service carries no cluster IP
    let err = client
        .update_dependent(&service("demo", 81).into())
        .await
        .unwrap_err();
    assert!(matches!(err, ClusterError::Invalid(_)));
}

#[tokio::test]
async fn test_update_with_stale_resource_version_conflicts() {
    let client = MockClusterClient::new();
    let created = client
        .create_dependent(&deployment("demo", "demo").into())
        .await
        .unwrap();
    // First update moves the resource version on
    client.update_dependent(&created).await.unwrap();

    let err = client.update_dependent(&created).await.unwrap_err();
    assert!(matches!(err, ClusterError::Conflict(_)));
}

#[tokio::test]
async fn test_injected_failures_are_recorded() {
    let client = MockClusterClient::new();
    let key = ObjectKey::new("default", "demo");
    client.add_app(MyApp {
        metadata: meta("demo"),
        spec: MyAppSpec {
            image: "app:v1".to_string(),
            replica_count: 1,
            container_port: 8080,
            service_port: 80,
        },
    });
    client.fail_on(MockCall::GetApp(key.clone()));

    let err = client.get_app(&key).await.unwrap_err();
    assert!(matches!(err, ClusterError::Api { code: 503, .. }));
    assert_eq!(client.calls(), vec![MockCall::GetApp(key.clone())]);

    client.clear_failures();
    assert!(client.get_app(&key).await.is_ok());
}

#[tokio::test]
async fn test_mutating_calls_filter() {
    let client = MockClusterClient::new();
    let key = ObjectKey::new("default", "demo");
    let _ = client.get_dependent(DependentKind::Workload, &key).await;
    client.create_dependent(&deployment("demo", "demo").into()).await.unwrap();

    assert_eq!(client.calls().len(), 2);
    assert_eq!(
        client.mutating_calls(),
        vec![MockCall::Create(DependentKind::Workload, key)]
    );
}
