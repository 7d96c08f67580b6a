//! Canonical dependent resources for a `MyApp`.
//!
//! Everything here is pure: the same spec, key and owner always produce the
//! same objects. Server-assigned fields (cluster IP, node ports, uid,
//! resourceVersion) are never set; they only ever come from live objects.

use crate::error::ControllerError;
use cluster_client::{DependentKind, DependentResource, ObjectKey};
use crds::{MyApp, MyAppSpec, APP_LABEL};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PodSpec, PodTemplateSpec, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::Resource;
use std::collections::BTreeMap;

const CONTAINER_PORT_NAME: &str = "http";
const IMAGE_PULL_POLICY: &str = "IfNotPresent";
const SERVICE_TYPE: &str = "NodePort";
const SERVICE_PROTOCOL: &str = "TCP";

/// Selector labels shared by the pod template, the Deployment and the Service.
pub fn app_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), name.to_string())])
}

/// Controller owner reference pointing at the `MyApp`.
///
/// Fails when the object has not been persisted yet (no uid).
pub fn owner_reference(app: &MyApp) -> Result<OwnerReference, ControllerError> {
    app.controller_owner_ref(&()).ok_or_else(|| {
        ControllerError::MissingMetadata("MyApp has no name or uid to own dependents".to_string())
    })
}

fn dependent_meta(key: &ObjectKey, owner: &OwnerReference) -> ObjectMeta {
    ObjectMeta {
        name: Some(key.name.clone()),
        namespace: Some(key.namespace.clone()),
        owner_references: Some(vec![owner.clone()]),
        ..Default::default()
    }
}

/// Builds the Deployment running `spec.image` with `spec.replicaCount` replicas.
pub fn synthesize_workload(spec: &MyAppSpec, key: &ObjectKey, owner: &OwnerReference) -> Deployment {
    let labels = app_labels(&key.name);

    Deployment {
        metadata: dependent_meta(key, owner),
        spec: Some(DeploymentSpec {
            replicas: Some(spec.replica_count),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: key.name.clone(),
                        image: Some(spec.image.clone()),
                        image_pull_policy: Some(IMAGE_PULL_POLICY.to_string()),
                        ports: Some(vec![ContainerPort {
                            name: Some(CONTAINER_PORT_NAME.to_string()),
                            container_port: spec.container_port,
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Builds the NodePort Service mapping `spec.servicePort` to `spec.containerPort`.
pub fn synthesize_endpoint(spec: &MyAppSpec, key: &ObjectKey, owner: &OwnerReference) -> Service {
    Service {
        metadata: dependent_meta(key, owner),
        spec: Some(ServiceSpec {
            type_: Some(SERVICE_TYPE.to_string()),
            ports: Some(vec![ServicePort {
                protocol: Some(SERVICE_PROTOCOL.to_string()),
                port: spec.service_port,
                target_port: Some(IntOrString::Int(spec.container_port)),
                ..Default::default()
            }]),
            selector: Some(app_labels(&key.name)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Builds the canonical object of the given kind.
pub fn synthesize(
    kind: DependentKind,
    spec: &MyAppSpec,
    key: &ObjectKey,
    owner: &OwnerReference,
) -> DependentResource {
    match kind {
        DependentKind::Workload => synthesize_workload(spec, key, owner).into(),
        DependentKind::NetworkEndpoint => synthesize_endpoint(spec, key, owner).into(),
    }
}
