//! Create/update of dependents and persistence of the applied-spec snapshot.

use super::drift::encode_snapshot;
use crate::error::ControllerError;
use cluster_client::{ClusterClientTrait, DependentResource, ObjectKey};
use crds::{MyApp, APPLIED_SPEC_ANNOTATION};
use k8s_openapi::api::core::v1::ServicePort;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Overlays the mutable parts of `desired` onto `live`.
///
/// Deployment: replicas and pod template come from `desired`; the selector
/// stays as it is on the live object.
/// Service: type and ports come from `desired`; selector, cluster IP(s) and
/// any node port already assigned to an unchanged port stay as they are.
/// Live metadata is kept (resourceVersion included); the owner reference from
/// `desired` is added if the live object lacks it.
pub fn carry_forward(
    live: DependentResource,
    desired: DependentResource,
) -> Result<DependentResource, ControllerError> {
    match (live, desired) {
        (DependentResource::Workload(mut live), DependentResource::Workload(desired)) => {
            adopt(&mut live.metadata, &desired.metadata);
            let desired_spec = desired.spec.unwrap_or_default();
            match live.spec.as_mut() {
                Some(spec) => {
                    spec.replicas = desired_spec.replicas;
                    spec.template = desired_spec.template;
                }
                None => live.spec = Some(desired_spec),
            }
            Ok(live.into())
        }
        (DependentResource::NetworkEndpoint(mut live), DependentResource::NetworkEndpoint(desired)) => {
            adopt(&mut live.metadata, &desired.metadata);
            let desired_spec = desired.spec.unwrap_or_default();
            match live.spec.as_mut() {
                Some(spec) => {
                    let live_ports = spec.ports.as_deref();
                    let ports: Option<Vec<ServicePort>> = desired_spec.ports.map(|ports| {
                        ports
                            .into_iter()
                            .map(|p| keep_node_port(p, live_ports))
                            .collect()
                    });
                    spec.ports = ports;
                    spec.type_ = desired_spec.type_;
                }
                None => live.spec = Some(desired_spec),
            }
            Ok(live.into())
        }
        (live, desired) => Err(ControllerError::Reconciliation(format!(
            "cannot update {} from a {} definition",
            live.kind(),
            desired.kind()
        ))),
    }
}

fn keep_node_port(mut port: ServicePort, live_ports: Option<&[ServicePort]>) -> ServicePort {
    if port.node_port.is_none() {
        port.node_port = live_ports
            .unwrap_or_default()
            .iter()
            .find(|l| l.port == port.port && l.protocol == port.protocol)
            .and_then(|l| l.node_port);
    }
    port
}

fn adopt(live: &mut ObjectMeta, desired: &ObjectMeta) {
    for owner in desired.owner_references.iter().flatten() {
        let owners = live.owner_references.get_or_insert_with(Vec::new);
        if !owners.iter().any(|o| o.uid == owner.uid) {
            owners.push(owner.clone());
        }
    }
}

/// Creates a synthesized dependent.
pub async fn create_dependent(
    client: &dyn ClusterClientTrait,
    desired: &DependentResource,
    key: &ObjectKey,
) -> Result<(), ControllerError> {
    client.create_dependent(desired).await?;
    info!("Created {} {}", desired.kind(), key);
    Ok(())
}

/// Brings one live dependent in line with its synthesized form.
///
/// A dependent missing at this point (e.g. a Service whose creation failed
/// during bootstrap) is created. An update that would not change the live
/// object is skipped.
pub async fn converge_dependent(
    client: &dyn ClusterClientTrait,
    desired: DependentResource,
    live: Option<DependentResource>,
    key: &ObjectKey,
) -> Result<(), ControllerError> {
    let kind = desired.kind();
    let Some(live) = live else {
        warn!("{} {} is missing, recreating it", kind, key);
        return create_dependent(client, &desired, key).await;
    };

    let merged = carry_forward(live.clone(), desired)?;
    if merged == live {
        debug!("{} {} already up-to-date", kind, key);
        return Ok(());
    }

    client.update_dependent(&merged).await?;
    info!("Updated {} {}", kind, key);
    Ok(())
}

/// Writes the current spec into the applied-spec annotation.
///
/// Returns `false` without calling the API when the annotation already holds
/// exactly the encoded spec.
pub async fn persist_snapshot(
    client: &dyn ClusterClientTrait,
    mut app: MyApp,
    key: &ObjectKey,
) -> Result<bool, ControllerError> {
    let encoded = encode_snapshot(&app.spec)?;
    let annotations = app.metadata.annotations.get_or_insert_with(BTreeMap::new);
    if annotations.get(APPLIED_SPEC_ANNOTATION) == Some(&encoded) {
        debug!("Applied-spec snapshot of MyApp {} is current", key);
        return Ok(false);
    }

    annotations.insert(APPLIED_SPEC_ANNOTATION.to_string(), encoded);
    client.update_app(&app).await?;
    info!("Stored applied-spec snapshot on MyApp {}", key);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::synthesize::{synthesize_endpoint, synthesize_workload};
    use crate::test_utils::{test_owner, test_spec};
    use crds::MyAppSpec;
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::Service;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

    fn key() -> ObjectKey {
        ObjectKey::new("default", "demo")
    }

    fn live_service(spec: &MyAppSpec) -> Service {
        let mut svc = synthesize_endpoint(spec, &key(), &test_owner("demo"));
        svc.metadata.resource_version = Some("7".to_string());
        let s = svc.spec.as_mut().unwrap();
        s.cluster_ip = Some("10.96.0.10".to_string());
        s.cluster_ips = Some(vec!["10.96.0.10".to_string()]);
        s.ports.as_mut().unwrap()[0].node_port = Some(30080);
        svc
    }

    #[test]
    fn test_carry_forward_service_keeps_cluster_ip_and_selector() {
        let live = live_service(&test_spec());
        let changed = MyAppSpec { service_port: 443, container_port: 9090, ..test_spec() };
        let desired = synthesize_endpoint(&changed, &key(), &test_owner("demo"));

        let DependentResource::NetworkEndpoint(merged) =
            carry_forward(live.clone().into(), desired.into()).unwrap()
        else {
            panic!("expected a Service");
        };

        let spec = merged.spec.unwrap();
        let live_spec = live.spec.unwrap();
        assert_eq!(spec.cluster_ip, live_spec.cluster_ip);
        assert_eq!(spec.cluster_ips, live_spec.cluster_ips);
        assert_eq!(spec.selector, live_spec.selector);
        let ports = spec.ports.unwrap();
        assert_eq!(ports[0].port, 443);
        assert_eq!(ports[0].target_port, Some(IntOrString::Int(9090)));
        // Node port belonged to port 80, which no longer exists
        assert_eq!(ports[0].node_port, None);
        assert_eq!(merged.metadata.resource_version, Some("7".to_string()));
    }

    #[test]
    fn test_carry_forward_service_keeps_node_port_of_unchanged_port() {
        let live = live_service(&test_spec());
        let changed = MyAppSpec { container_port: 9090, ..test_spec() };
        let desired = synthesize_endpoint(&changed, &key(), &test_owner("demo"));

        let DependentResource::NetworkEndpoint(merged) =
            carry_forward(live.into(), desired.into()).unwrap()
        else {
            panic!("expected a Service");
        };
        assert_eq!(merged.spec.unwrap().ports.unwrap()[0].node_port, Some(30080));
    }

    #[test]
    fn test_carry_forward_unchanged_service_is_identical() {
        let live = live_service(&test_spec());
        let desired = synthesize_endpoint(&test_spec(), &key(), &test_owner("demo"));

        let merged = carry_forward(live.clone().into(), desired.into()).unwrap();
        assert_eq!(merged, DependentResource::from(live));
    }

    #[test]
    fn test_carry_forward_deployment_keeps_live_selector() {
        let mut live = synthesize_workload(&test_spec(), &key(), &test_owner("demo"));
        let live_selector = LabelSelector {
            match_labels: Some(BTreeMap::from([("app".to_string(), "legacy".to_string())])),
            ..Default::default()
        };
        live.spec.as_mut().unwrap().selector = live_selector.clone();

        let changed = MyAppSpec { replica_count: 5, image: "app:v2".to_string(), ..test_spec() };
        let desired = synthesize_workload(&changed, &key(), &test_owner("demo"));

        let DependentResource::Workload(merged) = carry_forward(live.into(), desired.into()).unwrap()
        else {
            panic!("expected a Deployment");
        };
        let spec = merged.spec.unwrap();
        assert_eq!(spec.selector, live_selector);
        assert_eq!(spec.replicas, Some(5));
        let container = &spec.template.spec.unwrap().containers[0];
        assert_eq!(container.image.as_deref(), Some("app:v2"));
    }

    #[test]
    fn test_carry_forward_adds_missing_owner_reference() {
        let mut live = synthesize_workload(&test_spec(), &key(), &test_owner("demo"));
        live.metadata.owner_references = None;
        let desired = synthesize_workload(&test_spec(), &key(), &test_owner("demo"));

        let merged = carry_forward(live.into(), desired.into()).unwrap();
        let owners = merged.metadata().owner_references.clone().unwrap();
        assert_eq!(owners, vec![test_owner("demo")]);
    }

    #[test]
    fn test_carry_forward_rejects_kind_mismatch() {
        let live: DependentResource = Deployment::default().into();
        let desired: DependentResource = Service::default().into();
        let err = carry_forward(live, desired).unwrap_err();
        assert!(matches!(err, ControllerError::Reconciliation(_)));
    }
}
