//! Mock ClusterClient for unit testing
//!
//! This module provides an in-memory implementation of
//! [`ClusterClientTrait`] that can be used in unit tests without a running
//! API server. Besides storing objects it mimics the server-side behaviour
//! the controller depends on:
//! - Services get a cluster IP assigned on creation
//! - the Deployment selector and the Service cluster IP are immutable
//! - stale `resourceVersion`s are rejected with a conflict
//!
//! Every call is recorded so tests can assert exactly which reads and writes
//! a reconcile performed, and any call can be made to fail.

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;
use crate::models::{DependentKind, DependentResource, ObjectKey};
use crds::MyApp;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A call made against the mock, as recorded in its call log.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MockCall {
    GetApp(ObjectKey),
    UpdateApp(ObjectKey),
    Get(DependentKind, ObjectKey),
    Create(DependentKind, ObjectKey),
    Update(DependentKind, ObjectKey),
}

impl MockCall {
    /// Returns true for calls that write to the store
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            MockCall::UpdateApp(_) | MockCall::Create(..) | MockCall::Update(..)
        )
    }
}

/// Mock ClusterClient for testing
#[derive(Clone, Default)]
pub struct MockClusterClient {
    apps: Arc<Mutex<HashMap<ObjectKey, MyApp>>>,
    deployments: Arc<Mutex<HashMap<ObjectKey, Deployment>>>,
    services: Arc<Mutex<HashMap<ObjectKey, Service>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    failures: Arc<Mutex<HashSet<MockCall>>>,
    // Counter for uids, resource versions and cluster IPs
    next_id: Arc<Mutex<u64>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn key_of(meta: &ObjectMeta) -> Result<ObjectKey, ClusterError> {
    match (&meta.namespace, &meta.name) {
        (Some(ns), Some(name)) => Ok(ObjectKey::new(ns.clone(), name.clone())),
        _ => Err(ClusterError::Invalid(
            "object metadata is missing name or namespace".to_string(),
        )),
    }
}

impl MockClusterClient {
    /// Create a new, empty mock client
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `MyApp` to the mock store (for test setup)
    ///
    /// The object is stored as-is; no call is recorded.
    pub fn add_app(&self, app: MyApp) {
        if let Ok(key) = key_of(&app.metadata) {
            lock(&self.apps).insert(key, app);
        }
    }

    /// Add a Deployment to the mock store (for test setup)
    pub fn add_deployment(&self, deployment: Deployment) {
        if let Ok(key) = key_of(&deployment.metadata) {
            lock(&self.deployments).insert(key, deployment);
        }
    }

    /// Add a Service to the mock store (for test setup)
    pub fn add_service(&self, service: Service) {
        if let Ok(key) = key_of(&service.metadata) {
            lock(&self.services).insert(key, service);
        }
    }

    /// Current stored `MyApp`
    pub fn app(&self, key: &ObjectKey) -> Option<MyApp> {
        lock(&self.apps).get(key).cloned()
    }

    /// Current stored Deployment
    pub fn deployment(&self, key: &ObjectKey) -> Option<Deployment> {
        lock(&self.deployments).get(key).cloned()
    }

    /// Current stored Service
    pub fn service(&self, key: &ObjectKey) -> Option<Service> {
        lock(&self.services).get(key).cloned()
    }

    /// All calls recorded so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Recorded calls that wrote to the store
    pub fn mutating_calls(&self) -> Vec<MockCall> {
        self.calls().into_iter().filter(MockCall::is_mutating).collect()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Make the given call fail with a 503 until [`Self::clear_failures`]
    ///
    /// Failed calls are still recorded; they do not touch the store.
    pub fn fail_on(&self, call: MockCall) {
        lock(&self.failures).insert(call);
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    fn record(&self, call: MockCall) -> Result<(), ClusterError> {
        let failing = lock(&self.failures).contains(&call);
        lock(&self.calls).push(call.clone());
        if failing {
            return Err(ClusterError::Api {
                code: 503,
                message: format!("injected failure for {:?}", call),
            });
        }
        Ok(())
    }

    fn next_id(&self) -> u64 {
        let mut id = lock(&self.next_id);
        *id += 1;
        *id
    }

    /// Assigns uid and resourceVersion like the API server does on create.
    fn stamp_created(&self, meta: &mut ObjectMeta) {
        let id = self.next_id();
        meta.uid = Some(format!("00000000-0000-0000-0000-{:012}", id));
        meta.resource_version = Some(id.to_string());
    }

    /// Checks optimistic concurrency and bumps resourceVersion on update.
    fn stamp_updated(
        &self,
        key: &ObjectKey,
        stored: &ObjectMeta,
        incoming: &mut ObjectMeta,
    ) -> Result<(), ClusterError> {
        if let Some(rv) = &incoming.resource_version {
            if stored.resource_version.as_ref() != Some(rv) {
                return Err(ClusterError::Conflict(format!(
                    "the object {} has been modified; please apply your changes to the latest version",
                    key
                )));
            }
        }
        incoming.uid = stored.uid.clone();
        incoming.resource_version = Some(self.next_id().to_string());
        Ok(())
    }

    fn create_deployment(&self, mut deployment: Deployment) -> Result<Deployment, ClusterError> {
        let key = key_of(&deployment.metadata)?;
        let mut store = lock(&self.deployments);
        if store.contains_key(&key) {
            return Err(ClusterError::Conflict(format!("deployments \"{}\" already exists", key.name)));
        }
        self.stamp_created(&mut deployment.metadata);
        store.insert(key, deployment.clone());
        Ok(deployment)
    }

    fn create_service(&self, mut service: Service) -> Result<Service, ClusterError> {
        let key = key_of(&service.metadata)?;
        let mut store = lock(&self.services);
        if store.contains_key(&key) {
            return Err(ClusterError::Conflict(format!("services \"{}\" already exists", key.name)));
        }
        self.stamp_created(&mut service.metadata);
        let ip = format!("10.96.0.{}", self.next_id() % 250 + 1);
        let spec = service.spec.get_or_insert_with(Default::default);
        spec.cluster_ip = Some(ip.clone());
        spec.cluster_ips = Some(vec![ip]);
        store.insert(key, service.clone());
        Ok(service)
    }

    fn update_deployment(&self, mut deployment: Deployment) -> Result<Deployment, ClusterError> {
        let key = key_of(&deployment.metadata)?;
        let mut store = lock(&self.deployments);
        let stored = store
            .get(&key)
            .ok_or_else(|| ClusterError::NotFound(format!("deployments \"{}\" not found", key.name)))?;
        let stored_selector = stored.spec.as_ref().map(|s| &s.selector);
        let new_selector = deployment.spec.as_ref().map(|s| &s.selector);
        if stored_selector != new_selector {
            return Err(ClusterError::Invalid(format!(
                "Deployment.apps \"{}\" is invalid: spec.selector: field is immutable",
                key.name
            )));
        }
        self.stamp_updated(&key, &stored.metadata, &mut deployment.metadata)?;
        store.insert(key, deployment.clone());
        Ok(deployment)
    }

    fn update_service(&self, mut service: Service) -> Result<Service, ClusterError> {
        let key = key_of(&service.metadata)?;
        let mut store = lock(&self.services);
        let stored = store
            .get(&key)
            .ok_or_else(|| ClusterError::NotFound(format!("services \"{}\" not found", key.name)))?;
        let stored_ip = stored.spec.as_ref().and_then(|s| s.cluster_ip.as_ref());
        let new_ip = service.spec.as_ref().and_then(|s| s.cluster_ip.as_ref());
        if stored_ip != new_ip {
            return Err(ClusterError::Invalid(format!(
                "Service \"{}\" is invalid: spec.clusterIPs[0]: Invalid value: field is immutable",
                key.name
            )));
        }
        self.stamp_updated(&key, &stored.metadata, &mut service.metadata)?;
        store.insert(key, service.clone());
        Ok(service)
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for MockClusterClient {
    async fn get_app(&self, key: &ObjectKey) -> Result<MyApp, ClusterError> {
        self.record(MockCall::GetApp(key.clone()))?;
        self.app(key)
            .ok_or_else(|| ClusterError::NotFound(format!("myapps.apps.microscaler.io \"{}\" not found", key.name)))
    }

    async fn update_app(&self, app: &MyApp) -> Result<MyApp, ClusterError> {
        let key = key_of(&app.metadata)?;
        self.record(MockCall::UpdateApp(key.clone()))?;
        let mut store = lock(&self.apps);
        let stored = store
            .get(&key)
            .ok_or_else(|| ClusterError::NotFound(format!("myapps.apps.microscaler.io \"{}\" not found", key.name)))?;
        let mut updated = app.clone();
        self.stamp_updated(&key, &stored.metadata, &mut updated.metadata)?;
        store.insert(key, updated.clone());
        Ok(updated)
    }

    async fn get_dependent(
        &self,
        kind: DependentKind,
        key: &ObjectKey,
    ) -> Result<DependentResource, ClusterError> {
        self.record(MockCall::Get(kind, key.clone()))?;
        let found = match kind {
            DependentKind::Workload => self.deployment(key).map(DependentResource::from),
            DependentKind::NetworkEndpoint => self.service(key).map(DependentResource::from),
        };
        found.ok_or_else(|| ClusterError::NotFound(format!("{} \"{}\" not found", kind, key.name)))
    }

    async fn create_dependent(
        &self,
        resource: &DependentResource,
    ) -> Result<DependentResource, ClusterError> {
        let key = key_of(resource.metadata())?;
        self.record(MockCall::Create(resource.kind(), key))?;
        match resource {
            DependentResource::Workload(d) => self.create_deployment(d.clone()).map(Into::into),
            DependentResource::NetworkEndpoint(s) => self.create_service(s.clone()).map(Into::into),
        }
    }

    async fn update_dependent(
        &self,
        resource: &DependentResource,
    ) -> Result<DependentResource, ClusterError> {
        let key = key_of(resource.metadata())?;
        self.record(MockCall::Update(resource.kind(), key))?;
        match resource {
            DependentResource::Workload(d) => self.update_deployment(d.clone()).map(Into::into),
            DependentResource::NetworkEndpoint(s) => self.update_service(s.clone()).map(Into::into),
        }
    }
}
