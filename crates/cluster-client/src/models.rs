//! Object identities and the closed set of dependent resource kinds.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use std::fmt;

/// Namespace-qualified object name.
///
/// The primary resource and both of its dependents share the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Builds the key from an object's metadata.
    ///
    /// Returns `None` when the object has no name or no namespace.
    pub fn from_resource<K: Resource>(obj: &K) -> Option<Self> {
        let meta = obj.meta();
        Some(Self::new(meta.namespace.clone()?, meta.name.clone()?))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Kinds of resources derived from a `MyApp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependentKind {
    /// `apps/v1 Deployment`
    Workload,
    /// `v1 Service`
    NetworkEndpoint,
}

impl DependentKind {
    /// All dependent kinds, in the order they are created and updated.
    pub const ALL: [DependentKind; 2] = [DependentKind::Workload, DependentKind::NetworkEndpoint];

    /// Kubernetes kind name
    pub fn as_str(self) -> &'static str {
        match self {
            DependentKind::Workload => "Deployment",
            DependentKind::NetworkEndpoint => "Service",
        }
    }
}

impl fmt::Display for DependentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dependent object of one of the [`DependentKind`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum DependentResource {
    Workload(Deployment),
    NetworkEndpoint(Service),
}

impl DependentResource {
    pub fn kind(&self) -> DependentKind {
        match self {
            DependentResource::Workload(_) => DependentKind::Workload,
            DependentResource::NetworkEndpoint(_) => DependentKind::NetworkEndpoint,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            DependentResource::Workload(d) => &d.metadata,
            DependentResource::NetworkEndpoint(s) => &s.metadata,
        }
    }

    /// Key of the object, if its metadata carries both name and namespace.
    pub fn key(&self) -> Option<ObjectKey> {
        match self {
            DependentResource::Workload(d) => ObjectKey::from_resource(d),
            DependentResource::NetworkEndpoint(s) => ObjectKey::from_resource(s),
        }
    }
}

impl From<Deployment> for DependentResource {
    fn from(d: Deployment) -> Self {
        DependentResource::Workload(d)
    }
}

impl From<Service> for DependentResource {
    fn from(s: Service) -> Self {
        DependentResource::NetworkEndpoint(s)
    }
}
