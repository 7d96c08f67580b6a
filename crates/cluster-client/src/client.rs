//! Kubernetes-backed cluster client

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;
use crate::models::{DependentKind, DependentResource, ObjectKey};
use crds::MyApp;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::api::PostParams;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

/// Cluster client talking to the Kubernetes API server.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn key_of<K: Resource>(obj: &K) -> Result<ObjectKey, ClusterError> {
    ObjectKey::from_resource(obj).ok_or_else(|| {
        ClusterError::Invalid("object metadata is missing name or namespace".to_string())
    })
}

async fn create<K>(api: Api<K>, obj: &K) -> Result<K, ClusterError>
where
    K: Resource + Clone + Debug + Serialize + DeserializeOwned,
{
    Ok(api.create(&PostParams::default(), obj).await?)
}

async fn replace<K>(api: Api<K>, name: &str, obj: &K) -> Result<K, ClusterError>
where
    K: Resource + Clone + Debug + Serialize + DeserializeOwned,
{
    Ok(api.replace(name, &PostParams::default(), obj).await?)
}

#[async_trait::async_trait]
impl ClusterClientTrait for KubeClusterClient {
    async fn get_app(&self, key: &ObjectKey) -> Result<MyApp, ClusterError> {
        debug!("GET MyApp {}", key);
        Ok(self.api::<MyApp>(&key.namespace).get(&key.name).await?)
    }

    async fn update_app(&self, app: &MyApp) -> Result<MyApp, ClusterError> {
        let key = key_of(app)?;
        debug!("PUT MyApp {}", key);
        replace(self.api::<MyApp>(&key.namespace), &key.name, app).await
    }

    async fn get_dependent(
        &self,
        kind: DependentKind,
        key: &ObjectKey,
    ) -> Result<DependentResource, ClusterError> {
        debug!("GET {} {}", kind, key);
        let resource = match kind {
            DependentKind::Workload => self
                .api::<Deployment>(&key.namespace)
                .get(&key.name)
                .await?
                .into(),
            DependentKind::NetworkEndpoint => self
                .api::<Service>(&key.namespace)
                .get(&key.name)
                .await?
                .into(),
        };
        Ok(resource)
    }

    async fn create_dependent(
        &self,
        resource: &DependentResource,
    ) -> Result<DependentResource, ClusterError> {
        let created = match resource {
            DependentResource::Workload(d) => {
                let key = key_of(d)?;
                debug!("POST Deployment {}", key);
                create(self.api::<Deployment>(&key.namespace), d).await?.into()
            }
            DependentResource::NetworkEndpoint(s) => {
                let key = key_of(s)?;
                debug!("POST Service {}", key);
                create(self.api::<Service>(&key.namespace), s).await?.into()
            }
        };
        Ok(created)
    }

    async fn update_dependent(
        &self,
        resource: &DependentResource,
    ) -> Result<DependentResource, ClusterError> {
        let updated = match resource {
            DependentResource::Workload(d) => {
                let key = key_of(d)?;
                debug!("PUT Deployment {}", key);
                replace(self.api::<Deployment>(&key.namespace), &key.name, d).await?.into()
            }
            DependentResource::NetworkEndpoint(s) => {
                let key = key_of(s)?;
                debug!("PUT Service {}", key);
                replace(self.api::<Service>(&key.namespace), &key.name, s).await?.into()
            }
        };
        Ok(updated)
    }
}
