//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the Kubernetes
//! client, the reconciler and the `MyApp` watcher together.

use crate::config::Config;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::{watch_my_apps, Context};
use cluster_client::KubeClusterClient;
use crds::MyApp;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};
use kube_runtime::controller::Config as ControllerConfig;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for MyApp management.
pub struct Controller {
    my_app_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts watching in the background.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing MyApp Controller");

        let kube_client = Client::try_default().await?;

        let (apps, deployments, services): (Api<MyApp>, Api<Deployment>, Api<Service>) =
            match config.namespace.as_deref() {
                Some(ns) => (
                    Api::namespaced(kube_client.clone(), ns),
                    Api::namespaced(kube_client.clone(), ns),
                    Api::namespaced(kube_client.clone(), ns),
                ),
                None => (
                    Api::all(kube_client.clone()),
                    Api::all(kube_client.clone()),
                    Api::all(kube_client.clone()),
                ),
            };

        let reconciler = Reconciler::new(
            Box::new(KubeClusterClient::new(kube_client)),
            config.snapshot_policy,
        );
        let ctx = Arc::new(Context::new(
            reconciler,
            config.backoff_min_minutes,
            config.backoff_max_minutes,
        ));
        let controller_config = ControllerConfig::default()
            .debounce(config.debounce)
            .concurrency(config.concurrency);

        let my_app_watcher = tokio::spawn(async move {
            watch_my_apps(apps, deployments, services, ctx, controller_config).await
        });

        Ok(Self { my_app_watcher })
    }

    /// Runs the controller until shutdown.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("MyApp Controller running");

        self.my_app_watcher
            .await
            .map_err(|e| ControllerError::Watch(format!("MyApp watcher panicked: {}", e)))?
            .map_err(|e| ControllerError::Watch(format!("MyApp watcher error: {}", e)))
    }
}
