//! Kubernetes resource watchers.
//!
//! This module drives [`Reconciler`] from `kube_runtime::Controller`, which
//! supplies the keys to reconcile, guarantees that a key is never reconciled
//! twice at the same time, and re-runs failed reconciles after the delay the
//! error policy returns.

use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use cluster_client::ObjectKey;
use crds::MyApp;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::Api;
use kube_runtime::{controller::{Action, Config as ControllerConfig}, watcher, Controller};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Shared state handed to every reconcile by the controller runtime.
pub struct Context {
    reconciler: Reconciler,
    backoff_min_minutes: u64,
    backoff_max_minutes: u64,
    /// Requeue backoff per MyApp (namespace/name -> backoff)
    backoff_states: Mutex<HashMap<ObjectKey, FibonacciBackoff>>,
}

impl Context {
    pub fn new(reconciler: Reconciler, backoff_min_minutes: u64, backoff_max_minutes: u64) -> Self {
        Self {
            reconciler,
            backoff_min_minutes,
            backoff_max_minutes,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    fn backoff_states(&self) -> MutexGuard<'_, HashMap<ObjectKey, FibonacciBackoff>> {
        self.backoff_states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Next requeue delay for a failing key.
    fn next_backoff(&self, key: &ObjectKey) -> Duration {
        self.backoff_states()
            .entry(key.clone())
            .or_insert_with(|| FibonacciBackoff::new(self.backoff_min_minutes, self.backoff_max_minutes))
            .next_backoff()
    }

    /// Forgets the failure history of a key after a successful reconcile.
    fn reset_backoff(&self, key: &ObjectKey) {
        self.backoff_states().remove(key);
    }
}

fn key_of(app: &MyApp) -> Result<ObjectKey, ControllerError> {
    ObjectKey::from_resource(app)
        .ok_or_else(|| ControllerError::MissingMetadata("MyApp event without name or namespace".to_string()))
}

async fn reconcile(app: Arc<MyApp>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let key = key_of(&app)?;
    debug!("Reconcile triggered for MyApp {}", key);

    let outcome = ctx.reconciler.reconcile(&key).await?;
    ctx.reset_backoff(&key);
    debug!("MyApp {} reconciled: {}", key, outcome);
    Ok(Action::await_change())
}

fn error_policy(app: Arc<MyApp>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    match key_of(&app) {
        Ok(key) => {
            let delay = ctx.next_backoff(&key);
            error!("Reconciliation error for MyApp {}: {}, retrying in {}s", key, error, delay.as_secs());
            Action::requeue(delay)
        }
        Err(e) => {
            error!("Reconciliation error for unidentifiable MyApp: {} ({})", error, e);
            Action::await_change()
        }
    }
}

/// Watches `MyApp` objects and the Deployments and Services they own.
///
/// Runs until the process receives SIGINT/SIGTERM; in-flight reconciles are
/// dropped at their next await point.
pub async fn watch_my_apps(
    apps: Api<MyApp>,
    deployments: Api<Deployment>,
    services: Api<Service>,
    ctx: Arc<Context>,
    controller_config: ControllerConfig,
) -> Result<(), ControllerError> {
    info!("Starting MyApp watcher");

    Controller::new(apps, watcher::Config::default())
        .owns(deployments, watcher::Config::default())
        .owns(services, watcher::Config::default())
        .with_config(controller_config)
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!("Reconciled {}", obj),
                Err(e) => warn!("Controller error: {}", e),
            }
        })
        .await;

    info!("MyApp watcher stopped");
    Ok(())
}
