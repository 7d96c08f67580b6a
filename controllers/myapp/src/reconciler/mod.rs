//! Reconciliation logic for `MyApp` resources.
//!
//! One call to [`Reconciler::reconcile`] drives a single `MyApp` toward its
//! declaration:
//! 1. Fetch the `MyApp`; a missing or deleting object ends the reconcile
//! 2. Fetch the Deployment; if absent, create Deployment and Service (bootstrap)
//! 3. Otherwise compare the spec with the applied-spec snapshot and, on
//!    drift, update both dependents while keeping server-assigned fields
//! 4. Store the spec as the new snapshot
//!
//! The reconciler keeps no state between calls. Errors are returned as-is;
//! retrying is left to the caller.

pub mod apply;
pub mod drift;
pub mod fetch;
pub mod synthesize;

use crate::error::ControllerError;
use cluster_client::{ClusterClientTrait, DependentKind, DependentResource, ObjectKey};
use crds::MyApp;
use drift::MissingSnapshotPolicy;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use std::fmt;
use tracing::{debug, info};

/// Path a reconcile took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// `MyApp` not found or being deleted; nothing was touched
    Absent,
    /// Dependents were created
    Bootstrapped,
    /// Dependents existed; `drifted` tells whether they were rewritten
    Converged { drifted: bool },
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileOutcome::Absent => f.write_str("absent"),
            ReconcileOutcome::Bootstrapped => f.write_str("bootstrapped"),
            ReconcileOutcome::Converged { drifted: true } => f.write_str("converged (drift corrected)"),
            ReconcileOutcome::Converged { drifted: false } => f.write_str("converged (no drift)"),
        }
    }
}

/// Reconciles `MyApp` resources.
pub struct Reconciler {
    pub(crate) client: Box<dyn ClusterClientTrait + Send + Sync>,
    snapshot_policy: MissingSnapshotPolicy,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        client: Box<dyn ClusterClientTrait + Send + Sync>,
        snapshot_policy: MissingSnapshotPolicy,
    ) -> Self {
        Self {
            client,
            snapshot_policy,
        }
    }

    /// Reconciles the `MyApp` identified by `key`.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome, ControllerError> {
        let client = self.client.as_ref();

        let Some(app) = fetch::fetch_app(client, key).await? else {
            debug!("MyApp {} is gone, nothing to reconcile", key);
            return Ok(ReconcileOutcome::Absent);
        };
        if app.metadata.deletion_timestamp.is_some() {
            debug!("MyApp {} is being deleted, leaving dependents to garbage collection", key);
            return Ok(ReconcileOutcome::Absent);
        }

        info!("Reconciling MyApp {}", key);
        app.spec
            .validate()
            .map_err(|e| ControllerError::InvalidSpec(format!("{}: {}", key, e)))?;
        let owner = synthesize::owner_reference(&app)?;

        let outcome = match fetch::fetch_dependent(client, DependentKind::Workload, key).await? {
            None => {
                self.bootstrap(&app, key, &owner).await?;
                ReconcileOutcome::Bootstrapped
            }
            Some(live_workload) => {
                let drifted = drift::has_drifted(
                    &app.spec,
                    drift::snapshot_of(&app),
                    self.snapshot_policy,
                )?;
                if drifted {
                    info!("MyApp {} spec changed since last apply, updating dependents", key);
                    self.converge(&app, key, &owner, live_workload).await?;
                } else {
                    debug!("MyApp {} has no drift", key);
                }
                ReconcileOutcome::Converged { drifted }
            }
        };

        apply::persist_snapshot(client, app, key).await?;
        info!("MyApp {} {}", key, outcome);
        Ok(outcome)
    }

    async fn bootstrap(
        &self,
        app: &MyApp,
        key: &ObjectKey,
        owner: &OwnerReference,
    ) -> Result<(), ControllerError> {
        info!("Deployment {} not found, creating dependents", key);
        for kind in DependentKind::ALL {
            let desired = synthesize::synthesize(kind, &app.spec, key, owner);
            apply::create_dependent(self.client.as_ref(), &desired, key).await?;
        }
        Ok(())
    }

    async fn converge(
        &self,
        app: &MyApp,
        key: &ObjectKey,
        owner: &OwnerReference,
        live_workload: DependentResource,
    ) -> Result<(), ControllerError> {
        let client = self.client.as_ref();
        let mut live_workload = Some(live_workload);
        for kind in DependentKind::ALL {
            let desired = synthesize::synthesize(kind, &app.spec, key, owner);
            let live = match kind {
                DependentKind::Workload => live_workload.take(),
                DependentKind::NetworkEndpoint => fetch::fetch_dependent(client, kind, key).await?,
            };
            apply::converge_dependent(client, desired, live, key).await?;
        }
        Ok(())
    }
}
