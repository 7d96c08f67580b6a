//! Reads of the primary resource and its dependents.
//!
//! NotFound is an expected outcome here and becomes `Ok(None)`; every other
//! error is propagated so the reconcile aborts and is retried later.

use crate::error::ControllerError;
use cluster_client::{ClusterClientTrait, ClusterError, DependentKind, DependentResource, ObjectKey};
use crds::MyApp;
use tracing::{debug, error};

fn absent_on_not_found<T>(
    result: Result<T, ClusterError>,
    what: &str,
    key: &ObjectKey,
) -> Result<Option<T>, ControllerError> {
    match result {
        Ok(found) => Ok(Some(found)),
        Err(ClusterError::NotFound(_)) => {
            debug!("{} {} not found", what, key);
            Ok(None)
        }
        Err(e) => {
            error!("Failed to fetch {} {}: {}, will retry", what, key, e);
            Err(ControllerError::Cluster(e))
        }
    }
}

/// Fetches the `MyApp` with the given key.
pub async fn fetch_app(
    client: &dyn ClusterClientTrait,
    key: &ObjectKey,
) -> Result<Option<MyApp>, ControllerError> {
    absent_on_not_found(client.get_app(key).await, "MyApp", key)
}

/// Fetches the dependent of the given kind with the given key.
pub async fn fetch_dependent(
    client: &dyn ClusterClientTrait,
    kind: DependentKind,
    key: &ObjectKey,
) -> Result<Option<DependentResource>, ControllerError> {
    absent_on_not_found(client.get_dependent(kind, key).await, kind.as_str(), key)
}
