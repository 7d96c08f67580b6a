//! MyApp Controller
//!
//! Keeps a Deployment and a Service in line with every `MyApp` resource.
//!
//! The controller records the spec it last applied in an annotation on the
//! `MyApp` and only rewrites the dependents when the spec moves away from
//! that snapshot, keeping the Deployment selector and the Service ClusterIP
//! untouched.

mod backoff;
mod config;
mod controller;
mod error;
mod reconciler;
mod watcher;
#[cfg(test)]
mod test_utils;

use crate::config::Config;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // kube is built with rustls; pick ring as the process-wide crypto provider
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider already installed");
    }

    info!("Starting MyApp Controller");

    let config = Config::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Concurrency: {}", config.concurrency);
    info!("  Debounce: {}s", config.debounce.as_secs());
    info!("  Backoff: {}m - {}m", config.backoff_min_minutes, config.backoff_max_minutes);
    info!("  Missing snapshot policy: {}", config.snapshot_policy);

    // Initialize and run controller
    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
