//! Controller configuration loaded from environment variables.

use crate::error::ControllerError;
use crate::reconciler::drift::MissingSnapshotPolicy;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings of the MyApp Controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Namespace to watch; `None` watches all namespaces
    pub namespace: Option<String>,
    /// Maximum number of reconciles running at once
    pub concurrency: u16,
    /// Quiet period after the last event before a reconcile starts
    pub debounce: Duration,
    /// First requeue delay after a failure, in minutes
    pub backoff_min_minutes: u64,
    /// Upper bound of the requeue delay, in minutes
    pub backoff_max_minutes: u64,
    /// Handling of a missing or undecodable applied-spec snapshot
    pub snapshot_policy: MissingSnapshotPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: None,
            concurrency: 3,
            debounce: Duration::from_secs(5),
            backoff_min_minutes: 1,
            backoff_max_minutes: 10,
            snapshot_policy: MissingSnapshotPolicy::Fail,
        }
    }
}

fn parse<T: FromStr>(name: &str, value: Option<String>, default: T) -> Result<T, ControllerError> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            ControllerError::InvalidConfig(format!("{} has an invalid value '{}'", name, raw))
        }),
    }
}

impl Config {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty());
        let concurrency = parse("RECONCILE_CONCURRENCY", lookup("RECONCILE_CONCURRENCY"), defaults.concurrency)?;
        let debounce_secs = parse(
            "RECONCILE_DEBOUNCE_SECS",
            lookup("RECONCILE_DEBOUNCE_SECS"),
            defaults.debounce.as_secs(),
        )?;
        let backoff_min_minutes = parse("BACKOFF_MIN_MINUTES", lookup("BACKOFF_MIN_MINUTES"), defaults.backoff_min_minutes)?;
        let backoff_max_minutes = parse("BACKOFF_MAX_MINUTES", lookup("BACKOFF_MAX_MINUTES"), defaults.backoff_max_minutes)?;
        let snapshot_policy = match lookup("MISSING_SNAPSHOT_POLICY") {
            Some(raw) => raw.parse()?,
            None => defaults.snapshot_policy,
        };

        if backoff_min_minutes == 0 || backoff_min_minutes > backoff_max_minutes {
            return Err(ControllerError::InvalidConfig(format!(
                "backoff bounds must satisfy 0 < min <= max, got min={} max={}",
                backoff_min_minutes, backoff_max_minutes
            )));
        }

        Ok(Self {
            namespace,
            concurrency,
            debounce: Duration::from_secs(debounce_secs),
            backoff_min_minutes,
            backoff_max_minutes,
            snapshot_policy,
        })
    }
}
