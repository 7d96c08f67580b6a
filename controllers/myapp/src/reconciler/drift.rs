//! Drift detection against the applied-spec snapshot.
//!
//! The snapshot is the JSON form of the last `MyAppSpec` that was fully
//! converged, stored in the `apps.microscaler.io/applied-spec` annotation.
//! Comparison happens on the decoded, strongly typed spec, so field order
//! and whitespace in the annotation never count as drift.

use crate::error::ControllerError;
use crds::{MyApp, MyAppSpec, APPLIED_SPEC_ANNOTATION};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// What to do when the snapshot is absent or cannot be decoded.
///
/// This only arises after a partially failed bootstrap or a manual edit of
/// the annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingSnapshotPolicy {
    /// Abort the reconcile with an error and let the requeue policy retry
    #[default]
    Fail,
    /// Treat the resource as drifted and rewrite both dependents
    Resync,
}

impl FromStr for MissingSnapshotPolicy {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(MissingSnapshotPolicy::Fail),
            "resync" => Ok(MissingSnapshotPolicy::Resync),
            other => Err(ControllerError::InvalidConfig(format!(
                "unknown missing snapshot policy '{}', expected 'fail' or 'resync'",
                other
            ))),
        }
    }
}

impl fmt::Display for MissingSnapshotPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingSnapshotPolicy::Fail => f.write_str("fail"),
            MissingSnapshotPolicy::Resync => f.write_str("resync"),
        }
    }
}

/// Serializes a spec into its snapshot form.
pub fn encode_snapshot(spec: &MyAppSpec) -> Result<String, ControllerError> {
    serde_json::to_string(spec).map_err(ControllerError::Serialization)
}

/// Parses a snapshot back into a spec.
pub fn decode_snapshot(snapshot: &str) -> Result<MyAppSpec, ControllerError> {
    serde_json::from_str(snapshot).map_err(ControllerError::SnapshotDecode)
}

/// Raw snapshot annotation of a `MyApp`, if present.
pub fn snapshot_of(app: &MyApp) -> Option<&str> {
    app.metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(APPLIED_SPEC_ANNOTATION))
        .map(String::as_str)
}

/// Returns whether `current` differs from the spec recorded in `snapshot`.
///
/// An absent or undecodable snapshot is never "no drift": under
/// [`MissingSnapshotPolicy::Fail`] it is returned as an error, under
/// [`MissingSnapshotPolicy::Resync`] it counts as drift.
pub fn has_drifted(
    current: &MyAppSpec,
    snapshot: Option<&str>,
    policy: MissingSnapshotPolicy,
) -> Result<bool, ControllerError> {
    let decoded = match snapshot {
        Some(text) => decode_snapshot(text),
        None => Err(ControllerError::MissingSnapshot(format!(
            "annotation {} is not set",
            APPLIED_SPEC_ANNOTATION
        ))),
    };

    match (decoded, policy) {
        (Ok(applied), _) => Ok(applied != *current),
        (Err(e), MissingSnapshotPolicy::Fail) => Err(e),
        (Err(e), MissingSnapshotPolicy::Resync) => {
            warn!("Unusable applied-spec snapshot ({}), forcing full resync", e);
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> MyAppSpec {
        MyAppSpec {
            image: "app:v1".to_string(),
            replica_count: 2,
            container_port: 8080,
            service_port: 80,
        }
    }

    #[test]
    fn test_identical_snapshot_is_not_drift() {
        let snapshot = encode_snapshot(&spec()).unwrap();
        assert!(!has_drifted(&spec(), Some(&snapshot), MissingSnapshotPolicy::Fail).unwrap());
    }

    #[test]
    fn test_reordered_snapshot_is_not_drift() {
        let snapshot = r#"{ "servicePort": 80, "replicaCount": 2, "containerPort": 8080, "image": "app:v1" }"#;
        assert!(!has_drifted(&spec(), Some(snapshot), MissingSnapshotPolicy::Fail).unwrap());
    }

    #[test]
    fn test_each_field_change_is_drift() {
        let snapshot = encode_snapshot(&spec()).unwrap();
        let changed = [
            MyAppSpec { image: "app:v2".to_string(), ..spec() },
            MyAppSpec { replica_count: 5, ..spec() },
            MyAppSpec { container_port: 9090, ..spec() },
            MyAppSpec { service_port: 443, ..spec() },
        ];
        for current in changed {
            assert!(
                has_drifted(&current, Some(&snapshot), MissingSnapshotPolicy::Fail).unwrap(),
                "expected drift for {:?}",
                current
            );
        }
    }

    #[test]
    fn test_missing_snapshot_fails_by_default() {
        let err = has_drifted(&spec(), None, MissingSnapshotPolicy::default()).unwrap_err();
        assert!(matches!(err, ControllerError::MissingSnapshot(_)));
    }

    #[test]
    fn test_malformed_snapshot_fails() {
        let err = has_drifted(&spec(), Some("{not json"), MissingSnapshotPolicy::Fail).unwrap_err();
        assert!(matches!(err, ControllerError::SnapshotDecode(_)));

        // Well-formed JSON that is not a spec is just as unusable
        let err = has_drifted(&spec(), Some(r#"{"image":"app:v1"}"#), MissingSnapshotPolicy::Fail)
            .unwrap_err();
        assert!(matches!(err, ControllerError::SnapshotDecode(_)));
    }

    #[test]
    fn test_resync_policy_treats_unusable_snapshot_as_drift() {
        assert!(has_drifted(&spec(), None, MissingSnapshotPolicy::Resync).unwrap());
        assert!(has_drifted(&spec(), Some("garbage"), MissingSnapshotPolicy::Resync).unwrap());
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("fail".parse::<MissingSnapshotPolicy>().unwrap(), MissingSnapshotPolicy::Fail);
        assert_eq!(" Resync ".parse::<MissingSnapshotPolicy>().unwrap(), MissingSnapshotPolicy::Resync);
        assert!("ignore".parse::<MissingSnapshotPolicy>().is_err());
    }
}
