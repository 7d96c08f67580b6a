//! MyApp CRD
//!
//! Declares a small application (image, replica count, ports) that the
//! controller expands into a `Deployment` and a `Service`.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Annotation holding the JSON form of the last successfully applied spec.
pub const APPLIED_SPEC_ANNOTATION: &str = "apps.microscaler.io/applied-spec";

/// Label key used for the selector shared by the Deployment and the Service.
pub const APP_LABEL: &str = "app";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "apps.microscaler.io",
    version = "v1",
    kind = "MyApp",
    namespaced,
    shortname = "myapp"
)]
#[serde(rename_all = "camelCase")]
pub struct MyAppSpec {
    /// Container image to run
    pub image: String,

    /// Number of workload replicas
    #[schemars(range(min = 0))]
    pub replica_count: i32,

    /// Port the container listens on
    #[schemars(range(min = 1, max = 65535))]
    pub container_port: i32,

    /// Port exposed by the Service
    #[schemars(range(min = 1, max = 65535))]
    pub service_port: i32,
}

/// Reasons a `MyAppSpec` cannot be turned into dependent resources.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecValidationError {
    /// Image reference is empty
    #[error("image must not be empty")]
    EmptyImage,

    /// Replica count below zero
    #[error("replicaCount must be >= 0, got {0}")]
    NegativeReplicas(i32),

    /// Port outside 1-65535
    #[error("{field} must be within 1-65535, got {value}")]
    PortOutOfRange {
        /// Offending field name
        field: &'static str,
        /// Offending value
        value: i32,
    },
}

impl MyAppSpec {
    /// Checks the bounds the CRD schema declares.
    ///
    /// The API server enforces the same bounds when the schema is installed,
    /// but objects written before the schema was tightened can still carry
    /// out-of-range values.
    pub fn validate(&self) -> Result<(), SpecValidationError> {
        if self.image.trim().is_empty() {
            return Err(SpecValidationError::EmptyImage);
        }
        if self.replica_count < 0 {
            return Err(SpecValidationError::NegativeReplicas(self.replica_count));
        }
        check_port("containerPort", self.container_port)?;
        check_port("servicePort", self.service_port)?;
        Ok(())
    }
}

fn check_port(field: &'static str, value: i32) -> Result<(), SpecValidationError> {
    if (1..=65535).contains(&value) {
        Ok(())
    } else {
        Err(SpecValidationError::PortOutOfRange { field, value })
    }
}
