//! MyApp CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the MyApp controller.

pub mod my_app;

pub use my_app::*;
