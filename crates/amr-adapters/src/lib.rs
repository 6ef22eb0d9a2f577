//! amr-adapters
//!
//! Reduces the three supported payload shapes — FHIR R4 bundles and
//! observations, HL7 v2 ORU messages, and the native JSON wire form — to a
//! uniform sequence of classification inputs, and groups organism and
//! phenotype context with the susceptibility rows of the same specimen.
//!
//! Adapters never classify and never reject unknown coded values; they
//! surface raw designators for terminology normalization.

pub mod detect;
pub mod error;
pub mod fhir;
pub mod group;
pub mod hl7v2;
pub mod native;

pub use detect::{detect_format, parse_payload, InputFormat};
pub use error::AdapterError;
pub use group::group_inputs;
