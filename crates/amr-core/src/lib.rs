//! amr-core
//!
//! Pure domain types for antimicrobial susceptibility classification.
//! No I/O and no service dependencies — this is the shared vocabulary of the
//! AMR engine workspace.

pub mod context;
pub mod error;
pub mod models;
pub mod problem;
