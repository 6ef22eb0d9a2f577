//! amr-engine
//!
//! The classification pipeline: terminology normalization, gating, expert
//! rule evaluation, breakpoint interpretation, conflict resolution, and
//! decision assembly, driven against one immutable catalog snapshot per
//! request.
//!
//! Per-input problems become `Requires Review` decisions with explicit
//! reasons; only payload-level parse failures abort a request.

pub mod config;
pub mod engine;
pub mod error;

mod assemble;
mod breakpoint;
mod conflict;
mod expert;
mod gating;

pub use config::EngineConfig;
pub use engine::{ClassificationEngine, NormalizedInput};
pub use error::EngineError;
