//! Application layer module
//!
//! This module contains the fan-out executor and the reconciliation pipeline
//! that orchestrate the domain logic.

pub mod executor;
pub mod pipeline;

pub use executor::{ExecutorConfig, FanOutExecutor, RawResults};
pub use pipeline::{PipelineRequest, PipelineResponse, ReconciliationPipeline};
