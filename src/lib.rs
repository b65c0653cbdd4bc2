//! Price Scout - Catalog/Web Product Price Reconciliation Engine
//!
//! This crate retrieves product records from two disjoint sources - a private
//! vector-searchable catalog and a live web shopping search - matches them into
//! a unified comparison view, and flags price discrepancies between sources.

// Module declarations
pub mod domain;
pub mod application;
pub mod infrastructure;

// Re-export the main entry points for easier access
pub use application::executor::{ExecutorConfig, FanOutExecutor, RawResults};
pub use application::pipeline::{PipelineRequest, PipelineResponse, ReconciliationPipeline};
pub use domain::product::QueryIntent;
