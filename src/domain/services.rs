//! Domain services for the reconciliation layer.
//!
//! Each service is a small, explicitly constructed unit so tests can wire
//! them with non-default thresholds.

pub mod comparison_builder;
pub mod conflict_detector;
pub mod matcher;

pub use comparison_builder::ComparisonBuilder;
pub use conflict_detector::{ConflictConfig, ConflictDetector};
pub use matcher::{MatchingConfig, ProductMatcher};
