//! Reconciliation pipeline entry point.
//!
//! Wires the fan-out executor to the matcher, conflict detector, and
//! comparison builder. Consumes the upstream planner's query + intent and
//! produces the envelope the downstream synthesis collaborator reads. Every
//! degraded-data path still yields a structurally valid (possibly empty)
//! comparison table.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::application::executor::FanOutExecutor;
use crate::domain::comparison::{ComparisonRow, Conflict, MatchedPair};
use crate::domain::product::{CatalogProduct, QueryIntent, WebListing};
use crate::domain::services::comparison_builder::ComparisonBuilder;
use crate::domain::services::conflict_detector::ConflictDetector;
use crate::domain::services::matcher::ProductMatcher;

/// One pipeline invocation, as handed over by the planning collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub user_query: String,
    #[serde(default)]
    pub intent: QueryIntent,
}

/// Everything the downstream synthesis collaborator consumes.
///
/// `query_id` and `generated_at` exist for log correlation only; nothing is
/// persisted across invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResponse {
    pub query_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub catalog_results: Vec<CatalogProduct>,
    pub web_results: Vec<WebListing>,
    pub matched_products: Vec<MatchedPair>,
    pub conflicts: Vec<Conflict>,
    pub comparison_table: Vec<ComparisonRow>,
}

/// Fan-out + reconciliation, composed from explicitly injected parts.
pub struct ReconciliationPipeline {
    executor: FanOutExecutor,
    matcher: ProductMatcher,
    conflict_detector: ConflictDetector,
    builder: ComparisonBuilder,
}

impl ReconciliationPipeline {
    pub fn new(
        executor: FanOutExecutor,
        matcher: ProductMatcher,
        conflict_detector: ConflictDetector,
    ) -> Self {
        Self {
            executor,
            matcher,
            conflict_detector,
            builder: ComparisonBuilder::new(),
        }
    }

    /// Runs one query end to end. Never fails; degraded backends shrink the
    /// result instead.
    pub async fn run(&self, request: &PipelineRequest) -> PipelineResponse {
        let query_id = Uuid::new_v4();
        let started = Instant::now();
        info!(%query_id, query = %request.user_query, "starting reconciliation pipeline");

        let raw = self.executor.execute(&request.user_query, &request.intent).await;

        let (matched_products, conflicts) =
            if raw.catalog_products.is_empty() || raw.web_listings.is_empty() {
                info!(
                    %query_id,
                    catalog = raw.catalog_products.len(),
                    web = raw.web_listings.len(),
                    "one source empty, skipping matcher"
                );
                (Vec::new(), Vec::new())
            } else {
                let pairs = self.matcher.match_products(&raw.catalog_products, &raw.web_listings);
                let conflicts = self.conflict_detector.detect(&pairs);
                (pairs, conflicts)
            };

        let comparison_table = self.builder.build(
            &raw.catalog_products,
            &raw.web_listings,
            &matched_products,
            &conflicts,
        );

        info!(
            %query_id,
            matched = matched_products.len(),
            conflicts = conflicts.len(),
            rows = comparison_table.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "reconciliation complete"
        );

        PipelineResponse {
            query_id,
            generated_at: Utc::now(),
            catalog_results: raw.catalog_products,
            web_results: raw.web_listings,
            matched_products,
            conflicts,
            comparison_table,
        }
    }
}
