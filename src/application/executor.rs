//! Fan-out executor.
//!
//! Produces one unified raw result set per query: a single catalog call, then
//! a bounded concurrent burst of per-title web probes plus one general
//! alternatives query. A failed or timed-out probe contributes zero listings
//! and never aborts the others; the only wait is the join on the dispatched
//! set.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::domain::comparison::extract_price;
use crate::domain::product::{
    CatalogProduct, CatalogSearchRequest, QueryIntent, WebListing, WebSearchRequest,
};
use crate::infrastructure::catalog_search::CatalogSearch;
use crate::infrastructure::web_search::WebSearch;

/// Fan-out tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Maximum number of per-title web probes
    pub max_probes: usize,
    /// Concurrent probe limit
    pub probe_concurrency: usize,
    /// Fixed delay before each probe call, independent of the minute-window
    /// rate limiter, to respect the provider's burst limits
    pub probe_delay_ms: u64,
    /// Probe queries are truncated to this many characters
    pub probe_title_max_chars: usize,
    pub probe_max_results: usize,
    pub alternatives_max_results: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_probes: 5,
            probe_concurrency: 5,
            probe_delay_ms: 500,
            probe_title_max_chars: 60,
            probe_max_results: 3,
            alternatives_max_results: 5,
        }
    }
}

/// The merged output of one fan-out round.
#[derive(Debug, Clone, Default)]
pub struct RawResults {
    pub catalog_products: Vec<CatalogProduct>,
    pub web_listings: Vec<WebListing>,
}

/// Orchestrates the parallel catalog and web retrieval calls.
pub struct FanOutExecutor {
    catalog: Arc<dyn CatalogSearch>,
    web: Arc<dyn WebSearch>,
    config: ExecutorConfig,
}

impl FanOutExecutor {
    pub fn new(catalog: Arc<dyn CatalogSearch>, web: Arc<dyn WebSearch>, config: ExecutorConfig) -> Self {
        Self {
            catalog,
            web,
            config,
        }
    }

    /// Runs the full fan-out for one query.
    ///
    /// Every failure path degrades to fewer results; this method itself never
    /// fails.
    pub async fn execute(&self, query: &str, intent: &QueryIntent) -> RawResults {
        let catalog_request = CatalogSearchRequest::from_intent(query, intent);
        let catalog_products = match self.catalog.search(&catalog_request).await {
            Ok(response) => {
                debug!(count = response.results.len(), "catalog search returned");
                response.results
            }
            Err(err) => {
                warn!(error = %err, "catalog search failed, continuing web-only");
                Vec::new()
            }
        };

        let mut merged = self.probe_titles(&catalog_products).await;
        merged.extend(self.search_alternatives(query, intent).await);

        // Deduplicate across probes by listing URL, first occurrence wins
        let mut seen = HashSet::new();
        merged.retain(|listing| listing.url.is_empty() || seen.insert(listing.url.clone()));

        let before = merged.len();
        merged.retain(|listing| within_price_window(listing, intent));
        if merged.len() < before {
            debug!(dropped = before - merged.len(), "price window filtered listings");
        }

        RawResults {
            catalog_products,
            web_listings: merged,
        }
    }

    /// Issues one truncated title probe per top catalog candidate, bounded by
    /// the configured concurrency, each preceded by a fixed delay.
    async fn probe_titles(&self, catalog_products: &[CatalogProduct]) -> Vec<WebListing> {
        if catalog_products.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.config.probe_concurrency.max(1)));
        let delay = Duration::from_millis(self.config.probe_delay_ms);
        let mut tasks = Vec::new();

        for product in catalog_products.iter().take(self.config.max_probes) {
            let web = Arc::clone(&self.web);
            let permit = Arc::clone(&semaphore);
            let request = WebSearchRequest {
                query: truncate_chars(&product.title, self.config.probe_title_max_chars),
                max_results: self.config.probe_max_results,
            };

            let task = tokio::spawn(async move {
                let _permit = permit
                    .acquire_owned()
                    .await
                    .map_err(|_| anyhow!("probe semaphore closed"))?;
                tokio::time::sleep(delay).await;
                web.search(&request).await
            });
            tasks.push(task);
        }

        let results = futures::future::join_all(tasks).await;
        let mut listings = Vec::new();
        for result in results {
            match result {
                Ok(Ok(response)) => listings.extend(response.results),
                Ok(Err(err)) => warn!(error = %err, "title probe failed"),
                Err(err) => warn!(error = %err, "title probe task failed"),
            }
        }
        listings
    }

    /// One general query past the top candidates, eco-augmented on request.
    async fn search_alternatives(&self, query: &str, intent: &QueryIntent) -> Vec<WebListing> {
        let alternatives_query = if intent.eco_friendly == Some(true) {
            format!("eco-friendly {query}")
        } else {
            query.to_string()
        };
        let request = WebSearchRequest {
            query: alternatives_query,
            max_results: self.config.alternatives_max_results,
        };
        match self.web.search(&request).await {
            Ok(response) => response.results,
            Err(err) => {
                warn!(error = %err, "alternatives search failed");
                Vec::new()
            }
        }
    }
}

/// Truncates on a character boundary and drops a trailing partial word space.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect::<String>().trim_end().to_string()
}

/// A listing with an unparseable price stays in; price absent is not price
/// out of range.
fn within_price_window(listing: &WebListing, intent: &QueryIntent) -> bool {
    let Some(price) = extract_price(listing.price.as_deref()) else {
        return true;
    };
    if let Some(min) = intent.price_min {
        if price < min {
            return false;
        }
    }
    if let Some(max) = intent.price_max {
        if price > max {
            return false;
        }
    }
    true
}
