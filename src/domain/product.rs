//! Product records produced by the two retrieval backends.
//!
//! `CatalogProduct` comes from the private catalog (vector similarity search),
//! `WebListing` from the live shopping-search backend. Both are created fresh
//! per query invocation and are read-only downstream.

use serde::{Deserialize, Serialize};

/// A product candidate returned by the private catalog backend.
///
/// `relevance_score` is derived from vector distance (1 - distance), in 0..=1,
/// higher meaning more similar to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    /// Unique identifier within a catalog snapshot
    pub doc_id: String,
    pub title: String,
    pub brand: Option<String>,
    pub price: f64,
    pub main_category: String,
    pub eco_friendly: bool,
    pub image_url: String,
    pub product_url: String,
    pub relevance_score: f64,
}

/// A listing returned by the live web shopping-search backend.
///
/// The price is kept as the provider-formatted string (e.g. "$19.99") and only
/// normalized to a number downstream, where a parse failure means "price
/// absent" rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebListing {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub price: Option<String>,
    /// Store/site name the listing was found on
    pub source: String,
    pub rating: Option<f64>,
    pub reviews: Option<u32>,
    pub thumbnail: Option<String>,
}

/// Structured constraints extracted upstream from the user query.
///
/// Produced by the planning collaborator; this core only consumes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryIntent {
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub category: Option<String>,
    pub eco_friendly: Option<bool>,
    /// Number of catalog candidates to request (defaults to 5 when absent)
    pub top_k: Option<usize>,
}

/// Request for the catalog retrieval adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSearchRequest {
    pub query: String,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub category: Option<String>,
    pub eco_friendly: Option<bool>,
    pub top_k: usize,
}

impl CatalogSearchRequest {
    /// Builds a catalog request from the user query and extracted intent.
    pub fn from_intent(query: &str, intent: &QueryIntent) -> Self {
        Self {
            query: query.to_string(),
            price_min: intent.price_min,
            price_max: intent.price_max,
            category: intent.category.clone(),
            eco_friendly: intent.eco_friendly,
            top_k: intent.top_k.unwrap_or(5),
        }
    }
}

/// Response from the catalog retrieval adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSearchResponse {
    pub results: Vec<CatalogProduct>,
    pub total_found: usize,
    pub query_time_ms: f64,
}

impl CatalogSearchResponse {
    /// An empty response, used on every degraded path.
    pub fn empty(query_time_ms: f64) -> Self {
        Self {
            results: Vec::new(),
            total_found: 0,
            query_time_ms,
        }
    }
}

/// Request for the web retrieval adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchRequest {
    pub query: String,
    pub max_results: usize,
}

/// Response from the web retrieval adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchResponse {
    pub results: Vec<WebListing>,
    pub total_found: usize,
    /// Whether this payload was served from the TTL cache
    pub cached: bool,
    pub query_time_ms: f64,
}

impl WebSearchResponse {
    /// An empty response, used on rate-limit rejection and backend failure.
    pub fn empty(query_time_ms: f64) -> Self {
        Self {
            results: Vec::new(),
            total_found: 0,
            cached: false,
            query_time_ms,
        }
    }
}
