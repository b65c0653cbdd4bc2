//! Catalog retrieval adapter.
//!
//! Embeds the query, runs a filtered similarity search over the private
//! catalog index, then applies a two-tier confidence filter: candidates past
//! the hard distance threshold are dropped as noise; candidates past the
//! softer threshold are kept but tallied as low confidence. When every
//! surviving candidate is low confidence the whole result set is discarded,
//! so a query outside the catalog's domain degrades to a web-only comparison
//! instead of a page of tenuous matches.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::product::{CatalogProduct, CatalogSearchRequest, CatalogSearchResponse};
use crate::infrastructure::cache::{CacheKeyBuilder, TtlCache};
use crate::infrastructure::embedding::QueryEmbedder;

/// Catalog retrieval boundary consumed by the fan-out executor.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn search(&self, request: &CatalogSearchRequest) -> Result<CatalogSearchResponse>;
}

/// One scored hit from the vector index, distance ascending from the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub doc_id: String,
    pub title: String,
    pub brand: Option<String>,
    pub price: f64,
    pub main_category: String,
    pub eco_friendly: bool,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub product_url: String,
    pub distance: f64,
}

/// Similarity query boundary over the catalog's vector store.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Returns up to `limit` hits ordered by distance ascending, restricted
    /// by the request's structured filters.
    async fn query(
        &self,
        embedding: &[f32],
        request: &CatalogSearchRequest,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>>;
}

/// Distance thresholds for the two-tier confidence filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSearchConfig {
    /// Candidates with distance above this are dropped outright
    pub hard_distance_threshold: f64,
    /// Candidates with distance above this are kept but counted low-confidence
    pub soft_distance_threshold: f64,
}

impl Default for CatalogSearchConfig {
    fn default() -> Self {
        Self {
            hard_distance_threshold: 1.3,
            soft_distance_threshold: 1.1,
        }
    }
}

/// Catalog adapter: embed, query, filter, cache.
pub struct CatalogSearchAdapter {
    embedder: Arc<dyn QueryEmbedder>,
    index: Arc<dyn VectorIndex>,
    cache: Arc<TtlCache<CatalogSearchResponse>>,
    config: CatalogSearchConfig,
}

impl CatalogSearchAdapter {
    pub fn new(
        embedder: Arc<dyn QueryEmbedder>,
        index: Arc<dyn VectorIndex>,
        cache: Arc<TtlCache<CatalogSearchResponse>>,
        config: CatalogSearchConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            cache,
            config,
        }
    }

    fn cache_key(request: &CatalogSearchRequest) -> String {
        CacheKeyBuilder::new("catalog_search")
            .query(&request.query)
            .opt_field("price_min", request.price_min)
            .opt_field("price_max", request.price_max)
            .opt_field("category", request.category.as_deref())
            .opt_field("eco", request.eco_friendly)
            .field("top_k", request.top_k)
            .build()
    }

    /// Applies the two-tier confidence filter and the all-or-nothing
    /// low-confidence suppression.
    fn filter_candidates(&self, hits: Vec<ScoredDocument>, top_k: usize) -> Vec<CatalogProduct> {
        let mut products = Vec::new();
        let mut low_confidence = 0usize;
        let mut filtered = 0usize;

        for hit in hits {
            if hit.distance > self.config.hard_distance_threshold {
                filtered += 1;
                debug!(title = %hit.title, distance = hit.distance, "dropped irrelevant candidate");
                continue;
            }
            if hit.distance > self.config.soft_distance_threshold {
                low_confidence += 1;
                debug!(title = %hit.title, distance = hit.distance, "low-confidence candidate");
            }

            let relevance = 1.0 - hit.distance;
            products.push(CatalogProduct {
                doc_id: hit.doc_id,
                title: hit.title,
                brand: hit.brand,
                price: hit.price,
                main_category: hit.main_category,
                eco_friendly: hit.eco_friendly,
                image_url: hit.image_url,
                product_url: hit.product_url,
                relevance_score: (relevance * 10_000.0).round() / 10_000.0,
            });

            if products.len() >= top_k {
                break;
            }
        }

        // A set made up entirely of low-confidence survivors means the query
        // likely falls outside the catalog's domain; discard it wholesale.
        if !products.is_empty() && low_confidence == products.len() {
            debug!(
                count = products.len(),
                "all candidates low-confidence, suppressing catalog result set"
            );
            return Vec::new();
        }

        if filtered > 0 {
            debug!(filtered, "hard filter removed irrelevant candidates");
        }
        products
    }
}

#[async_trait]
impl CatalogSearch for CatalogSearchAdapter {
    async fn search(&self, request: &CatalogSearchRequest) -> Result<CatalogSearchResponse> {
        let start = Instant::now();
        let key = Self::cache_key(request);

        if let Some(mut cached) = self.cache.get(&key).await {
            debug!(query = %request.query, "catalog cache hit");
            cached.query_time_ms = elapsed_ms(start);
            return Ok(cached);
        }
        debug!(query = %request.query, "catalog cache miss");

        let embedding = match self.embedder.embed(&request.query).await {
            Ok(vector) => vector,
            Err(err) => {
                warn!(error = %err, "query embedding failed, returning empty catalog result");
                return Ok(CatalogSearchResponse::empty(elapsed_ms(start)));
            }
        };

        // Overfetch so the confidence filter has headroom
        let hits = match self.index.query(&embedding, request, request.top_k * 2).await {
            Ok(hits) => hits,
            Err(err) => {
                warn!(error = %err, "vector index query failed, returning empty catalog result");
                return Ok(CatalogSearchResponse::empty(elapsed_ms(start)));
            }
        };

        let products = self.filter_candidates(hits, request.top_k);
        let response = CatalogSearchResponse {
            total_found: products.len(),
            results: products,
            query_time_ms: elapsed_ms(start),
        };
        self.cache.set(&key, response.clone()).await;
        Ok(response)
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    let ms = start.elapsed().as_secs_f64() * 1000.0;
    (ms * 100.0).round() / 100.0
}

/// Configuration for the REST vector index client.
#[derive(Debug, Clone)]
pub struct VectorIndexConfig {
    /// Base URL of the vector store, e.g. `http://localhost:6333`
    pub endpoint: String,
    pub collection: String,
    pub timeout: std::time::Duration,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:6333".to_string(),
            collection: "products".to_string(),
            timeout: std::time::Duration::from_secs(30),
        }
    }
}

/// Vector store client speaking a minimal REST search contract:
/// `POST {endpoint}/collections/{collection}/search` with the query vector,
/// result limit, and optional structured filters; the store answers with
/// scored documents, distance ascending.
pub struct HttpVectorIndex {
    client: Client,
    search_url: String,
}

impl HttpVectorIndex {
    pub fn new(config: VectorIndexConfig) -> Result<Self> {
        url::Url::parse(&config.endpoint)
            .with_context(|| format!("invalid vector index endpoint: {}", config.endpoint))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build vector index HTTP client")?;
        let search_url = format!(
            "{}/collections/{}/search",
            config.endpoint.trim_end_matches('/'),
            config.collection
        );
        Ok(Self { client, search_url })
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn query(
        &self,
        embedding: &[f32],
        request: &CatalogSearchRequest,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let body = VectorSearchBody {
            vector: embedding,
            limit,
            price_min: request.price_min,
            price_max: request.price_max,
            category: request.category.as_deref(),
            eco_friendly: request.eco_friendly,
        };
        let response = self
            .client
            .post(&self.search_url)
            .json(&body)
            .send()
            .await
            .context("vector index request failed")?;

        let status = response.status();
        anyhow::ensure!(status.is_success(), "vector index returned {status}");

        let parsed: VectorSearchResponse = response
            .json()
            .await
            .context("failed to parse vector index response")?;
        Ok(parsed.results)
    }
}

#[derive(Serialize)]
struct VectorSearchBody<'a> {
    vector: &'a [f32],
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    price_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    eco_friendly: Option<bool>,
}

#[derive(Deserialize)]
struct VectorSearchResponse {
    results: Vec<ScoredDocument>,
}
