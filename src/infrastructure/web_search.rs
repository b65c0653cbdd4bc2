//! Web retrieval adapter.
//!
//! Queries the live shopping-search backend, normalizes hits into
//! `WebListing`s, and degrades to an empty result set on rate-limit
//! rejection, missing credentials, or transport failure. Successful
//! responses are cached by normalized query text alone; price and category
//! filters are applied by the caller afterwards, not here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::product::{WebListing, WebSearchRequest, WebSearchResponse};
use crate::infrastructure::cache::{CacheKeyBuilder, TtlCache};
use crate::infrastructure::rate_limiter::SlidingWindowRateLimiter;

/// Web retrieval boundary consumed by the fan-out executor.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, request: &WebSearchRequest) -> Result<WebSearchResponse>;
}

/// Configuration for the shopping-search HTTP client.
#[derive(Debug, Clone)]
pub struct WebSearchClientConfig {
    pub endpoint: String,
    /// Backend API key; `None` degrades every call to an empty result set
    pub api_key: Option<String>,
    pub engine: String,
    pub language: String,
    pub country: String,
    pub timeout: Duration,
}

impl Default for WebSearchClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://serpapi.com/search".to_string(),
            api_key: None,
            engine: "google_shopping".to_string(),
            language: "en".to_string(),
            country: "us".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Shopping-search client over a SerpAPI-style JSON endpoint.
pub struct ShoppingSearchClient {
    client: Client,
    config: WebSearchClientConfig,
    cache: Arc<TtlCache<WebSearchResponse>>,
    rate_limiter: Arc<SlidingWindowRateLimiter>,
}

impl ShoppingSearchClient {
    pub fn new(
        config: WebSearchClientConfig,
        cache: Arc<TtlCache<WebSearchResponse>>,
        rate_limiter: Arc<SlidingWindowRateLimiter>,
    ) -> Result<Self> {
        url::Url::parse(&config.endpoint)
            .map_err(|e| anyhow::anyhow!("invalid web search endpoint {}: {e}", config.endpoint))?;
        if config.api_key.is_none() {
            warn!("web search API key not set, web search will return no results");
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build web search HTTP client: {e}"))?;
        Ok(Self {
            client,
            config,
            cache,
            rate_limiter,
        })
    }

    fn cache_key(request: &WebSearchRequest) -> String {
        CacheKeyBuilder::new("web_search").query(&request.query).build()
    }

    async fn call_backend(&self, request: &WebSearchRequest, api_key: &str) -> Result<Vec<WebListing>> {
        let num = request.max_results.to_string();
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("engine", self.config.engine.as_str()),
                ("q", request.query.as_str()),
                ("api_key", api_key),
                ("num", num.as_str()),
                ("hl", self.config.language.as_str()),
                ("gl", self.config.country.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        anyhow::ensure!(status.is_success(), "shopping search returned {status}");

        let payload: ShoppingApiResponse = response.json().await?;
        Ok(payload
            .shopping_results
            .into_iter()
            .map(ShoppingItem::into_listing)
            .collect())
    }
}

#[async_trait]
impl WebSearch for ShoppingSearchClient {
    async fn search(&self, request: &WebSearchRequest) -> Result<WebSearchResponse> {
        let start = Instant::now();
        let key = Self::cache_key(request);

        if let Some(mut cached) = self.cache.get(&key).await {
            debug!(query = %request.query, "web cache hit");
            cached.cached = true;
            cached.query_time_ms = elapsed_ms(start);
            return Ok(cached);
        }
        debug!(query = %request.query, "web cache miss");

        if !self.rate_limiter.is_allowed() {
            warn!(query = %request.query, "web search rate limit exceeded");
            return Ok(WebSearchResponse::empty(0.0));
        }

        let Some(api_key) = self.config.api_key.as_deref() else {
            warn!("web search skipped: no API key configured");
            return Ok(WebSearchResponse::empty(elapsed_ms(start)));
        };

        let results = match self.call_backend(request, api_key).await {
            Ok(results) => {
                self.rate_limiter.record_call();
                results
            }
            Err(err) => {
                warn!(error = %err, query = %request.query, "web search failed, returning empty result");
                return Ok(WebSearchResponse::empty(elapsed_ms(start)));
            }
        };

        let response = WebSearchResponse {
            total_found: results.len(),
            results,
            cached: false,
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

#[derive(Debug, Default, Deserialize)]
struct ShoppingApiResponse {
    #[serde(default)]
    shopping_results: Vec<ShoppingItem>,
}

/// One raw hit as the provider reports it; everything is optional.
#[derive(Debug, Default, Deserialize)]
struct ShoppingItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    product_link: String,
    price: Option<String>,
    source: Option<String>,
    rating: Option<f64>,
    reviews: Option<u32>,
    delivery: Option<String>,
    thumbnail: Option<String>,
}

impl ShoppingItem {
    fn into_listing(self) -> WebListing {
        // Synthesize a snippet from whatever provider metadata is present
        let mut snippet_parts = Vec::new();
        if let Some(source) = &self.source {
            snippet_parts.push(format!("Available from {source}"));
        }
        if let Some(delivery) = &self.delivery {
            snippet_parts.push(delivery.clone());
        }
        if let (Some(rating), Some(reviews)) = (self.rating, self.reviews) {
            snippet_parts.push(format!("Rated {rating}/5 ({reviews} reviews)"));
        }

        WebListing {
            title: self.title,
            url: self.product_link,
            snippet: snippet_parts.join(" · "),
            price: self.price,
            source: self.source.unwrap_or_else(|| "Unknown".to_string()),
            rating: self.rating,
            reviews: self.reviews,
            thumbnail: self.thumbnail,
        }
    }
}
