//! Pipeline tests over stubbed retrieval backends: degraded paths, caching,
//! and the full fan-out + reconciliation round trip.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;

use price_scout::application::executor::{ExecutorConfig, FanOutExecutor};
use price_scout::application::pipeline::{PipelineRequest, ReconciliationPipeline};
use price_scout::domain::product::{
    CatalogProduct, CatalogSearchRequest, CatalogSearchResponse, QueryIntent, WebListing,
    WebSearchRequest, WebSearchResponse,
};
use price_scout::domain::services::conflict_detector::ConflictDetector;
use price_scout::domain::services::matcher::ProductMatcher;
use price_scout::infrastructure::cache::TtlCache;
use price_scout::infrastructure::catalog_search::{
    CatalogSearch, CatalogSearchAdapter, CatalogSearchConfig, ScoredDocument, VectorIndex,
};
use price_scout::infrastructure::embedding::QueryEmbedder;
use price_scout::infrastructure::web_search::WebSearch;

struct StubCatalog {
    products: Vec<CatalogProduct>,
    fail: bool,
    calls: AtomicUsize,
}

impl StubCatalog {
    fn with_products(products: Vec<CatalogProduct>) -> Arc<Self> {
        Arc::new(Self {
            products,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            products: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CatalogSearch for StubCatalog {
    async fn search(&self, _request: &CatalogSearchRequest) -> Result<CatalogSearchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("catalog backend unavailable");
        }
        Ok(CatalogSearchResponse {
            results: self.products.clone(),
            total_found: self.products.len(),
            query_time_ms: 1.0,
        })
    }
}

struct StubWeb {
    listings: Vec<WebListing>,
    calls: AtomicUsize,
}

impl StubWeb {
    fn with_listings(listings: Vec<WebListing>) -> Arc<Self> {
        Arc::new(Self {
            listings,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl WebSearch for StubWeb {
    async fn search(&self, _request: &WebSearchRequest) -> Result<WebSearchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(WebSearchResponse {
            results: self.listings.clone(),
            total_found: self.listings.len(),
            cached: false,
            query_time_ms: 1.0,
        })
    }
}

fn catalog_product(doc_id: &str, title: &str, brand: &str, price: f64) -> CatalogProduct {
    CatalogProduct {
        doc_id: doc_id.to_string(),
        title: title.to_string(),
        brand: Some(brand.to_string()),
        price,
        main_category: "Toys".to_string(),
        eco_friendly: true,
        image_url: String::new(),
        product_url: String::new(),
        relevance_score: 0.9,
    }
}

fn web_listing(title: &str, url: &str, snippet: &str, price: &str) -> WebListing {
    WebListing {
        title: title.to_string(),
        url: url.to_string(),
        snippet: snippet.to_string(),
        price: Some(price.to_string()),
        source: "shop.example".to_string(),
        rating: Some(4.2),
        reviews: Some(57),
        thumbnail: None,
    }
}

fn pipeline(catalog: Arc<dyn CatalogSearch>, web: Arc<dyn WebSearch>) -> ReconciliationPipeline {
    let executor = FanOutExecutor::new(
        catalog,
        web,
        ExecutorConfig {
            probe_delay_ms: 0,
            ..Default::default()
        },
    );
    ReconciliationPipeline::new(executor, ProductMatcher::default(), ConflictDetector::default())
}

fn request(query: &str) -> PipelineRequest {
    PipelineRequest {
        user_query: query.to_string(),
        intent: QueryIntent::default(),
    }
}

#[tokio::test]
async fn happy_path_matches_and_builds_table() {
    let catalog = StubCatalog::with_products(vec![
        catalog_product("doc_1", "Wooden Jigsaw Puzzle", "Plan Toys", 12.99),
        catalog_product("doc_2", "Metal Train Set", "Brio", 30.0),
    ]);
    let web = StubWeb::with_listings(vec![web_listing(
        "Wooden Jigsaw Puzzle",
        "https://shop.example/puzzle",
        "Plan Toys wooden jigsaw puzzle",
        "$25.00",
    )]);
    let pipeline = pipeline(catalog, web);

    let response = pipeline.run(&request("wooden puzzle")).await;

    assert_eq!(response.catalog_results.len(), 2);
    assert_eq!(response.web_results.len(), 1);
    assert_eq!(response.matched_products.len(), 1);
    // 12.99 vs 25.00 is far past both conflict bounds
    assert_eq!(response.conflicts.len(), 1);
    assert_eq!(response.comparison_table.len(), 2);
    assert!(response.comparison_table[0].is_matched());
    assert!(response.comparison_table[0].has_conflict());
}

#[tokio::test]
async fn catalog_failure_yields_web_only_table() {
    let catalog = StubCatalog::failing();
    let web = StubWeb::with_listings(vec![web_listing(
        "Wooden Puzzle",
        "https://shop.example/puzzle",
        "",
        "$10.00",
    )]);
    let pipeline = pipeline(catalog, web);

    let response = pipeline.run(&request("wooden puzzle")).await;

    assert!(response.catalog_results.is_empty());
    assert!(response.matched_products.is_empty());
    assert!(response.conflicts.is_empty());
    assert_eq!(response.comparison_table.len(), 1);
    assert!(!response.comparison_table[0].is_matched());
}

#[tokio::test]
async fn both_sources_empty_yields_empty_table() {
    let catalog = StubCatalog::with_products(Vec::new());
    let web = StubWeb::with_listings(Vec::new());
    let pipeline = pipeline(catalog, web);

    let response = pipeline.run(&request("anything")).await;

    assert!(response.comparison_table.is_empty());
    assert!(response.matched_products.is_empty());
    assert!(response.conflicts.is_empty());
}

#[tokio::test]
async fn web_empty_skips_matcher_and_keeps_catalog_rows() {
    let catalog = StubCatalog::with_products(vec![
        catalog_product("doc_1", "Wooden Puzzle", "Plan Toys", 10.0),
        catalog_product("doc_2", "Train Set", "Brio", 20.0),
    ]);
    let web = StubWeb::with_listings(Vec::new());
    let pipeline = pipeline(catalog, web);

    let response = pipeline.run(&request("wooden toys")).await;

    assert_eq!(response.comparison_table.len(), 2);
    assert!(response.comparison_table.iter().all(|row| !row.is_matched()));
}

// Catalog suppression through the real adapter: every index hit lands between
// the soft and hard thresholds, so the adapter discards the set and the
// pipeline falls back to a web-only table.

struct FixedEmbedder;

#[async_trait]
impl QueryEmbedder for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.0; 8])
    }
}

struct LowConfidenceIndex;

#[async_trait]
impl VectorIndex for LowConfidenceIndex {
    async fn query(
        &self,
        _embedding: &[f32],
        _request: &CatalogSearchRequest,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>> {
        Ok((0..limit.min(4))
            .map(|i| ScoredDocument {
                doc_id: format!("doc_{i}"),
                title: format!("Tenuous match {i}"),
                brand: None,
                price: 9.99,
                main_category: "Misc".to_string(),
                eco_friendly: false,
                image_url: String::new(),
                product_url: String::new(),
                distance: 1.2,
            })
            .collect())
    }
}

#[tokio::test]
async fn low_confidence_catalog_falls_back_to_web_only() {
    let adapter = Arc::new(CatalogSearchAdapter::new(
        Arc::new(FixedEmbedder),
        Arc::new(LowConfidenceIndex),
        Arc::new(TtlCache::default()),
        CatalogSearchConfig::default(),
    ));
    let web = StubWeb::with_listings(vec![web_listing(
        "Kitchen Degreaser Spray",
        "https://shop.example/degreaser",
        "",
        "$8.99",
    )]);
    let pipeline = pipeline(adapter, Arc::clone(&web) as Arc<dyn WebSearch>);

    let response = pipeline.run(&request("kitchen degreaser")).await;

    assert!(response.catalog_results.is_empty());
    assert_eq!(response.comparison_table.len(), 1);
    assert!(!response.comparison_table[0].is_matched());
    // With no catalog candidates only the alternatives query went out
    assert_eq!(web.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fan_out_issues_bounded_probe_burst() {
    let catalog = StubCatalog::with_products(
        (0..8)
            .map(|i| catalog_product(&format!("doc_{i}"), &format!("Distinct Product Number {i}"), "Brand", 10.0))
            .collect(),
    );
    let web = StubWeb::with_listings(Vec::new());
    let pipeline = pipeline(catalog, Arc::clone(&web) as Arc<dyn WebSearch>);

    pipeline.run(&request("products")).await;

    // 5 title probes (bounded) + 1 alternatives call
    assert_eq!(web.calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn response_carries_correlation_metadata() {
    let catalog = StubCatalog::with_products(Vec::new());
    let web = StubWeb::with_listings(Vec::new());
    let pipeline = pipeline(catalog, web);

    let first = pipeline.run(&request("anything")).await;
    let second = pipeline.run(&request("anything")).await;
    assert_ne!(first.query_id, second.query_id);
    assert!(first.generated_at <= second.generated_at);
}
