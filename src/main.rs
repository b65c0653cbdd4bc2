//! Command-line front end: runs one query through the reconciliation
//! pipeline against the configured backends and prints the comparison table.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use price_scout::application::executor::FanOutExecutor;
use price_scout::application::pipeline::{PipelineRequest, ReconciliationPipeline};
use price_scout::domain::comparison::ComparisonRow;
use price_scout::domain::product::QueryIntent;
use price_scout::domain::services::conflict_detector::ConflictDetector;
use price_scout::domain::services::matcher::ProductMatcher;
use price_scout::infrastructure::cache::TtlCache;
use price_scout::infrastructure::catalog_search::{CatalogSearchAdapter, HttpVectorIndex, VectorIndexConfig};
use price_scout::infrastructure::config::ConfigManager;
use price_scout::infrastructure::embedding::{EmbeddingClientConfig, HttpEmbeddingClient};
use price_scout::infrastructure::logging::init_logging;
use price_scout::infrastructure::rate_limiter::SlidingWindowRateLimiter;
use price_scout::infrastructure::web_search::{ShoppingSearchClient, WebSearchClientConfig};

#[derive(Parser, Debug)]
#[command(name = "price-scout", about = "Compare catalog and live web prices for a product query")]
struct Cli {
    /// Product query, e.g. "eco-friendly wooden puzzles"
    query: String,

    /// Minimum price filter in dollars
    #[arg(long)]
    price_min: Option<f64>,

    /// Maximum price filter in dollars
    #[arg(long)]
    price_max: Option<f64>,

    /// Catalog category filter
    #[arg(long)]
    category: Option<String>,

    /// Restrict to eco-friendly products
    #[arg(long)]
    eco_friendly: bool,

    /// Number of catalog candidates to retrieve
    #[arg(long, default_value_t = 5)]
    top_k: usize,

    /// Path to a JSON config file (defaults to the per-user location)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    let manager = match cli.config.clone() {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let config = manager.load_config().await?;

    let ttl = Duration::from_secs(config.cache.ttl_seconds);
    let catalog_cache = Arc::new(TtlCache::new(ttl));
    let web_cache = Arc::new(TtlCache::new(ttl));
    let rate_limiter = Arc::new(SlidingWindowRateLimiter::new(config.rate_limit.max_calls_per_minute));

    let embedding_api_key = std::env::var(&config.catalog.embedding_api_key_env)
        .with_context(|| format!("{} not set", config.catalog.embedding_api_key_env))?;
    let embedder = HttpEmbeddingClient::new(EmbeddingClientConfig {
        base_url: config.catalog.embedding_base_url.clone(),
        model: config.catalog.embedding_model.clone(),
        api_key: embedding_api_key,
        timeout: Duration::from_secs(config.catalog.timeout_seconds),
        max_retries: config.catalog.embedding_max_retries,
    })?;
    let index = HttpVectorIndex::new(VectorIndexConfig {
        endpoint: config.catalog.index_endpoint.clone(),
        collection: config.catalog.collection.clone(),
        timeout: Duration::from_secs(config.catalog.timeout_seconds),
    })?;
    let catalog = Arc::new(CatalogSearchAdapter::new(
        Arc::new(embedder),
        Arc::new(index),
        catalog_cache,
        config.catalog.thresholds.clone(),
    ));

    let web = Arc::new(ShoppingSearchClient::new(
        WebSearchClientConfig {
            endpoint: config.web.endpoint.clone(),
            api_key: std::env::var(&config.web.api_key_env).ok(),
            engine: config.web.engine.clone(),
            language: config.web.language.clone(),
            country: config.web.country.clone(),
            timeout: Duration::from_secs(config.web.timeout_seconds),
        },
        web_cache,
        rate_limiter,
    )?);

    let executor = FanOutExecutor::new(catalog, web, config.executor.clone());
    let pipeline = ReconciliationPipeline::new(
        executor,
        ProductMatcher::new(config.matching.clone()),
        ConflictDetector::new(config.conflicts.clone()),
    );

    let request = PipelineRequest {
        user_query: cli.query.clone(),
        intent: QueryIntent {
            price_min: cli.price_min,
            price_max: cli.price_max,
            category: cli.category.clone(),
            eco_friendly: cli.eco_friendly.then_some(true),
            top_k: Some(cli.top_k),
        },
    };
    let response = pipeline.run(&request).await;

    print_comparison(&response.comparison_table);
    if !response.conflicts.is_empty() {
        println!("\nPrice conflicts:");
        for conflict in &response.conflicts {
            for discrepancy in &conflict.discrepancies {
                println!("  {} - {}", conflict.catalog_title, discrepancy.message);
            }
        }
    }

    Ok(())
}

fn print_comparison(rows: &[ComparisonRow]) {
    if rows.is_empty() {
        println!("No results from either source.");
        return;
    }

    println!("{:<40} {:>10} {:>10}  {}", "Title", "Catalog $", "Web $", "Sources");
    println!("{}", "-".repeat(76));
    for row in rows {
        let fields = row.fields();
        let title: String = fields.title.chars().take(38).collect();
        let catalog_price = fields
            .catalog_price
            .map_or_else(|| "-".to_string(), |p| format!("{p:.2}"));
        let web_price = fields
            .web_price
            .map_or_else(|| "-".to_string(), |p| format!("{p:.2}"));
        let sources = fields
            .sources
            .iter()
            .map(|s| format!("{s:?}").to_lowercase())
            .collect::<Vec<_>>()
            .join(", ");
        let marker = if row.has_conflict() { " !" } else { "" };
        println!("{title:<40} {catalog_price:>10} {web_price:>10}  {sources}{marker}");
    }
}
