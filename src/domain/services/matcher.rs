//! Bipartite product matcher.
//!
//! Pairs catalog products with web listings using a weighted combination of
//! brand and title similarity. Candidate scoring runs in parallel across
//! catalog products; claims on listings resolve sequentially in catalog input
//! order, so the earlier catalog product wins a contested listing and later
//! products fall back to their best unclaimed alternative. Given the same
//! input order the pairing is fully deterministic.

use std::collections::HashSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::comparison::{MatchType, MatchedPair};
use crate::domain::product::{CatalogProduct, WebListing};

/// Common corporate suffixes stripped from brand names before comparison.
const BRAND_SUFFIXES: [&str; 5] = ["inc", "llc", "corp", "company", "co"];

/// Words that carry no matching signal in product titles.
const TITLE_STOPWORDS: [&str; 7] = ["the", "a", "an", "for", "with", "and", "or"];

/// Matcher weights and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// A candidate is accepted only with a composite score strictly above this
    pub accept_threshold: f64,
    /// Scores above this are tagged `brand_title` instead of `partial`
    pub high_confidence_threshold: f64,
    pub brand_weight: f64,
    pub title_weight: f64,
    /// Flat bonus when the catalog brand occurs verbatim in the snippet
    pub snippet_bonus: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.5,
            high_confidence_threshold: 0.7,
            brand_weight: 0.4,
            title_weight: 0.6,
            snippet_bonus: 0.2,
        }
    }
}

/// Computes the best one-to-one pairing between catalog products and web
/// listings.
#[derive(Debug, Clone, Default)]
pub struct ProductMatcher {
    config: MatchingConfig,
}

impl ProductMatcher {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    /// Matches catalog products against web listings.
    ///
    /// Returns at most one pair per catalog product and at most one pair per
    /// web listing.
    pub fn match_products(
        &self,
        catalog: &[CatalogProduct],
        listings: &[WebListing],
    ) -> Vec<MatchedPair> {
        if catalog.is_empty() || listings.is_empty() {
            return Vec::new();
        }

        // Score every (product, listing) combination in parallel. Each entry
        // holds the accepted candidates for one catalog product, best first.
        let ranked: Vec<Vec<(usize, f64)>> = catalog
            .par_iter()
            .map(|product| self.rank_candidates(product, listings))
            .collect();

        let mut claimed: HashSet<usize> = HashSet::new();
        let mut pairs = Vec::new();

        for (product, candidates) in catalog.iter().zip(ranked) {
            let best = candidates
                .into_iter()
                .find(|(listing_idx, _)| !claimed.contains(listing_idx));
            let Some((listing_idx, score)) = best else {
                continue;
            };
            claimed.insert(listing_idx);

            let match_type = if score > self.config.high_confidence_threshold {
                MatchType::BrandTitle
            } else {
                MatchType::Partial
            };
            let rounded = (score * 1000.0).round() / 1000.0;
            debug!(
                doc_id = %product.doc_id,
                listing = %listings[listing_idx].url,
                score = rounded,
                "matched catalog product to web listing"
            );
            pairs.push(MatchedPair {
                catalog_product: product.clone(),
                web_listing: listings[listing_idx].clone(),
                similarity_score: rounded,
                match_type,
            });
        }

        pairs
    }

    /// Scores all listings for one product and returns those above the accept
    /// threshold, sorted best first (ties broken toward the earlier listing).
    fn rank_candidates(&self, product: &CatalogProduct, listings: &[WebListing]) -> Vec<(usize, f64)> {
        let brand_norm = normalize_brand(product.brand.as_deref().unwrap_or(""));
        let title_norm = normalize_title(&product.title);

        let mut candidates: Vec<(usize, f64)> = listings
            .iter()
            .enumerate()
            .filter_map(|(idx, listing)| {
                let score = self.score_listing(&brand_norm, &title_norm, listing);
                (score > self.config.accept_threshold).then_some((idx, score))
            })
            .collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        candidates
    }

    fn score_listing(&self, brand_norm: &str, title_norm: &str, listing: &WebListing) -> f64 {
        let web_title = normalize_title(&listing.title);
        // Brand is rarely a separate field on web listings; the leading title
        // words are the usual place it appears.
        let web_brand_candidate: String = web_title
            .split_whitespace()
            .take(3)
            .collect::<Vec<_>>()
            .join(" ");

        let brand_sim = if brand_norm.is_empty() {
            0.0
        } else {
            similarity(brand_norm, &web_brand_candidate)
        };
        let title_sim = similarity(title_norm, &web_title);

        let mut combined = self.config.brand_weight * brand_sim + self.config.title_weight * title_sim;
        if !brand_norm.is_empty() && listing.snippet.to_lowercase().contains(brand_norm) {
            combined = (combined + self.config.snippet_bonus).min(1.0);
        }
        combined
    }
}

/// Normalizes a brand name: lowercase, trimmed, corporate suffixes removed.
fn normalize_brand(brand: &str) -> String {
    let mut normalized = brand.to_lowercase().trim().to_string();
    for word in BRAND_SUFFIXES {
        normalized = normalized
            .replace(&format!(" {word}"), "")
            .replace(&format!(".{word}"), "");
    }
    normalized
}

/// Normalizes a product title: lowercase, stopwords removed, single spaces.
fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .filter(|w| !TITLE_STOPWORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized string similarity in 0..=1 based on Levenshtein distance.
fn similarity(s1: &str, s2: &str) -> f64 {
    let len1 = s1.chars().count();
    let len2 = s2.chars().count();

    if len1 == 0 && len2 == 0 {
        return 1.0;
    }
    if len1 == 0 || len2 == 0 {
        return 0.0;
    }

    let max_len = len1.max(len2) as f64;
    let distance = levenshtein_distance(s1, s2) as f64;

    1.0 - (distance / max_len)
}

fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let chars1: Vec<char> = s1.chars().collect();
    let chars2: Vec<char> = s2.chars().collect();
    let len1 = chars1.len();
    let len2 = chars2.len();

    let mut matrix = vec![vec![0; len2 + 1]; len1 + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=len2 {
        matrix[0][j] = j;
    }

    for i in 1..=len1 {
        for j in 1..=len2 {
            let cost = if chars1[i - 1] == chars2[j - 1] { 0 } else { 1 };
            matrix[i][j] = std::cmp::min(
                std::cmp::min(
                    matrix[i - 1][j] + 1, // deletion
                    matrix[i][j - 1] + 1, // insertion
                ),
                matrix[i - 1][j - 1] + cost, // substitution
            );
        }
    }

    matrix[len1][len2]
}
