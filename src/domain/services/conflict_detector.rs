//! Price conflict detection over matched pairs.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::comparison::{Conflict, DiscrepancyKind, MatchedPair, PriceDiscrepancy, extract_price};

/// Divergence thresholds. A price difference is a conflict when it exceeds
/// either bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictConfig {
    /// Absolute difference bound in dollars
    pub absolute_threshold: f64,
    /// Percentage difference bound relative to the catalog price
    pub percent_threshold: f64,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            absolute_threshold: 5.0,
            percent_threshold: 20.0,
        }
    }
}

/// Flags statistically significant price divergence between the two sources
/// of a matched pair.
#[derive(Debug, Clone, Default)]
pub struct ConflictDetector {
    config: ConflictConfig,
}

impl ConflictDetector {
    pub fn new(config: ConflictConfig) -> Self {
        Self { config }
    }

    /// Checks every pair; pairs without a resolvable web price or without a
    /// significant divergence yield nothing.
    pub fn detect(&self, pairs: &[MatchedPair]) -> Vec<Conflict> {
        pairs.iter().filter_map(|pair| self.detect_for_pair(pair)).collect()
    }

    /// Checks a single pair for price divergence.
    pub fn detect_for_pair(&self, pair: &MatchedPair) -> Option<Conflict> {
        let catalog_price = pair.catalog_product.price;
        let web_price = extract_price(pair.web_listing.price.as_deref())?;

        let difference = (catalog_price - web_price).abs();
        let difference_pct = if catalog_price > 0.0 {
            (difference / catalog_price) * 100.0
        } else {
            0.0
        };

        if difference <= self.config.absolute_threshold && difference_pct <= self.config.percent_threshold {
            return None;
        }

        let rounded_diff = (difference * 100.0).round() / 100.0;
        let rounded_pct = (difference_pct * 10.0).round() / 10.0;
        debug!(
            doc_id = %pair.catalog_product.doc_id,
            catalog_price,
            web_price,
            difference_pct = rounded_pct,
            "price discrepancy detected"
        );

        Some(Conflict {
            catalog_id: pair.catalog_product.doc_id.clone(),
            catalog_title: pair.catalog_product.title.clone(),
            web_url: pair.web_listing.url.clone(),
            web_title: pair.web_listing.title.clone(),
            discrepancies: vec![PriceDiscrepancy {
                kind: DiscrepancyKind::PriceDiscrepancy,
                catalog_price,
                web_price,
                difference: rounded_diff,
                difference_pct: rounded_pct,
                message: format!(
                    "Catalog shows ${catalog_price:.2}, web shows ${web_price:.2} ({difference_pct:.1}% difference)"
                ),
            }],
        })
    }
}
