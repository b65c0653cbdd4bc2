//! Reconciliation result types: matched pairs, price conflicts, and the
//! unified comparison table.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::product::{CatalogProduct, WebListing};

/// How confident the matcher is in a pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Composite score above 0.7 - brand and title both line up
    BrandTitle,
    /// Composite score in (0.5, 0.7] - plausible but partial overlap
    Partial,
}

/// A one-to-one pairing between a catalog product and a web listing.
///
/// Invariant: across the matcher's output no catalog product and no web
/// listing appears in more than one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub catalog_product: CatalogProduct,
    pub web_listing: WebListing,
    /// Composite similarity, always in (0.5, 1.0]
    pub similarity_score: f64,
    pub match_type: MatchType,
}

/// Discrepancy category tag. Price is the only divergence this core
/// adjudicates; the enum leaves room for the surrounding system to add more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    PriceDiscrepancy,
}

/// A single detected divergence between the two sources of a matched pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceDiscrepancy {
    #[serde(rename = "type")]
    pub kind: DiscrepancyKind,
    pub catalog_price: f64,
    pub web_price: f64,
    /// Absolute difference, rounded to cents
    pub difference: f64,
    /// Percentage difference relative to the catalog price, one decimal
    pub difference_pct: f64,
    pub message: String,
}

/// All discrepancies found for one matched pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub catalog_id: String,
    pub catalog_title: String,
    pub web_url: String,
    pub web_title: String,
    pub discrepancies: Vec<PriceDiscrepancy>,
}

/// Which backends contributed to a comparison row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowSource {
    Catalog,
    Web,
}

/// Fields shared by every comparison row variant.
///
/// Absent values stay `None` so a row always carries the full column set
/// regardless of which sources contributed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowFields {
    pub title: String,
    pub brand: Option<String>,
    pub catalog_price: Option<f64>,
    pub web_price: Option<f64>,
    pub catalog_id: Option<String>,
    pub web_url: Option<String>,
    pub web_source: Option<String>,
    pub image_url: Option<String>,
    pub product_url: Option<String>,
    pub eco_friendly: Option<bool>,
    pub rating: Option<f64>,
    pub reviews: Option<u32>,
    pub sources: Vec<RowSource>,
}

/// One row of the unified comparison table.
///
/// The union of variants partitions the input sets exactly: every catalog
/// product and every web listing lands in exactly one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComparisonRow {
    /// Found in both sources
    Matched {
        #[serde(flatten)]
        fields: RowFields,
        match_confidence: f64,
        has_conflict: bool,
    },
    /// Only present in the private catalog
    CatalogOnly {
        #[serde(flatten)]
        fields: RowFields,
    },
    /// Only present in the live web results
    WebOnly {
        #[serde(flatten)]
        fields: RowFields,
    },
}

impl ComparisonRow {
    pub fn fields(&self) -> &RowFields {
        match self {
            Self::Matched { fields, .. } | Self::CatalogOnly { fields } | Self::WebOnly { fields } => fields,
        }
    }

    pub fn title(&self) -> &str {
        &self.fields().title
    }

    pub fn catalog_price(&self) -> Option<f64> {
        self.fields().catalog_price
    }

    pub fn web_price(&self) -> Option<f64> {
        self.fields().web_price
    }

    pub fn has_conflict(&self) -> bool {
        matches!(self, Self::Matched { has_conflict: true, .. })
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// Extracts a numeric price from a provider-formatted string like "$1,299.99".
///
/// Strips everything except digits and the decimal point before parsing. A
/// string that still fails to parse (empty, multiple dots) reports `None` -
/// price absent, never an error.
pub fn extract_price(price_str: Option<&str>) -> Option<f64> {
    static NON_PRICE: OnceLock<Regex> = OnceLock::new();
    let raw = price_str?;
    let re = NON_PRICE.get_or_init(|| Regex::new(r"[^\d.]").expect("static pattern"));
    let cleaned = re.replace_all(raw, "");
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_price_handles_provider_formats() {
        assert_eq!(extract_price(Some("$12.99")), Some(12.99));
        assert_eq!(extract_price(Some("12.99")), Some(12.99));
        assert_eq!(extract_price(Some("$1,299.50")), Some(1299.50));
        assert_eq!(extract_price(Some("USD 45")), Some(45.0));
    }

    #[test]
    fn extract_price_reports_absent_on_garbage() {
        assert_eq!(extract_price(None), None);
        assert_eq!(extract_price(Some("")), None);
        assert_eq!(extract_price(Some("call for price")), None);
        // Two decimal points survive the strip but fail the parse
        assert_eq!(extract_price(Some("$1.2.3")), None);
    }

    #[test]
    fn comparison_row_serializes_with_type_tag() {
        let row = ComparisonRow::CatalogOnly {
            fields: RowFields {
                title: "Wooden Puzzle".to_string(),
                catalog_price: Some(12.99),
                sources: vec![RowSource::Catalog],
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["type"], "catalog_only");
        assert_eq!(json["title"], "Wooden Puzzle");
        assert_eq!(json["sources"][0], "catalog");
    }
}
