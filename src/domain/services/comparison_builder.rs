//! Builds the unified comparison table.
//!
//! Row order is deterministic: matched rows first (in match order), then
//! catalog-only rows (catalog input order), then web-only rows (web input
//! order).

use std::collections::{HashMap, HashSet};

use crate::domain::comparison::{ComparisonRow, Conflict, MatchedPair, RowFields, RowSource, extract_price};
use crate::domain::product::{CatalogProduct, WebListing};

/// Merges matched pairs and both leftover sets into one ordered row list.
///
/// Partition invariant: every catalog product and every web listing appears
/// in exactly one row.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComparisonBuilder;

impl ComparisonBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(
        &self,
        catalog: &[CatalogProduct],
        listings: &[WebListing],
        pairs: &[MatchedPair],
        conflicts: &[Conflict],
    ) -> Vec<ComparisonRow> {
        let conflicted_ids: HashSet<&str> = conflicts.iter().map(|c| c.catalog_id.as_str()).collect();

        let mut rows = Vec::with_capacity(catalog.len() + listings.len());

        for pair in pairs {
            let catalog_product = &pair.catalog_product;
            let listing = &pair.web_listing;
            rows.push(ComparisonRow::Matched {
                fields: RowFields {
                    title: catalog_product.title.clone(),
                    brand: catalog_product.brand.clone(),
                    catalog_price: Some(catalog_product.price),
                    web_price: extract_price(listing.price.as_deref()),
                    catalog_id: Some(catalog_product.doc_id.clone()),
                    web_url: Some(listing.url.clone()),
                    web_source: Some(listing.source.clone()),
                    // Prefer the catalog image for matched rows
                    image_url: Some(catalog_product.image_url.clone()),
                    product_url: Some(catalog_product.product_url.clone()),
                    eco_friendly: Some(catalog_product.eco_friendly),
                    rating: listing.rating,
                    reviews: listing.reviews,
                    sources: vec![RowSource::Catalog, RowSource::Web],
                },
                match_confidence: pair.similarity_score,
                has_conflict: conflicted_ids.contains(catalog_product.doc_id.as_str()),
            });
        }

        let matched_ids: HashSet<&str> = pairs
            .iter()
            .map(|p| p.catalog_product.doc_id.as_str())
            .collect();
        for product in catalog {
            if matched_ids.contains(product.doc_id.as_str()) {
                continue;
            }
            rows.push(ComparisonRow::CatalogOnly {
                fields: RowFields {
                    title: product.title.clone(),
                    brand: product.brand.clone(),
                    catalog_price: Some(product.price),
                    catalog_id: Some(product.doc_id.clone()),
                    image_url: Some(product.image_url.clone()),
                    product_url: Some(product.product_url.clone()),
                    eco_friendly: Some(product.eco_friendly),
                    sources: vec![RowSource::Catalog],
                    ..Default::default()
                },
            });
        }

        // Listings are identified by URL, which is not guaranteed unique in
        // the merged web set; consume one occurrence per matched pair so
        // duplicates still land in exactly one row each.
        let mut matched_urls: HashMap<&str, usize> = HashMap::new();
        for pair in pairs {
            *matched_urls.entry(pair.web_listing.url.as_str()).or_insert(0) += 1;
        }
        for listing in listings {
            if let Some(remaining) = matched_urls.get_mut(listing.url.as_str()) {
                if *remaining > 0 {
                    *remaining -= 1;
                    continue;
                }
            }
            rows.push(ComparisonRow::WebOnly {
                fields: RowFields {
                    title: listing.title.clone(),
                    web_price: extract_price(listing.price.as_deref()),
                    web_url: Some(listing.url.clone()),
                    web_source: Some(listing.source.clone()),
                    image_url: listing.thumbnail.clone(),
                    product_url: Some(listing.url.clone()),
                    rating: listing.rating,
                    reviews: listing.reviews,
                    sources: vec![RowSource::Web],
                    ..Default::default()
                },
            });
        }

        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::comparison::MatchType;
    use proptest::prelude::*;

    fn product(doc_id: &str, title: &str, price: f64) -> CatalogProduct {
        CatalogProduct {
            doc_id: doc_id.to_string(),
            title: title.to_string(),
            brand: Some("Plan Toys".to_string()),
            price,
            main_category: "Toys".to_string(),
            eco_friendly: true,
            image_url: format!("https://img.example/{doc_id}.jpg"),
            product_url: format!("https://catalog.example/{doc_id}"),
            relevance_score: 0.9,
        }
    }

    fn listing(title: &str, url: &str, price: Option<&str>) -> WebListing {
        WebListing {
            title: title.to_string(),
            url: url.to_string(),
            snippet: String::new(),
            price: price.map(str::to_string),
            source: "shop.example".to_string(),
            rating: Some(4.5),
            reviews: Some(120),
            thumbnail: Some("https://img.example/thumb.jpg".to_string()),
        }
    }

    fn pair(p: &CatalogProduct, l: &WebListing) -> MatchedPair {
        MatchedPair {
            catalog_product: p.clone(),
            web_listing: l.clone(),
            similarity_score: 0.8,
            match_type: MatchType::BrandTitle,
        }
    }

    #[test]
    fn rows_are_ordered_matched_then_catalog_then_web() {
        let catalog = vec![product("doc_1", "Puzzle", 10.0), product("doc_2", "Blocks", 15.0)];
        let listings = vec![
            listing("Puzzle", "https://a", Some("$11.00")),
            listing("Train Set", "https://b", Some("$30.00")),
        ];
        let pairs = vec![pair(&catalog[0], &listings[0])];

        let rows = ComparisonBuilder::new().build(&catalog, &listings, &pairs, &[]);
        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_matched());
        assert!(matches!(rows[1], ComparisonRow::CatalogOnly { .. }));
        assert!(matches!(rows[2], ComparisonRow::WebOnly { .. }));
    }

    #[test]
    fn matched_row_takes_catalog_image_and_web_rating() {
        let catalog = vec![product("doc_1", "Puzzle", 10.0)];
        let listings = vec![listing("Puzzle", "https://a", Some("$11.00"))];
        let pairs = vec![pair(&catalog[0], &listings[0])];

        let rows = ComparisonBuilder::new().build(&catalog, &listings, &pairs, &[]);
        let fields = rows[0].fields();
        assert_eq!(fields.image_url.as_deref(), Some("https://img.example/doc_1.jpg"));
        assert_eq!(fields.rating, Some(4.5));
        assert_eq!(fields.reviews, Some(120));
        assert_eq!(fields.web_price, Some(11.0));
    }

    #[test]
    fn web_only_row_uses_thumbnail_and_listing_url() {
        let listings = vec![listing("Train Set", "https://b", None)];
        let rows = ComparisonBuilder::new().build(&[], &listings, &[], &[]);
        let fields = rows[0].fields();
        assert_eq!(fields.image_url.as_deref(), Some("https://img.example/thumb.jpg"));
        assert_eq!(fields.product_url.as_deref(), Some("https://b"));
        assert_eq!(fields.web_price, None);
        assert_eq!(fields.catalog_price, None);
    }

    #[test]
    fn conflict_flag_set_only_for_flagged_pairs() {
        let catalog = vec![product("doc_1", "Puzzle", 10.0)];
        let listings = vec![listing("Puzzle", "https://a", Some("$25.00"))];
        let pairs = vec![pair(&catalog[0], &listings[0])];
        let conflicts = vec![Conflict {
            catalog_id: "doc_1".to_string(),
            catalog_title: "Puzzle".to_string(),
            web_url: "https://a".to_string(),
            web_title: "Puzzle".to_string(),
            discrepancies: Vec::new(),
        }];

        let rows = ComparisonBuilder::new().build(&catalog, &listings, &pairs, &conflicts);
        assert!(rows[0].has_conflict());

        let rows = ComparisonBuilder::new().build(&catalog, &listings, &pairs, &[]);
        assert!(!rows[0].has_conflict());
    }

    #[test]
    fn duplicate_listing_urls_still_partition() {
        let catalog = vec![product("doc_1", "Puzzle", 10.0)];
        let listings = vec![
            listing("Puzzle", "https://same", Some("$11.00")),
            listing("Puzzle (other seller)", "https://same", Some("$12.00")),
        ];
        let pairs = vec![pair(&catalog[0], &listings[0])];

        let rows = ComparisonBuilder::new().build(&catalog, &listings, &pairs, &[]);
        // One matched row consumes one occurrence; the duplicate URL keeps
        // its own web_only row.
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_matched());
        assert!(matches!(rows[1], ComparisonRow::WebOnly { .. }));
    }

    proptest! {
        // Partition invariant: every catalog product and every web listing
        // lands in exactly one row, matched rows one-to-one.
        #[test]
        fn partition_invariant_holds(
            catalog_count in 0usize..6,
            listing_count in 0usize..6,
            match_seed in 0usize..5,
        ) {
            let catalog: Vec<_> = (0..catalog_count)
                .map(|i| product(&format!("doc_{i}"), &format!("Product {i}"), 10.0 + i as f64))
                .collect();
            let listings: Vec<_> = (0..listing_count)
                .map(|i| listing(&format!("Listing {i}"), &format!("https://l/{i}"), Some("$10.00")))
                .collect();

            // Deterministically pair up a prefix of both sets
            let pair_count = match_seed.min(catalog_count).min(listing_count);
            let pairs: Vec<_> = (0..pair_count)
                .map(|i| pair(&catalog[i], &listings[i]))
                .collect();

            let rows = ComparisonBuilder::new().build(&catalog, &listings, &pairs, &[]);
            prop_assert_eq!(rows.len(), catalog_count + listing_count - pair_count);

            let matched = rows.iter().filter(|r| r.is_matched()).count();
            prop_assert_eq!(matched, pair_count);

            // No catalog id or listing URL appears twice across rows
            let mut seen_ids = std::collections::HashSet::new();
            let mut seen_urls = std::collections::HashSet::new();
            for row in &rows {
                if let Some(id) = &row.fields().catalog_id {
                    prop_assert!(seen_ids.insert(id.clone()));
                }
                if let Some(url) = &row.fields().web_url {
                    prop_assert!(seen_urls.insert(url.clone()));
                }
            }
        }
    }
}
