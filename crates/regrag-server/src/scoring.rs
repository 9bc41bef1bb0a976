/// Confidence scoring over retrieval results.
///
/// Confidence is the mean of per-result contributions `score * weight`, clamped to [0, 1].
/// A result's weight starts at 1.0 and is multiplied by the primary-source weight and the
/// recent-document weight for each quality predicate it satisfies.
use std::sync::Arc;

use serde::Serialize;

use regrag_common::catalog::ReferenceCatalog;

use crate::model::{ConfidenceLevel, SearchResult};

/// Source-quality predicates consulted when weighting a result.
pub trait SourceQuality: Send + Sync {
    fn is_primary_source(&self, result: &SearchResult) -> bool;
    fn is_recent_document(&self, result: &SearchResult) -> bool;
}

/// Judges results by the catalog document their filename refers to.
///
/// Filenames that match no catalog document are neither primary nor recent.
pub struct CatalogSourceQuality {
    catalog: Arc<ReferenceCatalog>,
    recent_since_year: i32,
}

impl CatalogSourceQuality {
    pub fn new(catalog: Arc<ReferenceCatalog>, recent_since_year: i32) -> Self {
        Self {
            catalog,
            recent_since_year,
        }
    }
}

impl SourceQuality for CatalogSourceQuality {
    fn is_primary_source(&self, result: &SearchResult) -> bool {
        self.catalog
            .find_document(&result.filename)
            .is_some_and(|doc| doc.primary)
    }

    fn is_recent_document(&self, result: &SearchResult) -> bool {
        self.catalog
            .find_document(&result.filename)
            .is_some_and(|doc| doc.year >= self.recent_since_year)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SourceWeights {
    pub primary_source: f64,
    pub recent_document: f64,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            primary_source: 1.2,
            recent_document: 1.1,
        }
    }
}

impl SourceWeights {
    pub fn weight_for(&self, result: &SearchResult, quality: &dyn SourceQuality) -> f64 {
        let mut weight = 1.0;
        if quality.is_primary_source(result) {
            weight *= self.primary_source;
        }
        if quality.is_recent_document(result) {
            weight *= self.recent_document;
        }
        weight
    }

    pub fn contribution(&self, result: &SearchResult, quality: &dyn SourceQuality) -> f64 {
        result.score * self.weight_for(result, quality)
    }
}

/// Lower bounds for each confidence level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceThresholds {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 0.8,
            medium: 0.6,
            low: 0.4,
        }
    }
}

impl ConfidenceLevel {
    pub fn from_score(score: f64, thresholds: &ConfidenceThresholds) -> Self {
        if score >= thresholds.high {
            Self::High
        } else if score >= thresholds.medium {
            Self::Medium
        } else if score >= thresholds.low {
            Self::Low
        } else {
            Self::Insufficient
        }
    }
}

/// Weighted mean of the results' scores, clamped to [0, 1]. Empty input scores 0.0.
pub fn weighted_confidence<'a, I>(results: I, quality: &dyn SourceQuality, weights: &SourceWeights) -> f64
where
    I: IntoIterator<Item = &'a SearchResult>,
{
    let (total, count) = results
        .into_iter()
        .fold((0.0_f64, 0_usize), |(total, count), result| {
            (total + weights.contribution(result, quality), count + 1)
        });
    if count == 0 {
        return 0.0;
    }
    clamp_unit(total / count as f64)
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Flags results by filename markers: "primary" and "recent".
    pub(crate) struct FilenameQuality;

    impl SourceQuality for FilenameQuality {
        fn is_primary_source(&self, result: &SearchResult) -> bool {
            result.filename.contains("primary")
        }

        fn is_recent_document(&self, result: &SearchResult) -> bool {
            result.filename.contains("recent")
        }
    }

    #[test]
    fn plain_mean_without_flags() {
        let results = vec![
            SearchResult::new("a", "doc1", "br", 0.4),
            SearchResult::new("b", "doc2", "us", 0.8),
        ];
        let score = weighted_confidence(&results, &FilenameQuality, &SourceWeights::default());
        assert!((score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn weights_compound_multiplicatively() {
        let weights = SourceWeights::default();
        let result = SearchResult::new("a", "primary_recent.pdf", "br", 0.5);
        let weight = weights.weight_for(&result, &FilenameQuality);
        assert!((weight - 1.2 * 1.1).abs() < 1e-12);
    }

    #[test]
    fn flagged_result_contributes_more() {
        let weights = SourceWeights::default();
        let flagged = SearchResult::new("a", "primary_recent.pdf", "br", 0.5);
        let plain = SearchResult::new("a", "memo.pdf", "br", 0.5);
        assert!(
            weights.contribution(&flagged, &FilenameQuality)
                > weights.contribution(&plain, &FilenameQuality)
        );
    }

    #[test]
    fn empty_input_scores_zero() {
        let results: Vec<SearchResult> = Vec::new();
        assert_eq!(
            weighted_confidence(&results, &FilenameQuality, &SourceWeights::default()),
            0.0
        );
    }

    #[test]
    fn adversarial_scores_are_clamped() {
        let weights = SourceWeights::default();
        let high = vec![SearchResult::new("a", "primary_recent", "br", 7.5)];
        assert_eq!(weighted_confidence(&high, &FilenameQuality, &weights), 1.0);

        let negative = vec![SearchResult::new("a", "doc", "br", -3.0)];
        assert_eq!(weighted_confidence(&negative, &FilenameQuality, &weights), 0.0);

        let overflow = vec![
            SearchResult::new("a", "doc", "br", f64::MAX),
            SearchResult::new("b", "doc", "br", -f64::MAX),
            SearchResult::new("c", "primary", "br", f64::MAX),
        ];
        let score = weighted_confidence(&overflow, &FilenameQuality, &weights);
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn catalog_quality_uses_document_metadata() {
        let catalog = Arc::new(ReferenceCatalog::embedded().unwrap());
        let quality = CatalogSourceQuality::new(Arc::clone(&catalog), catalog.recent_since_year());

        let circular = SearchResult::new("x", "Circular_3978.pdf", "br", 0.9);
        assert!(quality.is_primary_source(&circular));
        assert!(quality.is_recent_document(&circular));

        let patriot = SearchResult::new("x", "PATRIOT_Act.pdf", "us", 0.9);
        assert!(quality.is_primary_source(&patriot));
        assert!(!quality.is_recent_document(&patriot));

        let package = SearchResult::new("x", "AML_Package_2021.pdf", "eu", 0.9);
        assert!(!quality.is_primary_source(&package));
        assert!(quality.is_recent_document(&package));

        let unknown = SearchResult::new("x", "doc1", "br", 0.9);
        assert!(!quality.is_primary_source(&unknown));
        assert!(!quality.is_recent_document(&unknown));
    }

    #[test]
    fn confidence_levels_follow_thresholds() {
        let t = ConfidenceThresholds::default();
        assert_eq!(ConfidenceLevel::from_score(0.95, &t), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.8, &t), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.7, &t), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.4, &t), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(0.1, &t), ConfidenceLevel::Insufficient);
    }
}
