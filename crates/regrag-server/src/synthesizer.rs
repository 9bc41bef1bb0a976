/// Structured response synthesis.
///
/// Turns the retrieval results for a query into a `StructuredResponse`: a direct answer built
/// from the highest-scoring results, the catalog requirements of every jurisdiction present, a
/// cross-jurisdiction comparison, formatted source citations and a confidence score.
///
/// `Synthesizer::synthesize` never fails. Empty input yields the zero-valued response, and so
/// does any fault during synthesis (after it has been logged). Results with a jurisdiction
/// outside the configured set still appear in `sources` and count towards confidence, but are
/// left out of `jurisdiction_specific` and `cross_jurisdiction`.
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

use regrag_common::catalog::{Jurisdiction, ReferenceCatalog, RequirementRecord};

use crate::compare::{compare, ItemKeyer, TopicKeyer};
use crate::error::{AppError, SynthesisError};
use crate::model::{
    ConfidenceLevel, CrossJurisdictionAnalysis, DirectAnswer, SearchResult, SourceCitation,
    StructuredResponse,
};
use crate::scoring::{
    weighted_confidence, CatalogSourceQuality, ConfidenceThresholds, SourceQuality, SourceWeights,
};

pub const ELLIPSIS: &str = "...";

/// Immutable synthesis settings, fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisConfig {
    /// Jurisdictions that take part in grouping and comparison
    pub jurisdictions: Vec<Jurisdiction>,
    /// Excerpt length in characters before the ellipsis is appended
    pub excerpt_max_chars: usize,
    pub key_point_max_chars: usize,
    /// Number of top-scoring results the direct answer is drawn from
    pub summary_top_n: usize,
    /// Documents issued in or after this year count as recent
    pub recent_since_year: i32,
    pub weights: SourceWeights,
    pub thresholds: ConfidenceThresholds,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            jurisdictions: ["br", "us", "eu"].into_iter().map(Jurisdiction::new).collect(),
            excerpt_max_chars: 500,
            key_point_max_chars: 200,
            summary_top_n: 3,
            recent_since_year: 2018,
            weights: SourceWeights::default(),
            thresholds: ConfidenceThresholds::default(),
        }
    }
}

impl SynthesisConfig {
    /// Defaults with the jurisdiction list and recency cutoff taken from the catalog.
    pub fn for_catalog(catalog: &ReferenceCatalog) -> Self {
        Self {
            jurisdictions: catalog.jurisdiction_codes(),
            recent_since_year: catalog.recent_since_year(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.excerpt_max_chars == 0 || self.key_point_max_chars == 0 {
            return Err(AppError::Config("excerpt lengths must be positive".to_string()));
        }
        if self.summary_top_n == 0 {
            return Err(AppError::Config("summary_top_n must be at least 1".to_string()));
        }
        let weights = [self.weights.primary_source, self.weights.recent_document];
        if weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(AppError::Config(
                "source weights must be finite and positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Produces the summary line of the direct answer.
pub trait SummaryStrategy: Send + Sync {
    /// `selected` are the top-scoring results in input order, `key_points` one per result.
    fn summarize(&self, query: &str, selected: &[&SearchResult], key_points: &[String]) -> String;
}

/// Leads with the first key point and names the sources it was drawn from.
pub struct ExtractiveSummary;

impl SummaryStrategy for ExtractiveSummary {
    fn summarize(&self, _query: &str, selected: &[&SearchResult], key_points: &[String]) -> String {
        let Some(lead) = key_points.first() else {
            return String::new();
        };

        let mut jurisdictions: Vec<String> = Vec::new();
        for result in selected {
            let code = result.jurisdiction.as_str().to_uppercase();
            if !jurisdictions.contains(&code) {
                jurisdictions.push(code);
            }
        }

        let noun = if selected.len() == 1 { "source" } else { "sources" };
        format!(
            "{lead} (based on {} {noun}: {})",
            selected.len(),
            jurisdictions.join(", ")
        )
    }
}

pub struct Synthesizer {
    config: SynthesisConfig,
    catalog: Arc<ReferenceCatalog>,
    quality: Arc<dyn SourceQuality>,
    keyer: Arc<dyn ItemKeyer>,
    summary: Arc<dyn SummaryStrategy>,
}

impl Synthesizer {
    /// Build a synthesizer with the catalog-backed source-quality predicates, topic keys for
    /// comparison and the extractive summary.
    pub fn new(config: SynthesisConfig, catalog: Arc<ReferenceCatalog>) -> Result<Self, AppError> {
        config.validate()?;
        let quality = Arc::new(CatalogSourceQuality::new(
            Arc::clone(&catalog),
            config.recent_since_year,
        ));
        let keyer = Arc::new(TopicKeyer::from_catalog(&catalog)?);
        Ok(Self {
            config,
            catalog,
            quality,
            keyer,
            summary: Arc::new(ExtractiveSummary),
        })
    }

    pub fn with_source_quality(mut self, quality: Arc<dyn SourceQuality>) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_keyer(mut self, keyer: Arc<dyn ItemKeyer>) -> Self {
        self.keyer = keyer;
        self
    }

    pub fn with_summary_strategy(mut self, summary: Arc<dyn SummaryStrategy>) -> Self {
        self.summary = summary;
        self
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    pub fn is_known(&self, jurisdiction: &Jurisdiction) -> bool {
        self.config.jurisdictions.contains(jurisdiction)
    }

    pub fn synthesize(&self, query: &str, results: &[SearchResult]) -> StructuredResponse {
        match self.try_synthesize(query, results) {
            Ok(response) => {
                info!(
                    query,
                    results = results.len(),
                    confidence = response.confidence,
                    level = ?response.confidence_level,
                    "generated structured response"
                );
                response
            }
            Err(e) => {
                error!(error = %e, query, "response synthesis failed");
                StructuredResponse::default()
            }
        }
    }

    /// Synthesize from raw JSON records. Any malformed record yields the zero-valued response.
    pub fn synthesize_raw(&self, query: &str, records: &[serde_json::Value]) -> StructuredResponse {
        match parse_records(records) {
            Ok(results) => self.synthesize(query, &results),
            Err(e) => {
                error!(error = %e, query, "response synthesis failed");
                StructuredResponse::default()
            }
        }
    }

    /// Compare the known-jurisdiction results on their own, without a full response.
    pub fn compare_results(&self, results: &[SearchResult]) -> CrossJurisdictionAnalysis {
        compare(&self.group_by_jurisdiction(results), self.keyer.as_ref())
    }

    pub fn compare_raw(&self, records: &[serde_json::Value]) -> CrossJurisdictionAnalysis {
        match parse_records(records) {
            Ok(results) => self.compare_results(&results),
            Err(e) => {
                error!(error = %e, "jurisdiction comparison failed");
                CrossJurisdictionAnalysis::default()
            }
        }
    }

    fn try_synthesize(
        &self,
        query: &str,
        results: &[SearchResult],
    ) -> Result<StructuredResponse, SynthesisError> {
        if results.is_empty() {
            debug!(query, "no search results, returning empty response");
            return Ok(StructuredResponse::default());
        }

        if let Some((index, result)) = results.iter().enumerate().find(|(_, r)| !r.score.is_finite()) {
            return Err(SynthesisError::NonFiniteScore {
                index,
                score: result.score,
            });
        }

        let grouped = self.group_by_jurisdiction(results);
        let confidence = self.confidence(results);

        Ok(StructuredResponse {
            direct_answer: self.direct_answer(query, results),
            jurisdiction_specific: self.jurisdiction_requirements(&grouped),
            cross_jurisdiction: compare(&grouped, self.keyer.as_ref()),
            sources: self.format_sources(results),
            confidence,
            confidence_level: ConfidenceLevel::from_score(confidence, &self.config.thresholds),
        })
    }

    fn confidence<'a, I>(&self, results: I) -> f64
    where
        I: IntoIterator<Item = &'a SearchResult>,
    {
        weighted_confidence(results, self.quality.as_ref(), &self.config.weights)
    }

    fn direct_answer(&self, query: &str, results: &[SearchResult]) -> DirectAnswer {
        let selected = top_results(results, self.config.summary_top_n);
        let key_points: Vec<String> = selected.iter().map(|r| self.key_point(r)).collect();
        DirectAnswer {
            summary: self.summary.summarize(query, &selected, &key_points),
            relevance_score: self.confidence(selected.iter().copied()),
            key_points,
        }
    }

    fn key_point(&self, result: &SearchResult) -> String {
        let sentence = first_sentence(&result.content);
        if sentence.is_empty() {
            result.filename.clone()
        } else {
            truncate_excerpt(sentence, self.config.key_point_max_chars)
        }
    }

    fn group_by_jurisdiction<'a>(
        &self,
        results: &'a [SearchResult],
    ) -> BTreeMap<Jurisdiction, Vec<&'a SearchResult>> {
        let mut grouped: BTreeMap<Jurisdiction, Vec<&SearchResult>> = BTreeMap::new();
        for result in results {
            if self.is_known(&result.jurisdiction) {
                grouped
                    .entry(result.jurisdiction.clone())
                    .or_default()
                    .push(result);
            } else {
                debug!(
                    jurisdiction = %result.jurisdiction,
                    filename = %result.filename,
                    "unknown jurisdiction, excluded from comparison"
                );
            }
        }
        grouped
    }

    fn jurisdiction_requirements(
        &self,
        grouped: &BTreeMap<Jurisdiction, Vec<&SearchResult>>,
    ) -> BTreeMap<Jurisdiction, Vec<RequirementRecord>> {
        grouped
            .keys()
            .map(|j| (j.clone(), self.catalog.requirements_for(j).to_vec()))
            .collect()
    }

    fn format_sources(&self, results: &[SearchResult]) -> Vec<SourceCitation> {
        results
            .iter()
            .map(|r| SourceCitation {
                document: r.filename.clone(),
                jurisdiction: r.jurisdiction.clone(),
                relevance: r.score,
                excerpt: truncate_excerpt(&r.content, self.config.excerpt_max_chars),
            })
            .collect()
    }
}

fn parse_records(records: &[serde_json::Value]) -> Result<Vec<SearchResult>, SynthesisError> {
    records
        .iter()
        .enumerate()
        .map(|(index, value)| {
            SearchResult::from_value(value).map_err(|e| SynthesisError::MalformedRecord {
                index,
                message: e.to_string(),
            })
        })
        .collect()
}

/// The `n` highest-scoring results, returned in input order. Ties keep input order.
fn top_results(results: &[SearchResult], n: usize) -> Vec<&SearchResult> {
    let mut ranked: Vec<usize> = (0..results.len()).collect();
    ranked.sort_by(|&a, &b| results[b].score.total_cmp(&results[a].score));
    ranked.truncate(n);
    ranked.sort_unstable();
    ranked.into_iter().map(|i| &results[i]).collect()
}

/// Keep the first `max_chars` characters, appending `...` when anything was cut.
pub fn truncate_excerpt(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &content[..cut]),
        None => content.to_string(),
    }
}

fn first_sentence(content: &str) -> &str {
    let trimmed = content.trim();
    let mut chars = trimmed.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if c == '\n' {
            return trimmed[..idx].trim_end();
        }
        if matches!(c, '.' | '!' | '?') {
            match chars.peek() {
                None => return trimmed,
                Some((_, next)) if next.is_whitespace() => return &trimmed[..idx + c.len_utf8()],
                Some(_) => {}
            }
        }
    }
    trimmed
}
