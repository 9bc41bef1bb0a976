use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use regrag_common::catalog::{Jurisdiction, RequirementRecord};

/// One document excerpt returned by the retrieval collaborator for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchResult {
    /// Matched text
    pub content: String,
    /// Source document filename, e.g. "Circular_3978.pdf"
    pub filename: String,
    pub jurisdiction: Jurisdiction,
    /// Retrieval relevance, nominally in [0, 1]
    pub score: f64,
}

impl SearchResult {
    pub fn new(content: &str, filename: &str, jurisdiction: &str, score: f64) -> Self {
        Self {
            content: content.to_string(),
            filename: filename.to_string(),
            jurisdiction: Jurisdiction::new(jurisdiction),
            score,
        }
    }

    /// Convert a raw JSON record. Fails when a field is missing or has the wrong type.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DirectAnswer {
    pub summary: String,
    pub key_points: Vec<String>,
    pub relevance_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CrossJurisdictionAnalysis {
    /// Items present in every jurisdiction compared
    pub similarities: BTreeSet<String>,
    /// Items of a jurisdiction missing from at least one other jurisdiction
    pub differences: BTreeMap<Jurisdiction, BTreeSet<String>>,
    /// Items of a jurisdiction found in no other jurisdiction
    pub unique_aspects: BTreeMap<Jurisdiction, BTreeSet<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourceCitation {
    pub document: String,
    pub jurisdiction: Jurisdiction,
    pub relevance: f64,
    pub excerpt: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    #[default]
    Insufficient,
}

/// Structured, attributed answer to a compliance query.
///
/// `StructuredResponse::default()` is the zero-valued response returned for empty input and
/// for any synthesis failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StructuredResponse {
    pub direct_answer: DirectAnswer,
    pub jurisdiction_specific: BTreeMap<Jurisdiction, Vec<RequirementRecord>>,
    pub cross_jurisdiction: CrossJurisdictionAnalysis,
    pub sources: Vec<SourceCitation>,
    /// Aggregate confidence, always within [0, 1]
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
}

impl StructuredResponse {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
