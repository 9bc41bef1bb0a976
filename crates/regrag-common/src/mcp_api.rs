use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::catalog::{CrossReference, JurisdictionInfo, RequirementRecord, TimelineEvent, Topic};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SynthesizeResponseParams {
    /// The compliance question being answered.
    pub query: String,
    /// Retrieval results, each `{content, filename, jurisdiction, score}`.
    pub results: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CompareJurisdictionsParams {
    /// Retrieval results, each `{content, filename, jurisdiction, score}`.
    pub results: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct JurisdictionParams {
    /// Jurisdiction code such as "br", "us" or "eu".
    pub jurisdiction: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct JurisdictionFilterParams {
    /// Optional jurisdiction code to restrict the output to.
    pub jurisdiction: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RequirementsResponse {
    pub jurisdiction: String,
    /// `false` when the code is not declared in the reference catalog.
    pub known: bool,
    pub requirements: Vec<RequirementRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TopicListResponse {
    pub catalog_version: String,
    pub jurisdictions: Vec<JurisdictionInfo>,
    pub topics: Vec<Topic>,
    pub cross_references: Vec<CrossReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TimelineResponse {
    pub events: Vec<TimelineEvent>,
}
