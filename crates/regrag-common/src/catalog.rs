/// Read-only reference catalog for AML/FT regulatory data.
///
/// The catalog is a versioned JSON dataset holding everything that is static knowledge rather
/// than computation: declared jurisdictions, regulatory documents, topic taxonomy, requirement
/// records per jurisdiction, cross references, conflict tables, the regulatory timeline, trend
/// analysis tables and topic/requirement summaries. A default copy is embedded at compile time; deployments can point at a newer
/// file instead. Adding a jurisdiction is a data change only.
///
/// Lookups for a jurisdiction the catalog does not know return empty slices, never errors.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::error::CommonError;

const EMBEDDED_CATALOG: &str = include_str!("../data/reference_catalog.json");

/// Jurisdiction code such as "br", "us" or "eu".
///
/// Codes are open: any string is accepted and normalized (trimmed, lowercased). Whether a code
/// is *known* is decided by configuration and the catalog, not by this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct Jurisdiction(String);

impl Jurisdiction {
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Jurisdiction {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl<'de> Deserialize<'de> for Jurisdiction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|code| Self::new(&code))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JurisdictionInfo {
    pub code: Jurisdiction,
    /// Display name, e.g. "European Union"
    pub name: String,
}

/// A regulatory source document, e.g. "Circular_3978" or "PATRIOT_Act".
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RegulatoryDocument {
    /// Stable document identifier, also the stem used in indexed filenames
    pub id: String,
    pub jurisdiction: Jurisdiction,
    pub title: String,
    /// Year the document was issued
    pub year: i32,
    /// Primary legislation or regulator-issued text (as opposed to proposals and commentary)
    pub primary: bool,
    pub summary: String,
    pub main_requirements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Topic {
    pub name: String,
    pub subtopics: Vec<String>,
    pub relevance: String,
}

/// One regulatory obligation group tied to a jurisdiction and source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RequirementRecord {
    /// Requirement category, e.g. "KYC" or "CIP"
    pub category: String,
    /// Source document identifier
    pub source: String,
    pub requirements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SectionRef {
    pub document: String,
    pub section: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CrossReference {
    pub topic: String,
    pub sections: Vec<SectionRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TimelineEvent {
    pub year: i32,
    pub event: String,
    pub jurisdiction: Jurisdiction,
    pub significance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_changes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Requirements,
    Definitions,
    Procedures,
    Timelines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    High,
    Medium,
    Low,
}

/// A known inconsistency between two or more jurisdictions.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Conflict {
    pub kind: ConflictKind,
    /// Topic, term, procedure or requirement the conflict is about
    pub subject: String,
    pub conflict_type: String,
    pub jurisdictions: Vec<Jurisdiction>,
    pub description: String,
    /// Per-jurisdiction position
    pub details: BTreeMap<Jurisdiction, String>,
    pub impact: Impact,
    pub resolution: String,
}

impl Conflict {
    pub fn involves(&self, jurisdiction: &Jurisdiction) -> bool {
        self.jurisdictions.contains(jurisdiction)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImplementationPlan {
    pub approach: String,
    pub steps: Vec<String>,
    pub timeline: String,
    pub resources_needed: String,
}

/// How a requirement area or regulatory focus evolved across periods.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Trend {
    pub subject: String,
    pub trend: String,
    /// Period key (e.g. "pre_2015") to description
    pub evolution: BTreeMap<String, String>,
    pub jurisdictions: BTreeMap<Jurisdiction, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StringencyChange {
    pub period: String,
    /// Direction of the change, e.g. "Increased"
    pub change: String,
    pub drivers: Vec<String>,
}

/// A practice shared by several jurisdictions, with its adoption over time.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CommonPattern {
    pub pattern: String,
    /// Period key to adoption level
    pub adoption: BTreeMap<String, String>,
    pub implementation: BTreeMap<Jurisdiction, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KeyTrend {
    pub trend: String,
    pub impact: Impact,
    pub timeframe: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EmergingArea {
    pub area: String,
    pub maturity: String,
    pub relevance: Impact,
    pub jurisdictional_status: BTreeMap<Jurisdiction, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Outlook {
    pub trend: String,
    pub likelihood: Impact,
    pub timeframe: String,
    pub drivers: Vec<String>,
}

/// Trend analysis tables: what changed, how strictly, and where it is heading.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TrendAnalysis {
    /// Period keys in chronological order
    #[serde(default)]
    pub periods: Vec<String>,
    #[serde(default)]
    pub requirement_changes: Vec<Trend>,
    #[serde(default)]
    pub focus_shifts: Vec<Trend>,
    /// Requirement area to its stringency changes
    #[serde(default)]
    pub stringency_changes: BTreeMap<String, Vec<StringencyChange>>,
    #[serde(default)]
    pub common_patterns: Vec<CommonPattern>,
    #[serde(default)]
    pub key_trends: Vec<KeyTrend>,
    #[serde(default)]
    pub emerging_areas: Vec<EmergingArea>,
    #[serde(default)]
    pub future_outlook: Vec<Outlook>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TopicSummary {
    pub topic: String,
    pub summary: String,
    pub key_aspects: Vec<String>,
    pub jurisdictional_variations: BTreeMap<Jurisdiction, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RequirementSummary {
    pub requirement: String,
    pub summary: String,
    pub implementation: BTreeMap<Jurisdiction, String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogData {
    version: String,
    recent_since_year: i32,
    jurisdictions: Vec<JurisdictionInfo>,
    #[serde(default)]
    documents: Vec<RegulatoryDocument>,
    #[serde(default)]
    topics: Vec<Topic>,
    #[serde(default)]
    requirements: BTreeMap<Jurisdiction, Vec<RequirementRecord>>,
    #[serde(default)]
    cross_references: Vec<CrossReference>,
    #[serde(default)]
    timeline: Vec<TimelineEvent>,
    #[serde(default)]
    conflicts: Vec<Conflict>,
    implementation_plan: ImplementationPlan,
    #[serde(default)]
    trends: TrendAnalysis,
    #[serde(default)]
    topic_summaries: Vec<TopicSummary>,
    #[serde(default)]
    requirement_summaries: Vec<RequirementSummary>,
}

#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    data: CatalogData,
    /// One filename pattern per document, same order as `data.documents`
    document_patterns: Vec<Regex>,
}

impl ReferenceCatalog {
    /// Load the dataset compiled into the binary.
    pub fn embedded() -> Result<Self, CommonError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    /// Load a dataset from a JSON file on disk.
    pub fn from_path(path: &Path) -> Result<Self, CommonError> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&content)?;
        info!(
            path = %path.display(),
            version = catalog.version(),
            "reference catalog loaded from file"
        );
        Ok(catalog)
    }

    pub fn from_json(content: &str) -> Result<Self, CommonError> {
        let mut data: CatalogData = serde_json::from_str(content)?;
        validate(&data)?;
        data.timeline.sort_by_key(|e| e.year);
        let document_patterns = data
            .documents
            .iter()
            .map(|d| document_pattern(&d.id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            data,
            document_patterns,
        })
    }

    pub fn version(&self) -> &str {
        &self.data.version
    }

    /// Documents issued in or after this year count as recent.
    pub fn recent_since_year(&self) -> i32 {
        self.data.recent_since_year
    }

    pub fn jurisdictions(&self) -> &[JurisdictionInfo] {
        &self.data.jurisdictions
    }

    pub fn jurisdiction_codes(&self) -> Vec<Jurisdiction> {
        self.data.jurisdictions.iter().map(|j| j.code.clone()).collect()
    }

    pub fn requirements_for(&self, jurisdiction: &Jurisdiction) -> &[RequirementRecord] {
        self.data
            .requirements
            .get(jurisdiction)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn topics(&self) -> &[Topic] {
        &self.data.topics
    }

    pub fn documents(&self) -> &[RegulatoryDocument] {
        &self.data.documents
    }

    pub fn documents_for(&self, jurisdiction: &Jurisdiction) -> Vec<&RegulatoryDocument> {
        self.data
            .documents
            .iter()
            .filter(|d| &d.jurisdiction == jurisdiction)
            .collect()
    }

    /// Find the catalog document a filename refers to.
    ///
    /// The document id must appear case-insensitively in the filename, delimited by the string
    /// edges or non-alphanumeric characters, so "Circular_39780.pdf" does not name
    /// "Circular_3978". When several ids match, the longest one wins.
    pub fn find_document(&self, filename: &str) -> Option<&RegulatoryDocument> {
        self.data
            .documents
            .iter()
            .zip(&self.document_patterns)
            .filter(|(_, pattern)| pattern.is_match(filename))
            .map(|(doc, _)| doc)
            .max_by_key(|d| d.id.len())
    }

    pub fn cross_references(&self) -> &[CrossReference] {
        &self.data.cross_references
    }

    /// Timeline events, oldest first.
    pub fn timeline(&self) -> &[TimelineEvent] {
        &self.data.timeline
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.data.conflicts
    }

    pub fn implementation_plan(&self) -> &ImplementationPlan {
        &self.data.implementation_plan
    }

    pub fn trends(&self) -> &TrendAnalysis {
        &self.data.trends
    }

    pub fn topic_summaries(&self) -> &[TopicSummary] {
        &self.data.topic_summaries
    }

    pub fn requirement_summaries(&self) -> &[RequirementSummary] {
        &self.data.requirement_summaries
    }
}

fn document_pattern(id: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?i)(?:^|[^[:alnum:]]){}(?:$|[^[:alnum:]])",
        regex::escape(id)
    ))
}

fn validate(data: &CatalogData) -> Result<(), CommonError> {
    if data.version.trim().is_empty() {
        return Err(CommonError::InvalidCatalog("version must not be empty".to_string()));
    }
    if data.jurisdictions.is_empty() {
        return Err(CommonError::InvalidCatalog(
            "at least one jurisdiction must be declared".to_string(),
        ));
    }

    let declared: BTreeSet<&Jurisdiction> = data.jurisdictions.iter().map(|j| &j.code).collect();
    let check = |code: &Jurisdiction, context: &str| {
        if declared.contains(code) {
            Ok(())
        } else {
            Err(CommonError::InvalidCatalog(format!(
                "{context} references undeclared jurisdiction '{code}'"
            )))
        }
    };

    for code in data.requirements.keys() {
        check(code, "requirements")?;
    }
    for doc in &data.documents {
        check(&doc.jurisdiction, &format!("document {}", doc.id))?;
    }
    for event in &data.timeline {
        check(&event.jurisdiction, &format!("timeline event '{}'", event.event))?;
    }
    for conflict in &data.conflicts {
        for code in conflict.jurisdictions.iter().chain(conflict.details.keys()) {
            check(code, &format!("conflict '{}'", conflict.subject))?;
        }
    }

    let trends = &data.trends;
    for trend in trends.requirement_changes.iter().chain(&trends.focus_shifts) {
        for code in trend.jurisdictions.keys() {
            check(code, &format!("trend '{}'", trend.subject))?;
        }
    }
    for pattern in &trends.common_patterns {
        for code in pattern.implementation.keys() {
            check(code, &format!("pattern '{}'", pattern.pattern))?;
        }
    }
    for area in &trends.emerging_areas {
        for code in area.jurisdictional_status.keys() {
            check(code, &format!("emerging area '{}'", area.area))?;
        }
    }
    for summary in &data.topic_summaries {
        for code in summary.jurisdictional_variations.keys() {
            check(code, &format!("topic summary '{}'", summary.topic))?;
        }
    }
    for summary in &data.requirement_summaries {
        for code in summary.implementation.keys() {
            check(code, &format!("requirement summary '{}'", summary.requirement))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(jurisdictions: &str, requirements: &str) -> String {
        format!(
            r#"{{
                "version": "test",
                "recent_since_year": 2018,
                "jurisdictions": {jurisdictions},
                "requirements": {requirements},
                "implementation_plan": {{
                    "approach": "Risk-based",
                    "steps": [],
                    "timeline": "Short-term",
                    "resources_needed": "Low"
                }}
            }}"#
        )
    }

    #[test]
    fn embedded_catalog_loads() {
        let catalog = ReferenceCatalog::embedded().expect("embedded catalog");
        assert!(!catalog.version().is_empty());
        let codes: Vec<&str> = catalog.jurisdictions().iter().map(|j| j.code.as_str()).collect();
        assert_eq!(codes, vec!["br", "us", "eu"]);
        assert!(!catalog.topics().is_empty());
        assert!(!catalog.conflicts().is_empty());
    }

    #[test]
    fn requirements_lookup_by_code() {
        let catalog = ReferenceCatalog::embedded().unwrap();
        let br = catalog.requirements_for(&Jurisdiction::new("BR"));
        assert_eq!(br.len(), 1);
        assert_eq!(br[0].category, "KYC");
        assert_eq!(br[0].source, "Circular_3978");
    }

    #[test]
    fn unknown_jurisdiction_lookups_are_empty() {
        let catalog = ReferenceCatalog::embedded().unwrap();
        let xx = Jurisdiction::new("xx");
        assert!(catalog.requirements_for(&xx).is_empty());
        assert!(catalog.documents_for(&xx).is_empty());
    }

    #[test]
    fn timeline_is_sorted_by_year() {
        let catalog = ReferenceCatalog::embedded().unwrap();
        let years: Vec<i32> = catalog.timeline().iter().map(|e| e.year).collect();
        let mut sorted = years.clone();
        sorted.sort();
        assert_eq!(years, sorted);
    }

    #[test]
    fn find_document_prefers_longest_id() {
        let catalog = ReferenceCatalog::embedded().unwrap();
        let doc = catalog
            .find_document("uploads/circular_3978_consolidated.pdf")
            .expect("document match");
        assert_eq!(doc.id, "Circular_3978");
        assert!(catalog.find_document("random_memo.txt").is_none());
    }

    #[test]
    fn find_document_respects_id_boundaries() {
        let catalog = ReferenceCatalog::embedded().unwrap();
        assert!(catalog.find_document("Circular_39780.pdf").is_none());
        assert!(catalog.find_document("XCircular_3978.pdf").is_none());
        assert_eq!(
            catalog.find_document("Circular_3978.pdf").map(|d| d.id.as_str()),
            Some("Circular_3978")
        );
        assert_eq!(
            catalog
                .find_document("us/PATRIOT_Act_Section326.pdf")
                .map(|d| d.id.as_str()),
            Some("PATRIOT_Act")
        );
    }

    #[test]
    fn trend_tables_and_summaries_load() {
        let catalog = ReferenceCatalog::embedded().unwrap();
        let trends = catalog.trends();
        assert_eq!(trends.periods, vec!["pre_2015", "2015_2018", "post_2018"]);
        assert_eq!(trends.stringency_changes["customer_due_diligence"][0].change, "Increased");
        assert!(!trends.key_trends.is_empty());
        assert!(!catalog.topic_summaries().is_empty());
        assert!(!catalog.requirement_summaries().is_empty());

        let patriot = catalog
            .timeline()
            .iter()
            .find(|e| e.year == 2001)
            .expect("2001 event");
        assert_eq!(patriot.key_changes.len(), 3);
        assert!(patriot.impact.is_some());
    }

    #[test]
    fn undeclared_jurisdiction_in_summaries_is_rejected() {
        let content = r#"{
            "version": "test",
            "recent_since_year": 2018,
            "jurisdictions": [{"code": "br", "name": "Brazil"}],
            "implementation_plan": {
                "approach": "Risk-based",
                "steps": [],
                "timeline": "Short-term",
                "resources_needed": "Low"
            },
            "topic_summaries": [{
                "topic": "CDD",
                "summary": "Core CDD requirements",
                "key_aspects": [],
                "jurisdictional_variations": {"uk": "Risk-based"}
            }]
        }"#;
        let err = ReferenceCatalog::from_json(content).unwrap_err();
        assert!(err.to_string().contains("topic summary 'CDD'"));
    }

    #[test]
    fn jurisdiction_codes_are_normalized() {
        assert_eq!(Jurisdiction::new("  EU "), Jurisdiction::new("eu"));
        let parsed: Jurisdiction = serde_json::from_str("\"US\"").unwrap();
        assert_eq!(parsed.as_str(), "us");
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"us\"");
    }

    #[test]
    fn new_jurisdiction_is_a_data_change() {
        let content = minimal(
            r#"[{"code": "uk", "name": "United Kingdom"}]"#,
            r#"{"uk": [{"category": "CDD", "source": "MLR_2017", "requirements": ["Verification"]}]}"#,
        );
        let catalog = ReferenceCatalog::from_json(&content).unwrap();
        let uk = catalog.requirements_for(&Jurisdiction::new("uk"));
        assert_eq!(uk[0].source, "MLR_2017");
    }

    #[test]
    fn undeclared_jurisdiction_is_rejected() {
        let content = minimal(
            r#"[{"code": "br", "name": "Brazil"}]"#,
            r#"{"us": []}"#,
        );
        let err = ReferenceCatalog::from_json(&content).unwrap_err();
        assert!(matches!(err, CommonError::InvalidCatalog(_)));
    }

    #[test]
    fn empty_jurisdiction_list_is_rejected() {
        let content = minimal("[]", "{}");
        assert!(ReferenceCatalog::from_json(&content).is_err());
    }
}
