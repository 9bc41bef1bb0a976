/// Catalog-derived reports: conflicts, timeline, trends and per-jurisdiction or per-topic
/// summaries.
use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use regrag_common::catalog::{
    CommonPattern, Conflict, ConflictKind, EmergingArea, Impact, ImplementationPlan, Jurisdiction,
    KeyTrend, Outlook, ReferenceCatalog, RegulatoryDocument, RequirementRecord,
    RequirementSummary, StringencyChange, TimelineEvent, TopicSummary, Trend,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ConflictSummary {
    pub total_conflicts: usize,
    pub high_impact: usize,
    pub medium_impact: usize,
    pub low_impact: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Recommendation {
    pub priority: Impact,
    pub subject: String,
    pub recommendation: String,
    pub implementation: ImplementationPlan,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConflictReport {
    pub catalog_version: String,
    /// Set when the report is restricted to conflicts involving one jurisdiction
    pub jurisdiction: Option<Jurisdiction>,
    pub summary: ConflictSummary,
    pub conflicts: BTreeMap<ConflictKind, Vec<Conflict>>,
    /// One entry per high-impact conflict
    pub recommendations: Vec<Recommendation>,
}

pub fn conflict_report(catalog: &ReferenceCatalog, filter: Option<&Jurisdiction>) -> ConflictReport {
    let selected: Vec<&Conflict> = catalog
        .conflicts()
        .iter()
        .filter(|c| filter.is_none_or(|j| c.involves(j)))
        .collect();

    let count = |impact: Impact| selected.iter().filter(|c| c.impact == impact).count();
    let summary = ConflictSummary {
        total_conflicts: selected.len(),
        high_impact: count(Impact::High),
        medium_impact: count(Impact::Medium),
        low_impact: count(Impact::Low),
    };

    let mut conflicts: BTreeMap<ConflictKind, Vec<Conflict>> = BTreeMap::new();
    for conflict in &selected {
        conflicts.entry(conflict.kind).or_default().push((*conflict).clone());
    }

    let recommendations = selected
        .iter()
        .filter(|c| c.impact == Impact::High)
        .map(|c| Recommendation {
            priority: Impact::High,
            subject: c.subject.clone(),
            recommendation: c.resolution.clone(),
            implementation: catalog.implementation_plan().clone(),
        })
        .collect();

    ConflictReport {
        catalog_version: catalog.version().to_string(),
        jurisdiction: filter.cloned(),
        summary,
        conflicts,
        recommendations,
    }
}

/// Timeline events, oldest first, optionally restricted to one jurisdiction.
pub fn timeline_for(catalog: &ReferenceCatalog, filter: Option<&Jurisdiction>) -> Vec<TimelineEvent> {
    catalog
        .timeline()
        .iter()
        .filter(|e| filter.is_none_or(|j| &e.jurisdiction == j))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JurisdictionSummary {
    pub jurisdiction: Jurisdiction,
    /// Display name, absent when the code is not declared in the catalog
    pub name: Option<String>,
    pub documents: Vec<RegulatoryDocument>,
    pub requirements: Vec<RequirementRecord>,
    pub timeline: Vec<TimelineEvent>,
}

pub fn jurisdiction_summary(catalog: &ReferenceCatalog, jurisdiction: &Jurisdiction) -> JurisdictionSummary {
    let name = catalog
        .jurisdictions()
        .iter()
        .find(|j| &j.code == jurisdiction)
        .map(|j| j.name.clone());

    JurisdictionSummary {
        jurisdiction: jurisdiction.clone(),
        name,
        documents: catalog.documents_for(jurisdiction).into_iter().cloned().collect(),
        requirements: catalog.requirements_for(jurisdiction).to_vec(),
        timeline: timeline_for(catalog, Some(jurisdiction)),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TrendCounts {
    pub key_trends: usize,
    pub high_impact_trends: usize,
    pub emerging_areas: usize,
    pub projections: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TrendSummary {
    pub counts: TrendCounts,
    pub key_trends: Vec<KeyTrend>,
    pub emerging_areas: Vec<EmergingArea>,
    pub future_outlook: Vec<Outlook>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TrendReport {
    pub catalog_version: String,
    /// Set when per-jurisdiction details are restricted to one jurisdiction
    pub jurisdiction: Option<Jurisdiction>,
    pub periods: Vec<String>,
    pub summary: TrendSummary,
    pub requirement_changes: Vec<Trend>,
    pub focus_shifts: Vec<Trend>,
    pub stringency_changes: BTreeMap<String, Vec<StringencyChange>>,
    pub common_patterns: Vec<CommonPattern>,
}

/// Trend report over the catalog's analysis tables.
///
/// A jurisdiction filter keeps every entry but narrows the per-jurisdiction maps to that one
/// code, so the period-level picture stays intact.
pub fn trend_report(catalog: &ReferenceCatalog, filter: Option<&Jurisdiction>) -> TrendReport {
    let trends = catalog.trends();

    let narrow_trend = |t: &Trend| Trend {
        jurisdictions: restrict(&t.jurisdictions, filter),
        ..t.clone()
    };
    let emerging_areas: Vec<EmergingArea> = trends
        .emerging_areas
        .iter()
        .map(|a| EmergingArea {
            jurisdictional_status: restrict(&a.jurisdictional_status, filter),
            ..a.clone()
        })
        .collect();

    let counts = TrendCounts {
        key_trends: trends.key_trends.len(),
        high_impact_trends: trends
            .key_trends
            .iter()
            .filter(|t| t.impact == Impact::High)
            .count(),
        emerging_areas: emerging_areas.len(),
        projections: trends.future_outlook.len(),
    };

    TrendReport {
        catalog_version: catalog.version().to_string(),
        jurisdiction: filter.cloned(),
        periods: trends.periods.clone(),
        summary: TrendSummary {
            counts,
            key_trends: trends.key_trends.clone(),
            emerging_areas,
            future_outlook: trends.future_outlook.clone(),
        },
        requirement_changes: trends.requirement_changes.iter().map(narrow_trend).collect(),
        focus_shifts: trends.focus_shifts.iter().map(narrow_trend).collect(),
        stringency_changes: trends.stringency_changes.clone(),
        common_patterns: trends
            .common_patterns
            .iter()
            .map(|p| CommonPattern {
                implementation: restrict(&p.implementation, filter),
                ..p.clone()
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ThematicSummary {
    pub catalog_version: String,
    pub jurisdiction: Option<Jurisdiction>,
    pub topics: Vec<TopicSummary>,
    pub requirements: Vec<RequirementSummary>,
}

/// Topic and requirement summaries, with variations narrowed to one jurisdiction if given.
pub fn thematic_summary(catalog: &ReferenceCatalog, filter: Option<&Jurisdiction>) -> ThematicSummary {
    ThematicSummary {
        catalog_version: catalog.version().to_string(),
        jurisdiction: filter.cloned(),
        topics: catalog
            .topic_summaries()
            .iter()
            .map(|t| TopicSummary {
                jurisdictional_variations: restrict(&t.jurisdictional_variations, filter),
                ..t.clone()
            })
            .collect(),
        requirements: catalog
            .requirement_summaries()
            .iter()
            .map(|r| RequirementSummary {
                implementation: restrict(&r.implementation, filter),
                ..r.clone()
            })
            .collect(),
    }
}

fn restrict(
    by_jurisdiction: &BTreeMap<Jurisdiction, String>,
    filter: Option<&Jurisdiction>,
) -> BTreeMap<Jurisdiction, String> {
    by_jurisdiction
        .iter()
        .filter(|(code, _)| filter.is_none_or(|j| *code == j))
        .map(|(code, note)| (code.clone(), note.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ReferenceCatalog {
        ReferenceCatalog::embedded().unwrap()
    }

    #[test]
    fn full_report_counts_by_impact() {
        let report = conflict_report(&catalog(), None);
        assert_eq!(
            report.summary,
            ConflictSummary {
                total_conflicts: 5,
                high_impact: 3,
                medium_impact: 2,
                low_impact: 0,
            }
        );
        assert_eq!(report.conflicts[&ConflictKind::Requirements].len(), 2);
        assert_eq!(report.conflicts[&ConflictKind::Timelines].len(), 1);
        assert_eq!(report.recommendations.len(), 3);
        assert!(report
            .recommendations
            .iter()
            .all(|r| r.priority == Impact::High && !r.implementation.steps.is_empty()));
    }

    #[test]
    fn report_filtered_by_jurisdiction() {
        let br = Jurisdiction::new("br");
        let report = conflict_report(&catalog(), Some(&br));
        assert_eq!(report.jurisdiction, Some(br.clone()));
        assert_eq!(report.summary.total_conflicts, 3);
        assert_eq!(report.summary.high_impact, 3);
        assert!(report.conflicts.values().flatten().all(|c| c.involves(&br)));
        assert!(!report.conflicts.contains_key(&ConflictKind::Procedures));
    }

    #[test]
    fn unknown_jurisdiction_report_is_empty() {
        let report = conflict_report(&catalog(), Some(&Jurisdiction::new("xx")));
        assert_eq!(report.summary, ConflictSummary::default());
        assert!(report.conflicts.is_empty());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn timeline_filter() {
        let eu = timeline_for(&catalog(), Some(&Jurisdiction::new("eu")));
        let years: Vec<i32> = eu.iter().map(|e| e.year).collect();
        assert_eq!(years, vec![2015, 2018]);
        assert_eq!(timeline_for(&catalog(), None).first().map(|e| e.year), Some(2001));
    }

    #[test]
    fn timeline_carries_impact_and_key_changes() {
        let eu = timeline_for(&catalog(), Some(&Jurisdiction::new("eu")));
        let sixth = eu.iter().find(|e| e.year == 2018).expect("2018 event");
        assert_eq!(sixth.impact.as_deref(), Some("Strengthened EU AML framework"));
        assert!(sixth.key_changes.contains(&"Stricter penalties".to_string()));
        assert!(eu.iter().find(|e| e.year == 2015).is_some_and(|e| e.key_changes.is_empty()));
    }

    #[test]
    fn full_trend_report_counts() {
        let report = trend_report(&catalog(), None);
        assert_eq!(
            report.summary.counts,
            TrendCounts {
                key_trends: 2,
                high_impact_trends: 2,
                emerging_areas: 1,
                projections: 1,
            }
        );
        assert_eq!(report.periods, vec!["pre_2015", "2015_2018", "post_2018"]);
        assert_eq!(report.requirement_changes.len(), 2);
        assert_eq!(report.focus_shifts.len(), 2);
        assert_eq!(report.common_patterns.len(), 2);

        let cdd = &report.stringency_changes["customer_due_diligence"];
        assert_eq!(cdd[0].period, "post_2018");
        assert_eq!(cdd[0].drivers.len(), 3);
        assert_eq!(report.stringency_changes["reporting_requirements"][0].change, "Enhanced");

        let risk_based = &report.common_patterns[0];
        assert_eq!(risk_based.adoption["post_2018"], "Universal");
        assert_eq!(risk_based.implementation.len(), 3);
    }

    #[test]
    fn trend_report_narrowed_to_one_jurisdiction() {
        let us = Jurisdiction::new("us");
        let report = trend_report(&catalog(), Some(&us));
        assert_eq!(report.jurisdiction, Some(us.clone()));
        assert_eq!(report.summary.counts.key_trends, 2);
        for trend in report.requirement_changes.iter().chain(&report.focus_shifts) {
            assert_eq!(trend.jurisdictions.keys().collect::<Vec<_>>(), vec![&us]);
        }
        assert_eq!(
            report.summary.emerging_areas[0].jurisdictional_status[&us],
            "Advanced adoption"
        );
        assert_eq!(report.common_patterns[1].implementation[&us], "Innovation-friendly");

        let xx = trend_report(&catalog(), Some(&Jurisdiction::new("xx")));
        assert!(xx.common_patterns.iter().all(|p| p.implementation.is_empty()));
    }

    #[test]
    fn thematic_summary_by_topic_and_requirement() {
        let full = thematic_summary(&catalog(), None);
        assert_eq!(full.topics.len(), 2);
        assert_eq!(full.requirements.len(), 2);
        let cdd = &full.topics[0];
        assert_eq!(cdd.topic, "Customer Due Diligence");
        assert_eq!(cdd.key_aspects.len(), 3);
        assert_eq!(cdd.jurisdictional_variations.len(), 3);

        let br = Jurisdiction::new("br");
        let narrowed = thematic_summary(&catalog(), Some(&br));
        assert_eq!(
            narrowed.requirements[0].implementation[&br],
            "Specific risk factors defined by BCB"
        );
        assert!(narrowed
            .topics
            .iter()
            .all(|t| t.jurisdictional_variations.len() == 1));
    }

    #[test]
    fn summary_for_known_and_unknown_jurisdictions() {
        let us = jurisdiction_summary(&catalog(), &Jurisdiction::new("us"));
        assert_eq!(us.name.as_deref(), Some("United States"));
        assert_eq!(us.documents.len(), 2);
        assert_eq!(us.requirements[0].source, "PATRIOT_Act");

        let xx = jurisdiction_summary(&catalog(), &Jurisdiction::new("xx"));
        assert!(xx.name.is_none());
        assert!(xx.documents.is_empty() && xx.requirements.is_empty() && xx.timeline.is_empty());
    }
}
