/// MCP server for cross-jurisdiction AML/FT compliance answers.
///
/// Exposes nine tools:
/// - `synthesize_response`: Structured, confidence-scored answer from retrieval results
/// - `compare_jurisdictions`: Similarities and differences across jurisdictions in a result set
/// - `get_requirements`: Catalog requirement records for one jurisdiction
/// - `list_topics`: Topic taxonomy, declared jurisdictions and cross references
/// - `conflict_report`: Known conflicts with impact totals and recommendations
/// - `regulatory_timeline`: Regulatory events, oldest first, with impact and key changes
/// - `trend_report`: Requirement changes, stringency, common patterns and outlook
/// - `summarize_topics`: Topic and requirement summaries with jurisdictional variations
/// - `summarize_jurisdiction`: Documents, requirements and timeline for one jurisdiction
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tracing::info;

use crate::cache::ResponseCache;
use crate::model::{CrossJurisdictionAnalysis, StructuredResponse};
use crate::report::{self, ConflictReport, JurisdictionSummary, ThematicSummary, TrendReport};
use crate::synthesizer::Synthesizer;
use regrag_common::catalog::Jurisdiction;
use regrag_common::mcp_api::{
    CompareJurisdictionsParams, JurisdictionFilterParams, JurisdictionParams,
    RequirementsResponse, SynthesizeResponseParams, TimelineResponse, TopicListResponse,
};

#[derive(Clone)]
pub struct RegragServer {
    synthesizer: Arc<Synthesizer>,
    cache: Arc<ResponseCache>,
    tool_router: ToolRouter<RegragServer>,
}

impl RegragServer {
    pub fn new(synthesizer: Arc<Synthesizer>, cache: Arc<ResponseCache>) -> Self {
        Self {
            synthesizer,
            cache,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl RegragServer {
    #[tool(description = "Synthesize a structured AML/FT compliance answer from retrieval results. Each result is {content, filename, jurisdiction, score}. Returns a direct answer, per-jurisdiction requirements, cross-jurisdiction comparison, cited sources and a confidence score in [0, 1].")]
    async fn synthesize_response(
        &self,
        Parameters(params): Parameters<SynthesizeResponseParams>,
    ) -> Result<Json<StructuredResponse>, String> {
        let query = params.query.trim().to_string();
        if query.is_empty() {
            return Err("query must not be empty".to_string());
        }

        if let Some(cached) = self.cache.get_response(&query, &params.results).await {
            info!(query, "response cache hit");
            return Ok(Json(cached));
        }

        let response = self.synthesizer.synthesize_raw(&query, &params.results);
        if !response.is_empty() {
            self.cache
                .set_response(&query, &params.results, &response)
                .await;
        }
        Ok(Json(response))
    }

    #[tool(description = "Compare retrieval results across jurisdictions (br, us, eu). Returns topics common to all jurisdictions, per-jurisdiction differences and per-jurisdiction unique aspects.")]
    async fn compare_jurisdictions(
        &self,
        Parameters(params): Parameters<CompareJurisdictionsParams>,
    ) -> Result<Json<CrossJurisdictionAnalysis>, String> {
        Ok(Json(self.synthesizer.compare_raw(&params.results)))
    }

    #[tool(description = "Get the regulatory requirement records for a jurisdiction code such as 'br', 'us' or 'eu'.")]
    async fn get_requirements(
        &self,
        Parameters(params): Parameters<JurisdictionParams>,
    ) -> Result<Json<RequirementsResponse>, String> {
        let jurisdiction = required_jurisdiction(&params.jurisdiction)?;
        let catalog = self.synthesizer.catalog();
        let known = catalog.jurisdictions().iter().any(|j| j.code == jurisdiction);

        Ok(Json(RequirementsResponse {
            jurisdiction: jurisdiction.to_string(),
            known,
            requirements: catalog.requirements_for(&jurisdiction).to_vec(),
        }))
    }

    #[tool(description = "List the AML/FT topic taxonomy, the declared jurisdictions and cross references between regulations.")]
    async fn list_topics(&self) -> Result<Json<TopicListResponse>, String> {
        let catalog = self.synthesizer.catalog();
        Ok(Json(TopicListResponse {
            catalog_version: catalog.version().to_string(),
            jurisdictions: catalog.jurisdictions().to_vec(),
            topics: catalog.topics().to_vec(),
            cross_references: catalog.cross_references().to_vec(),
        }))
    }

    #[tool(description = "Report known regulatory conflicts between jurisdictions, grouped by kind, with impact totals and recommendations for high-impact conflicts. Optionally restrict to conflicts involving one jurisdiction.")]
    async fn conflict_report(
        &self,
        Parameters(params): Parameters<JurisdictionFilterParams>,
    ) -> Result<Json<ConflictReport>, String> {
        let filter = optional_jurisdiction(params.jurisdiction.as_deref())?;
        Ok(Json(report::conflict_report(
            self.synthesizer.catalog(),
            filter.as_ref(),
        )))
    }

    #[tool(description = "List regulatory timeline events, oldest first, with their impact and key changes where known. Optionally restrict to one jurisdiction.")]
    async fn regulatory_timeline(
        &self,
        Parameters(params): Parameters<JurisdictionFilterParams>,
    ) -> Result<Json<TimelineResponse>, String> {
        let filter = optional_jurisdiction(params.jurisdiction.as_deref())?;
        Ok(Json(TimelineResponse {
            events: report::timeline_for(self.synthesizer.catalog(), filter.as_ref()),
        }))
    }

    #[tool(description = "Regulatory trend report: key trends, emerging areas and future outlook, plus requirement changes and focus shifts by period, stringency changes with their drivers, and common patterns with adoption by period. Optionally narrow per-jurisdiction details to one jurisdiction.")]
    async fn trend_report(
        &self,
        Parameters(params): Parameters<JurisdictionFilterParams>,
    ) -> Result<Json<TrendReport>, String> {
        let filter = optional_jurisdiction(params.jurisdiction.as_deref())?;
        Ok(Json(report::trend_report(
            self.synthesizer.catalog(),
            filter.as_ref(),
        )))
    }

    #[tool(description = "Summarize AML/FT topics (key aspects, jurisdictional variations) and requirements (implementation per jurisdiction). Optionally narrow the variations to one jurisdiction.")]
    async fn summarize_topics(
        &self,
        Parameters(params): Parameters<JurisdictionFilterParams>,
    ) -> Result<Json<ThematicSummary>, String> {
        let filter = optional_jurisdiction(params.jurisdiction.as_deref())?;
        Ok(Json(report::thematic_summary(
            self.synthesizer.catalog(),
            filter.as_ref(),
        )))
    }

    #[tool(description = "Summarize one jurisdiction: its regulatory documents with their main requirements, requirement records and timeline.")]
    async fn summarize_jurisdiction(
        &self,
        Parameters(params): Parameters<JurisdictionParams>,
    ) -> Result<Json<JurisdictionSummary>, String> {
        let jurisdiction = required_jurisdiction(&params.jurisdiction)?;
        Ok(Json(report::jurisdiction_summary(
            self.synthesizer.catalog(),
            &jurisdiction,
        )))
    }
}

fn required_jurisdiction(raw: &str) -> Result<Jurisdiction, String> {
    let jurisdiction = Jurisdiction::new(raw);
    if jurisdiction.as_str().is_empty() {
        return Err("jurisdiction must not be empty".to_string());
    }
    Ok(jurisdiction)
}

fn optional_jurisdiction(raw: Option<&str>) -> Result<Option<Jurisdiction>, String> {
    raw.map(required_jurisdiction).transpose()
}

#[tool_handler]
impl ServerHandler for RegragServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "regrag-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "AML/FT compliance MCP server comparing Brazil (br), United States (us) and \
                 European Union (eu) requirements. Pass retrieval results to \
                 synthesize_response for a structured, confidence-scored answer, or to \
                 compare_jurisdictions for the comparison alone. Use get_requirements, \
                 list_topics, conflict_report, regulatory_timeline, trend_report, \
                 summarize_topics and summarize_jurisdiction for reference data."
                    .to_string(),
            ),
        }
    }
}
