use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use regrag_common::catalog::{Jurisdiction, ReferenceCatalog};

use crate::error::AppError;
use crate::synthesizer::SynthesisConfig;

/// Application configuration loaded explicitly from environment variables.
///
/// Every variable is optional. Synthesis settings that are not set fall back to the
/// catalog-derived defaults of `SynthesisConfig::for_catalog`.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Redis connection URL (e.g. "redis://127.0.0.1:6379"). `None` disables caching.
    pub redis_url: Option<String>,
    /// Reference catalog JSON file. `None` uses the dataset embedded in the binary.
    pub catalog_path: Option<PathBuf>,
    pub jurisdictions: Option<Vec<Jurisdiction>>,
    pub excerpt_max_chars: Option<usize>,
    pub key_point_max_chars: Option<usize>,
    pub summary_top_n: Option<usize>,
    pub primary_source_weight: Option<f64>,
    pub recent_document_weight: Option<f64>,
    pub recent_since_year: Option<i32>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// - `REDIS_URL`: Redis connection string (omit to disable caching)
    /// - `REFERENCE_CATALOG_PATH`: catalog JSON file (omit to use the embedded dataset)
    /// - `REGRAG_JURISDICTIONS`: comma-separated jurisdiction codes
    /// - `REGRAG_EXCERPT_MAX_CHARS`, `REGRAG_KEY_POINT_MAX_CHARS`, `REGRAG_SUMMARY_TOP_N`
    /// - `REGRAG_PRIMARY_SOURCE_WEIGHT`, `REGRAG_RECENT_DOCUMENT_WEIGHT`
    /// - `REGRAG_RECENT_SINCE_YEAR`
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jurisdictions = lookup("REGRAG_JURISDICTIONS").map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(Jurisdiction::new)
                .collect::<Vec<_>>()
        });
        if jurisdictions.as_ref().is_some_and(Vec::is_empty) {
            return Err(AppError::Config(
                "REGRAG_JURISDICTIONS must list at least one code".to_string(),
            ));
        }

        Ok(Self {
            redis_url: lookup("REDIS_URL"),
            catalog_path: lookup("REFERENCE_CATALOG_PATH").map(PathBuf::from),
            jurisdictions,
            excerpt_max_chars: parse_var(&lookup, "REGRAG_EXCERPT_MAX_CHARS")?,
            key_point_max_chars: parse_var(&lookup, "REGRAG_KEY_POINT_MAX_CHARS")?,
            summary_top_n: parse_var(&lookup, "REGRAG_SUMMARY_TOP_N")?,
            primary_source_weight: parse_var(&lookup, "REGRAG_PRIMARY_SOURCE_WEIGHT")?,
            recent_document_weight: parse_var(&lookup, "REGRAG_RECENT_DOCUMENT_WEIGHT")?,
            recent_since_year: parse_var(&lookup, "REGRAG_RECENT_SINCE_YEAR")?,
        })
    }

    pub fn load_catalog(&self) -> Result<ReferenceCatalog, AppError> {
        let catalog = match &self.catalog_path {
            Some(path) => ReferenceCatalog::from_path(path)?,
            None => ReferenceCatalog::embedded()?,
        };
        Ok(catalog)
    }

    /// Catalog defaults with any configured overrides applied.
    pub fn synthesis_config(&self, catalog: &ReferenceCatalog) -> SynthesisConfig {
        let mut config = SynthesisConfig::for_catalog(catalog);
        if let Some(jurisdictions) = &self.jurisdictions {
            config.jurisdictions = jurisdictions.clone();
        }
        if let Some(n) = self.excerpt_max_chars {
            config.excerpt_max_chars = n;
        }
        if let Some(n) = self.key_point_max_chars {
            config.key_point_max_chars = n;
        }
        if let Some(n) = self.summary_top_n {
            config.summary_top_n = n;
        }
        if let Some(w) = self.primary_source_weight {
            config.weights.primary_source = w;
        }
        if let Some(w) = self.recent_document_weight {
            config.weights.recent_document = w;
        }
        if let Some(year) = self.recent_since_year {
            config.recent_since_year = year;
        }
        config
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| AppError::Config(format!("{name}={raw:?} is invalid: {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_uses_catalog_defaults() {
        let config = config_from(&[]).unwrap();
        assert!(config.redis_url.is_none());
        let catalog = config.load_catalog().unwrap();
        let synthesis = config.synthesis_config(&catalog);
        assert_eq!(synthesis, SynthesisConfig::for_catalog(&catalog));
        assert_eq!(synthesis.excerpt_max_chars, 500);
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("REDIS_URL", "redis://127.0.0.1:6379"),
            ("REGRAG_JURISDICTIONS", "BR, uk ,"),
            ("REGRAG_EXCERPT_MAX_CHARS", "120"),
            ("REGRAG_PRIMARY_SOURCE_WEIGHT", "1.5"),
            ("REGRAG_RECENT_SINCE_YEAR", "2020"),
        ])
        .unwrap();
        let catalog = config.load_catalog().unwrap();
        let synthesis = config.synthesis_config(&catalog);

        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
        assert_eq!(
            synthesis.jurisdictions,
            vec![Jurisdiction::new("br"), Jurisdiction::new("uk")]
        );
        assert_eq!(synthesis.excerpt_max_chars, 120);
        assert_eq!(synthesis.weights.primary_source, 1.5);
        assert_eq!(synthesis.weights.recent_document, 1.1);
        assert_eq!(synthesis.recent_since_year, 2020);
    }

    #[test]
    fn unparsable_value_is_a_config_error() {
        let err = config_from(&[("REGRAG_SUMMARY_TOP_N", "three")]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("REGRAG_SUMMARY_TOP_N"));
    }

    #[test]
    fn empty_jurisdiction_list_is_rejected() {
        assert!(config_from(&[("REGRAG_JURISDICTIONS", " , ")]).is_err());
    }

    #[test]
    fn missing_catalog_file_is_an_error() {
        let config = config_from(&[("REFERENCE_CATALOG_PATH", "/nonexistent/catalog.json")]).unwrap();
        assert!(config.load_catalog().is_err());
    }
}
