/// Cross-jurisdiction comparison of grouped retrieval results.
///
/// Each result is reduced to a set of normalized item keys by an `ItemKeyer`; jurisdictions
/// are then compared as sets of keys. With fewer than two jurisdictions there is nothing to
/// compare against: similarities and differences are empty and every jurisdiction's full key
/// set is reported as unique.
use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use regrag_common::catalog::{Jurisdiction, ReferenceCatalog};

use crate::error::AppError;
use crate::model::{CrossJurisdictionAnalysis, SearchResult};

/// Reduces a result to the normalized items it speaks about.
pub trait ItemKeyer: Send + Sync {
    fn keys(&self, result: &SearchResult) -> BTreeSet<String>;
}

/// Uses the whole content as a single item, lowercased with whitespace collapsed.
pub struct ContentKeyer;

impl ItemKeyer for ContentKeyer {
    fn keys(&self, result: &SearchResult) -> BTreeSet<String> {
        let normalized = result
            .content
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if normalized.is_empty() {
            BTreeSet::new()
        } else {
            BTreeSet::from([normalized])
        }
    }
}

/// Maps content to the catalog topics it mentions.
///
/// A topic matches when its name or any of its subtopics occurs as a whole word,
/// case-insensitively. Keys are the topic names as written in the catalog.
pub struct TopicKeyer {
    topics: Vec<(String, Regex)>,
}

impl TopicKeyer {
    pub fn from_catalog(catalog: &ReferenceCatalog) -> Result<Self, AppError> {
        let topics = catalog
            .topics()
            .iter()
            .map(|topic| -> Result<(String, Regex), AppError> {
                let alternatives: Vec<String> = std::iter::once(&topic.name)
                    .chain(topic.subtopics.iter())
                    .map(|term| regex::escape(term.trim()))
                    .filter(|term| !term.is_empty())
                    .collect();
                let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
                Ok((topic.name.clone(), Regex::new(&pattern)?))
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        Ok(Self { topics })
    }
}

impl ItemKeyer for TopicKeyer {
    fn keys(&self, result: &SearchResult) -> BTreeSet<String> {
        self.topics
            .iter()
            .filter(|(_, pattern)| pattern.is_match(&result.content))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

pub fn compare<K>(
    grouped: &BTreeMap<Jurisdiction, Vec<&SearchResult>>,
    keyer: &K,
) -> CrossJurisdictionAnalysis
where
    K: ItemKeyer + ?Sized,
{
    let items: BTreeMap<&Jurisdiction, BTreeSet<String>> = grouped
        .iter()
        .map(|(jurisdiction, results)| {
            let keys = results.iter().flat_map(|r| keyer.keys(r)).collect();
            (jurisdiction, keys)
        })
        .collect();

    if items.len() < 2 {
        return CrossJurisdictionAnalysis {
            unique_aspects: items.into_iter().map(|(j, keys)| (j.clone(), keys)).collect(),
            ..Default::default()
        };
    }

    let mut analysis = CrossJurisdictionAnalysis::default();
    for (jurisdiction, keys) in &items {
        let others: Vec<&BTreeSet<String>> = items
            .iter()
            .filter(|(other, _)| *other != jurisdiction)
            .map(|(_, keys)| keys)
            .collect();

        let unique = keys
            .iter()
            .filter(|key| others.iter().all(|o| !o.contains(*key)))
            .cloned()
            .collect();
        let differing = keys
            .iter()
            .filter(|key| others.iter().any(|o| !o.contains(*key)))
            .cloned()
            .collect();

        analysis.unique_aspects.insert((*jurisdiction).clone(), unique);
        analysis.differences.insert((*jurisdiction).clone(), differing);
    }

    let mut sets = items.values();
    if let Some(first) = sets.next() {
        let rest: Vec<&BTreeSet<String>> = sets.collect();
        analysis.similarities = first
            .iter()
            .filter(|key| rest.iter().all(|s| s.contains(*key)))
            .cloned()
            .collect();
    }

    analysis
}
