/// Redis caching layer for synthesized responses.
///
/// All operations degrade to misses/no-ops when Redis is unavailable.
///
/// Key schema (namespace `regrag:v1:`):
/// - `response:{sha256(settings|query|results json)}` — JSON StructuredResponse (TTL 3600s)
/// - `catalog_version` — version string of the reference catalog the entries were built from
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::model::StructuredResponse;
use crate::synthesizer::SynthesisConfig;
use regrag_common::redis::RedisCache;

pub const KEY_NAMESPACE: &str = "regrag:v1:";
const RESPONSE_TTL_SECS: u64 = 3600;

pub struct ResponseCache {
    redis: RedisCache,
    /// Digest of the synthesis settings the cached responses were built with
    settings: String,
}

impl ResponseCache {
    pub fn new(redis: RedisCache, settings: &SynthesisConfig) -> Self {
        Self {
            redis,
            settings: settings_fingerprint(settings),
        }
    }

    pub async fn get_response(
        &self,
        query: &str,
        records: &[serde_json::Value],
    ) -> Option<StructuredResponse> {
        let key = response_key(&self.settings, query, records);
        let json = self.redis.get(&key).await?;
        serde_json::from_str(&json)
            .inspect_err(|e| warn!(error = %e, key, "cache deserialization failed"))
            .ok()
    }

    pub async fn set_response(
        &self,
        query: &str,
        records: &[serde_json::Value],
        response: &StructuredResponse,
    ) {
        let key = response_key(&self.settings, query, records);
        if let Ok(json) = serde_json::to_string(response) {
            self.redis.set_with_ttl(&key, &json, RESPONSE_TTL_SECS).await;
        }
    }

    /// Drop every cached entry if it was built from a different catalog version.
    pub async fn sync_catalog_version(&self, version: &str) {
        match self.redis.get("catalog_version").await {
            Some(cached) if cached == version => {}
            previous => {
                if previous.is_some() {
                    info!(version, "catalog version changed, invalidating cached responses");
                }
                self.redis.clear_namespace().await;
                self.redis.set("catalog_version", version).await;
            }
        }
    }
}

fn settings_fingerprint(settings: &SynthesisConfig) -> String {
    let encoded = serde_json::to_string(settings).unwrap_or_else(|e| {
        warn!(error = %e, "synthesis settings not serializable, fingerprinting debug form");
        format!("{settings:?}")
    });
    format!("{:x}", Sha256::digest(encoded.as_bytes()))
}

fn response_key(settings: &str, query: &str, records: &[serde_json::Value]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(settings.as_bytes());
    hasher.update(b"|");
    hasher.update(query.trim().as_bytes());
    hasher.update(b"|");
    for record in records {
        hasher.update(record.to_string().as_bytes());
        hasher.update(b"\n");
    }
    let hash = hasher.finalize();
    format!("response:{:x}", hash)
}
