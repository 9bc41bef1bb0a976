/// Namespaced Redis cache wrapper with graceful degradation.
///
/// Every key is stored under the namespace given at construction (e.g. `regrag:v1:`). All
/// operations return `Option<T>` or `bool`: on any Redis error the operation logs a warning and
/// reports a miss. Callers fall through to computing the value. The system is fully functional
/// without Redis.
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::warn;

#[derive(Clone)]
pub struct RedisCache {
    client: Option<redis::Client>,
    namespace: String,
}

impl RedisCache {
    /// Attempt to create a client. If the URL is `None` or invalid, returns a `RedisCache` that
    /// always degrades gracefully (no-ops).
    pub fn new(url: Option<&str>, namespace: &str) -> Self {
        let client = url.and_then(|u| {
            redis::Client::open(u)
                .inspect_err(|e| warn!(error = %e, url = u, "failed to create redis client, cache disabled"))
                .ok()
        });
        Self {
            client,
            namespace: namespace.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Full key for a namespace-relative key.
    pub fn key(&self, relative: &str) -> String {
        format!("{}{relative}", self.namespace)
    }

    /// Test the connection by sending a PING. Returns `true` if Redis is reachable.
    pub async fn is_available(&self) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        let result: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        result.is_ok()
    }

    async fn connection(&self) -> Option<MultiplexedConnection> {
        let client = self.client.as_ref()?;
        client
            .get_multiplexed_async_connection()
            .await
            .inspect_err(|e| warn!(error = %e, "redis connection failed"))
            .ok()
    }

    /// Get a value. Returns `None` if Redis is unavailable or the key doesn't exist.
    pub async fn get(&self, relative: &str) -> Option<String> {
        let mut conn = self.connection().await?;
        let key = self.key(relative);
        let value: Option<String> = conn
            .get(&key)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis GET failed"))
            .ok()?;
        value
    }

    /// Set a value with no expiry. Returns `true` if successful.
    pub async fn set(&self, relative: &str, value: &str) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        let key = self.key(relative);
        conn.set::<_, _, ()>(&key, value)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis SET failed"))
            .is_ok()
    }

    /// Set a value with a TTL in seconds. Returns `true` if successful.
    pub async fn set_with_ttl(&self, relative: &str, value: &str, ttl_secs: u64) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        let key = self.key(relative);
        conn.set_ex::<_, _, ()>(&key, value, ttl_secs)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis SETEX failed"))
            .is_ok()
    }

    /// Delete every key in the namespace using SCAN (not KEYS, which blocks).
    pub async fn clear_namespace(&self) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };

        let pattern = format!("{}*", self.namespace);
        let mut cursor: u64 = 0;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = match redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, pattern, "redis SCAN failed");
                    return false;
                }
            };

            if !keys.is_empty() {
                if let Err(e) = conn.del::<_, ()>(&keys).await {
                    warn!(error = %e, "redis batch DEL failed during namespace clear");
                    return false;
                }
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::RedisCache;

    #[test]
    fn keys_are_namespaced() {
        let cache = RedisCache::new(None, "regrag:v1:");
        assert_eq!(cache.key("response:abc"), "regrag:v1:response:abc");
    }

    #[tokio::test]
    async fn degrades_without_redis() {
        let cache = RedisCache::new(None, "regrag:v1:");
        assert!(!cache.is_available().await);
        assert_eq!(cache.get("missing").await, None);
        assert!(!cache.set("k", "v").await);
        assert!(!cache.set_with_ttl("k", "v", 60).await);
        assert!(!cache.clear_namespace().await);
    }
}
