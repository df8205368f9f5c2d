use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheError, ResultCache};
use crate::models::market::MarketProfile;

pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Redis-backed cache: each profile is stored as JSON under its key with a TTL.
///
/// The multiplexed connection is cloned per command, so no lock is held while
/// a command is in flight.
#[derive(Clone)]
pub struct RedisResultCache {
    connection: MultiplexedConnection,
    ttl_secs: u64,
}

impl RedisResultCache {
    pub async fn connect(redis_url: &str, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        info!("Redis result cache connected (TTL: {ttl_secs}s)");
        Ok(Self {
            connection,
            ttl_secs,
        })
    }

    async fn try_get(&self, key: &str) -> Result<Option<MarketProfile>, CacheError> {
        let mut conn = self.connection.clone();
        let payload: Option<String> = conn.get(key).await?;
        match payload {
            Some(data) => Ok(Some(decode_profile(&data)?)),
            None => Ok(None),
        }
    }

    async fn try_put(&self, key: &str, profile: &MarketProfile) -> Result<(), CacheError> {
        let payload = encode_profile(profile)?;
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, payload, self.ttl_secs).await?;
        Ok(())
    }
}

fn encode_profile(profile: &MarketProfile) -> Result<String, CacheError> {
    Ok(serde_json::to_string(profile)?)
}

fn decode_profile(payload: &str) -> Result<MarketProfile, CacheError> {
    Ok(serde_json::from_str(payload)?)
}

#[async_trait]
impl ResultCache for RedisResultCache {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Option<MarketProfile> {
        match self.try_get(key).await {
            Ok(found) => found,
            Err(CacheError::Serialization(e)) => {
                warn!("Cache entry {key} is unreadable, treating as miss: {e}");
                None
            }
            Err(e) => {
                error!("Redis GET error: {e}");
                None
            }
        }
    }

    async fn put(&self, key: &str, profile: &MarketProfile) {
        match self.try_put(key, profile).await {
            Ok(()) => debug!("Cache SET: {key} (TTL: {}s)", self.ttl_secs),
            Err(e) => error!("Redis SET error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::empty_profile;
    use crate::models::market::SkillAggregate;

    #[test]
    fn test_payload_round_trip() {
        let mut profile = empty_profile("Developer", "Toronto, Ontario, Canada");
        profile.total_postings_analyzed = 4;
        profile.advisory_message = None;
        profile.source_provider = Some("jsearch".to_string());
        profile.ranked_skills.push(SkillAggregate {
            name: "Rust".to_string(),
            category: "programming_languages".to_string(),
            occurrence_count: 3,
            prevalence: 75.0,
            first_seen: 0,
        });

        let payload = encode_profile(&profile).unwrap();
        assert_eq!(decode_profile(&payload).unwrap(), profile);
    }

    #[test]
    fn test_unreadable_payload_is_serialization_error() {
        assert!(matches!(
            decode_profile("{\"query\": 42"),
            Err(CacheError::Serialization(_))
        ));
        assert!(matches!(
            decode_profile("{\"query\": \"Developer\"}"),
            Err(CacheError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        let result = RedisResultCache::connect("not a redis url", DEFAULT_TTL_SECS).await;
        assert!(matches!(result, Err(CacheError::Redis(_))));
    }
}
