use async_trait::async_trait;

use crate::services::cache::client::{CacheClient, CacheError, CacheResult};

/// Valkey/Redis-backed cache client.
///
/// Opening the client does not connect; every probe takes a fresh multiplexed
/// connection so a cache that comes up after the gateway is picked up.
#[derive(Clone, Debug)]
pub struct ValkeyClient {
    client: redis::Client,
}

impl ValkeyClient {
    // Create a Valkey client from a URL like `redis://localhost:6379`
    pub fn new(url: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(url).map_err(|e| CacheError::BackendConnection(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl CacheClient for ValkeyClient {
    fn backend_name(&self) -> &'static str {
        "valkey"
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::BackendConnection(e.to_string()))?;

        let resp: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::BackendCommand(e.to_string()))?;

        if resp.eq_ignore_ascii_case("PONG") {
            Ok(())
        } else {
            Err(CacheError::UnexpectedReply(resp))
        }
    }
}
