use std::time::Duration;

use bytes::Bytes;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::{AsyncCommands, Script};

use super::{CasOutcome, Store, StoreError, StoreResult};
use crate::config::RedisStore as RedisConfig;

/// Replace `KEYS[1]` with `ARGV[2]` only while it still holds `ARGV[1]`.
///
/// Returns 1 when swapped, 0 otherwise. `KEEPTTL` leaves a pending `EXPIRE`
/// in place.
const COMPARE_AND_SET: &str = r"
local current = redis.call('GET', KEYS[1])
if current == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[2], 'KEEPTTL')
    return 1
end
return 0
";

#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    pub fn new(config: &RedisConfig) -> StoreResult<Self> {
        let pool = Config::from_url(&config.url)
            .builder()
            .map(|builder| {
                builder
                    .max_size(config.pool_size)
                    .wait_timeout(Some(Duration::from_secs(config.connection_timeout_secs)))
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(RedisStore { pool })
    }

    async fn conn(&self) -> StoreResult<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(source: redis::RedisError) -> Self {
        StoreError::Backend(source.to_string())
    }
}

impl Store for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        let mut conn = self.conn().await?;
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let () = conn.set(key, value.to_vec()).await?;
        Ok(())
    }

    async fn expire_after(&self, key: &str, seconds: u64) -> StoreResult<()> {
        let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        let mut conn = self.conn().await?;
        let _: bool = conn.expire(key, seconds).await?;
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: &[u8],
        value: Bytes,
    ) -> StoreResult<CasOutcome> {
        let mut conn = self.conn().await?;
        let swapped: i64 = Script::new(COMPARE_AND_SET)
            .key(key)
            .arg(expected.to_vec())
            .arg(value.to_vec())
            .invoke_async(&mut conn)
            .await?;

        Ok(if swapped == 1 {
            CasOutcome::Swapped
        } else {
            CasOutcome::Conflict
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Backend(format!("unexpected PING reply: {reply}")))
        }
    }
}
