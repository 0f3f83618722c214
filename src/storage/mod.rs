use bytes::Bytes;
use thiserror::Error;

use crate::config;

pub mod memory;
pub mod redis;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The store could not be reached or refused a command.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),
    #[error("store command failed: {0}")]
    Backend(String),
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The stored value matched and has been replaced.
    Swapped,
    /// The stored value changed (or vanished) since it was read.
    Conflict,
}

pub trait Store {
    /// Get a value by key.
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>>;

    /// Overwrite a value by key, clearing any pending expiry.
    async fn set(&self, key: &str, value: Bytes) -> StoreResult<()>;

    /// Schedule deletion of a key `seconds` from now, replacing any earlier schedule.
    async fn expire_after(&self, key: &str, seconds: u64) -> StoreResult<()>;

    /// Replace a value only if it still equals `expected`. Pending expiry is kept.
    async fn compare_and_set(
        &self,
        key: &str,
        expected: &[u8],
        value: Bytes,
    ) -> StoreResult<CasOutcome>;

    /// Check that the store is reachable.
    async fn ping(&self) -> StoreResult<()>;
}

#[derive(Clone)]
pub enum AnyStore {
    Memory(memory::MemoryStore),
    Redis(redis::RedisStore),
}

impl AnyStore {
    pub fn from_config(config: &config::Store) -> StoreResult<Self> {
        match config.kind {
            config::StoreKind::Memory => Ok(memory::MemoryStore::new().into()),
            config::StoreKind::Redis => Ok(redis::RedisStore::new(&config.redis)?.into()),
        }
    }
}

impl Store for AnyStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        match self {
            AnyStore::Memory(memory) => memory.get(key).await,
            AnyStore::Redis(redis) => redis.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: Bytes) -> StoreResult<()> {
        match self {
            AnyStore::Memory(memory) => memory.set(key, value).await,
            AnyStore::Redis(redis) => redis.set(key, value).await,
        }
    }

    async fn expire_after(&self, key: &str, seconds: u64) -> StoreResult<()> {
        match self {
            AnyStore::Memory(memory) => memory.expire_after(key, seconds).await,
            AnyStore::Redis(redis) => redis.expire_after(key, seconds).await,
        }
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: &[u8],
        value: Bytes,
    ) -> StoreResult<CasOutcome> {
        match self {
            AnyStore::Memory(memory) => memory.compare_and_set(key, expected, value).await,
            AnyStore::Redis(redis) => redis.compare_and_set(key, expected, value).await,
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        match self {
            AnyStore::Memory(memory) => memory.ping().await,
            AnyStore::Redis(redis) => redis.ping().await,
        }
    }
}

impl From<memory::MemoryStore> for AnyStore {
    fn from(value: memory::MemoryStore) -> Self {
        AnyStore::Memory(value)
    }
}

impl From<redis::RedisStore> for AnyStore {
    fn from(value: redis::RedisStore) -> Self {
        AnyStore::Redis(value)
    }
}
