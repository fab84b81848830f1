//! Cache layer
//!
//! Generic key-value caching with per-entry TTL. The only driver is the
//! in-process moka cache, used in front of the settings table.
//!
//! ```rust,ignore
//! use motionhouse::cache::{CacheLayer, MemoryCache};
//!
//! let cache = MemoryCache::new(Duration::from_secs(60));
//! cache.set("key", &"value", Duration::from_secs(60)).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

pub use memory::MemoryCache;

#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Returns `None` if the key is missing or expired
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration)
        -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every key matching a glob pattern (`*`, `?`)
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}
