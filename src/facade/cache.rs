//! Short-lived cache entries in the ephemeral tier

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{SetOptions, StorageFacade, Tier};
use crate::Result;

impl StorageFacade {
    /// Cache `value` in the ephemeral tier for `default_cache_ttl_secs`
    pub fn set_cache<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<bool> {
        let ttl = Duration::from_secs(self.config.default_cache_ttl_secs);
        self.set_cache_for(key, value, ttl)
    }

    pub fn set_cache_for<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<bool> {
        self.set_ephemeral(key, value, SetOptions::new().expires_in(ttl))
    }

    pub fn get_cache<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_ephemeral(key, default)
    }

    /// Drop namespaced ephemeral entries whose logical key contains `filter`,
    /// or all of them without a filter. Returns the number removed.
    pub fn clear_cache(&self, filter: Option<&str>) -> usize {
        let doomed: Vec<String> = self
            .namespaced_keys(Tier::Ephemeral)
            .into_iter()
            .filter(|full_key| match (filter, self.logical_key(full_key)) {
                (None, _) => true,
                (Some(pattern), Some(logical)) => logical.contains(pattern),
                (Some(_), None) => false,
            })
            .collect();

        let removed = self.delete_keys(Tier::Ephemeral, &doomed);
        debug!(removed, filter = ?filter, "cleared cache entries");
        removed
    }
}
