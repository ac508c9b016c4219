//! Offline queue: API calls staged in the durable tier for later replay

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use super::{SetOptions, StorageFacade, Tier};
use crate::Result;

/// Marker between the namespace and the queued item's key
pub const OFFLINE_PREFIX: &str = "offline_";

impl StorageFacade {
    pub fn set_offline_data<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<bool> {
        self.set_durable(&offline_key(key), value, SetOptions::new())
    }

    pub fn get_offline_data<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_durable(&offline_key(key), default)
    }

    /// Keys of staged items, without the offline marker
    pub fn offline_keys(&self) -> Vec<String> {
        self.namespaced_keys(Tier::Durable)
            .iter()
            .filter_map(|full_key| self.logical_key(full_key))
            .filter_map(|logical| logical.strip_prefix(OFFLINE_PREFIX))
            .map(str::to_string)
            .collect()
    }

    pub fn clear_offline_data(&self) -> usize {
        let doomed: Vec<String> = self
            .offline_keys()
            .iter()
            .map(|key| self.namespaced_key(&offline_key(key)))
            .collect();

        let removed = self.delete_keys(Tier::Durable, &doomed);
        info!(removed, "cleared offline queue");
        removed
    }
}

fn offline_key(key: &str) -> String {
    format!("{}{}", OFFLINE_PREFIX, key)
}
