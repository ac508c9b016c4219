//! User preferences
//!
//! All preferences live in a single durable entry holding a JSON object.
//! Every mutation rewrites the whole object, so concurrent writers race at
//! whole-map granularity (last write wins).

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::{SetOptions, StorageFacade};
use crate::Result;

/// Logical key of the preferences entry
pub const PREFERENCES_KEY: &str = "user_preferences";

impl StorageFacade {
    pub fn set_preference<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<bool> {
        let value = serde_json::to_value(value)?;
        let mut preferences = self.get_all_preferences();
        preferences.insert(name.to_string(), value);
        self.set_durable(PREFERENCES_KEY, &preferences, SetOptions::new())
    }

    pub fn get_preference<T: DeserializeOwned>(&self, name: &str, default: T) -> T {
        self.get_all_preferences()
            .remove(name)
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or(default)
    }

    pub fn get_all_preferences(&self) -> Map<String, Value> {
        self.get_durable(PREFERENCES_KEY, Map::new())
    }

    pub fn remove_preference(&self, name: &str) -> bool {
        let mut preferences = self.get_all_preferences();
        preferences.remove(name);
        // A map of JSON values always serializes
        self.set_durable(PREFERENCES_KEY, &preferences, SetOptions::new())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, MemoryBackend};
    use serde_json::json;

    #[test]
    fn test_preferences_merge_into_one_entry() {
        let durable = MemoryBackend::new();
        let facade = StorageFacade::new(durable.clone(), MemoryBackend::new());

        facade.set_preference("sidebarCollapsed", &true).unwrap();
        facade.set_preference("currentSection", "assignments").unwrap();

        let all = facade.get_all_preferences();
        assert_eq!(all.get("sidebarCollapsed"), Some(&json!(true)));
        assert_eq!(all.get("currentSection"), Some(&json!("assignments")));
        assert_eq!(durable.keys().unwrap(), vec!["adb_io_user_preferences".to_string()]);
    }

    #[test]
    fn test_get_and_remove_preference() {
        let facade = StorageFacade::new(MemoryBackend::new(), MemoryBackend::new());

        assert!(!facade.get_preference("sidebarCollapsed", false));
        facade.set_preference("sidebarCollapsed", &true).unwrap();
        assert!(facade.get_preference("sidebarCollapsed", false));

        // Wrong type falls back to the default
        assert_eq!(facade.get_preference("sidebarCollapsed", 3), 3);

        assert!(facade.remove_preference("sidebarCollapsed"));
        assert!(!facade.get_preference("sidebarCollapsed", false));
        assert!(facade.get_all_preferences().is_empty());
    }

    #[test]
    fn test_preferences_unavailable() {
        let facade = StorageFacade::new(MemoryBackend::unavailable(), MemoryBackend::new());

        assert!(!facade.set_preference("a", &1).unwrap());
        assert_eq!(facade.get_preference("a", 0), 0);
        assert!(!facade.remove_preference("a"));
    }
}
