//! In-memory backend

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::Backend;
use crate::{Error, Result};

/// Shared in-memory string map.
///
/// Cloning yields another handle onto the same map, so a host (or a test)
/// can keep a handle to inspect or seed raw keys after giving one to a facade.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
    unavailable: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes that would push total key+value bytes past `quota`
    pub fn with_quota(quota: usize) -> Self {
        let backend = Self::new();
        backend.state().quota = Some(quota);
        backend
    }

    /// A backend whose every call fails, like a disabled browser storage API
    pub fn unavailable() -> Self {
        let backend = Self::new();
        backend.state().unavailable = true;
        backend
    }

    /// Number of keys held, namespaced or not
    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state().entries.contains_key(key)
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned map is still a consistent map; keep serving it.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(state: &MemoryState) -> Result<()> {
        if state.unavailable {
            return Err(Error::Backend("storage is not available".to_string()));
        }
        Ok(())
    }
}

impl MemoryState {
    fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl Backend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let state = self.state();
        Self::check_available(&state)?;
        Ok(state.entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.state();
        Self::check_available(&state)?;

        if let Some(quota) = state.quota {
            let replaced = state.entries.get(key).map_or(0, |old| key.len() + old.len());
            let used = state.used_bytes() - replaced + key.len() + value.len();
            if used > quota {
                return Err(Error::QuotaExceeded { used, quota });
            }
        }

        state.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.state();
        Self::check_available(&state)?;
        state.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let state = self.state();
        Self::check_available(&state)?;
        Ok(state.entries.keys().cloned().collect())
    }
}
