//! Storage facade - namespaced, versioned, expiring key/value store
//!
//! A [`StorageFacade`] sits on two backends: a durable tier and an ephemeral
//! (session-scoped) tier. Each logical key `k` is stored as
//! `<namespace><k>` inside an [`Entry`] envelope.
//!
//! Read contract: absent, expired, version-mismatched and corrupt entries all
//! come back as the caller's default. Expired, mismatched and corrupt entries
//! are deleted on the read that finds them.
//!
//! Tier precedence: [`StorageFacade::get`] consults the ephemeral tier first,
//! then the durable tier. Ephemeral values override durable ones without the
//! durable value being touched.

mod cache;
mod maintenance;
mod offline;
mod preferences;

pub use maintenance::{SweepReport, TierUsage, Usage};
pub use offline::OFFLINE_PREFIX;
pub use preferences::PREFERENCES_KEY;

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::Result;
use crate::backend::Backend;
use crate::clock::{Clock, SystemClock};
use crate::config::FacadeConfig;
use crate::entry::{Entry, EntryState};
use crate::events::{EventHook, EvictionReason, StorageEvent};

/// Throwaway key written and deleted when probing a backend
const PROBE_KEY: &str = "__storage_test__";

/// One of the two physical key spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Durable,
    Ephemeral,
}

impl Tier {
    pub const ALL: [Tier; 2] = [Tier::Durable, Tier::Ephemeral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Durable => "durable",
            Tier::Ephemeral => "ephemeral",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-write options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    pub expires_in: Option<Duration>,
    /// Encode the payload even below the compression threshold
    pub force_compress: bool,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expires_in(mut self, ttl: Duration) -> Self {
        self.expires_in = Some(ttl);
        self
    }

    pub fn force_compress(mut self) -> Self {
        self.force_compress = true;
        self
    }
}

struct TierSlot {
    backend: Box<dyn Backend>,
    available: bool,
}

/// Namespaced storage over a durable and an ephemeral backend.
///
/// Construct one per process at bootstrap and pass it by reference to the
/// modules that need it.
pub struct StorageFacade {
    config: FacadeConfig,
    durable: TierSlot,
    ephemeral: TierSlot,
    clock: Box<dyn Clock>,
    hook: Option<EventHook>,
}

/// Builder for [`StorageFacade`]
pub struct StorageFacadeBuilder {
    durable: Box<dyn Backend>,
    ephemeral: Box<dyn Backend>,
    config: FacadeConfig,
    clock: Box<dyn Clock>,
    hook: Option<EventHook>,
}

impl StorageFacadeBuilder {
    pub fn config(mut self, config: FacadeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Observe evictions, rejected writes, unavailable tiers and sweeps
    pub fn on_event(mut self, hook: impl Fn(&StorageEvent) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Probe both tiers, then sweep if `sweep_on_start` is set
    pub fn build(self) -> StorageFacade {
        let durable_ok = probe(self.durable.as_ref());
        let ephemeral_ok = probe(self.ephemeral.as_ref());

        let facade = StorageFacade {
            config: self.config,
            durable: TierSlot { backend: self.durable, available: durable_ok },
            ephemeral: TierSlot { backend: self.ephemeral, available: ephemeral_ok },
            clock: self.clock,
            hook: self.hook,
        };

        for tier in Tier::ALL {
            if !facade.is_available(tier) {
                warn!(tier = %tier, "storage tier unavailable; operations on it are no-ops");
                facade.emit(StorageEvent::TierUnavailable { tier });
            }
        }
        if !durable_ok && !ephemeral_ok {
            warn!("no storage support available");
        }

        if facade.config.sweep_on_start {
            facade.sweep_expired();
        }

        facade
    }
}

fn probe(backend: &dyn Backend) -> bool {
    backend.write(PROBE_KEY, PROBE_KEY).is_ok() && backend.delete(PROBE_KEY).is_ok()
}

impl StorageFacade {
    pub fn builder(
        durable: impl Backend + 'static,
        ephemeral: impl Backend + 'static,
    ) -> StorageFacadeBuilder {
        StorageFacadeBuilder {
            durable: Box::new(durable),
            ephemeral: Box::new(ephemeral),
            config: FacadeConfig::default(),
            clock: Box::new(SystemClock),
            hook: None,
        }
    }

    /// Facade with default config and the system clock
    pub fn new(durable: impl Backend + 'static, ephemeral: impl Backend + 'static) -> Self {
        Self::builder(durable, ephemeral).build()
    }

    pub fn config(&self) -> &FacadeConfig {
        &self.config
    }

    /// Whether the tier passed its capability probe
    pub fn is_available(&self, tier: Tier) -> bool {
        self.slot(tier).available
    }

    /// Raw backend underneath a tier, bypassing the namespace
    pub fn backend(&self, tier: Tier) -> &dyn Backend {
        self.slot(tier).backend.as_ref()
    }

    pub fn namespaced_key(&self, key: &str) -> String {
        format!("{}{}", self.config.namespace, key)
    }

    /// Strip the namespace from a physical key
    pub fn logical_key<'a>(&self, full_key: &'a str) -> Option<&'a str> {
        full_key.strip_prefix(self.config.namespace.as_str())
    }

    // ========== Writes ==========

    /// Wrap `value` in an entry and write it to `tier`.
    ///
    /// Returns `Ok(false)` when the tier is unavailable, the key is empty,
    /// the serialized entry exceeds `max_entry_size` or the backend rejects
    /// the write; the prior value at the key is then left untouched. Only a
    /// value serde cannot serialize produces `Err`.
    pub fn set<T: Serialize + ?Sized>(
        &self,
        tier: Tier,
        key: &str,
        value: &T,
        options: SetOptions,
    ) -> Result<bool> {
        let value = serde_json::to_value(value)?;

        let Some(backend) = self.available_backend(tier) else {
            self.reject(tier, key, "tier unavailable");
            return Ok(false);
        };
        if key.is_empty() {
            self.reject(tier, key, "empty key");
            return Ok(false);
        }

        let now = self.clock.now_millis();
        let mut entry = Entry::new(value, now, self.config.schema_version.as_str());
        if let Some(ttl) = options.expires_in {
            let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
            entry = entry.with_expiry(now.saturating_add(ttl_ms));
        }

        let mut serialized = entry.to_json()?;
        if options.force_compress || serialized.len() > self.config.compression_threshold {
            entry = entry.compress()?;
            serialized = entry.to_json()?;
        }

        if serialized.len() > self.config.max_entry_size {
            self.reject(
                tier,
                key,
                &format!(
                    "entry is {} bytes, ceiling is {}",
                    serialized.len(),
                    self.config.max_entry_size
                ),
            );
            return Ok(false);
        }

        match backend.write(&self.namespaced_key(key), &serialized) {
            Ok(()) => Ok(true),
            Err(e) => {
                self.reject(tier, key, &e.to_string());
                Ok(false)
            }
        }
    }

    pub fn set_durable<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: SetOptions,
    ) -> Result<bool> {
        self.set(Tier::Durable, key, value, options)
    }

    pub fn set_ephemeral<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: SetOptions,
    ) -> Result<bool> {
        self.set(Tier::Ephemeral, key, value, options)
    }

    // ========== Reads ==========

    /// Read `key` from one tier, or `default`.
    pub fn get_from<T: DeserializeOwned>(&self, tier: Tier, key: &str, default: T) -> T {
        self.read_typed(tier, key).unwrap_or(default)
    }

    pub fn get_durable<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_from(Tier::Durable, key, default)
    }

    pub fn get_ephemeral<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_from(Tier::Ephemeral, key, default)
    }

    /// Ephemeral tier first, then durable, then `default`.
    ///
    /// A `null` held by the ephemeral tier counts as absent there.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.read_value(Tier::Ephemeral, key)
            .filter(|value| !value.is_null())
            .and_then(|value| self.decode_value(Tier::Ephemeral, key, value))
            .or_else(|| self.read_typed(Tier::Durable, key))
            .unwrap_or(default)
    }

    /// Delete `key` from both tiers. True if either tier held it.
    pub fn remove(&self, key: &str) -> bool {
        let full_key = self.namespaced_key(key);
        let mut removed = false;

        for tier in Tier::ALL {
            let Some(backend) = self.available_backend(tier) else {
                continue;
            };
            match backend.read(&full_key) {
                Ok(Some(_)) => match backend.delete(&full_key) {
                    Ok(()) => removed = true,
                    Err(e) => warn!(tier = %tier, key, error = %e, "failed to remove entry"),
                },
                Ok(None) => {}
                Err(e) => warn!(tier = %tier, key, error = %e, "failed to read entry for removal"),
            }
        }

        removed
    }

    // ========== Internals ==========

    fn slot(&self, tier: Tier) -> &TierSlot {
        match tier {
            Tier::Durable => &self.durable,
            Tier::Ephemeral => &self.ephemeral,
        }
    }

    fn available_backend(&self, tier: Tier) -> Option<&dyn Backend> {
        let slot = self.slot(tier);
        slot.available.then(|| slot.backend.as_ref())
    }

    fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    fn read_typed<T: DeserializeOwned>(&self, tier: Tier, key: &str) -> Option<T> {
        let value = self.read_value(tier, key)?;
        self.decode_value(tier, key, value)
    }

    fn decode_value<T: DeserializeOwned>(&self, tier: Tier, key: &str, value: Value) -> Option<T> {
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                debug!(tier = %tier, key, error = %e, "stored value does not match requested type");
                None
            }
        }
    }

    /// Look up and validate one entry, evicting it if it is stale or corrupt.
    fn read_value(&self, tier: Tier, key: &str) -> Option<Value> {
        let backend = self.available_backend(tier)?;
        if key.is_empty() {
            return None;
        }

        let full_key = self.namespaced_key(key);
        let raw = match backend.read(&full_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(tier = %tier, key, error = %e, "failed to read entry");
                return None;
            }
        };

        match Entry::validate(&raw, self.now(), &self.config.schema_version) {
            EntryState::Live(value) => Some(value),
            EntryState::Expired => {
                self.evict(tier, backend, &full_key, EvictionReason::Expired);
                None
            }
            EntryState::VersionMismatch { found } => {
                warn!(
                    tier = %tier,
                    key,
                    found = %found,
                    expected = %self.config.schema_version,
                    "storage version mismatch, returning default value"
                );
                self.evict(tier, backend, &full_key, EvictionReason::VersionMismatch);
                None
            }
            EntryState::Corrupt(reason) => {
                warn!(tier = %tier, key, reason = %reason, "corrupt entry");
                self.evict(tier, backend, &full_key, EvictionReason::Corrupt);
                None
            }
        }
    }

    fn evict(&self, tier: Tier, backend: &dyn Backend, full_key: &str, reason: EvictionReason) {
        if let Err(e) = backend.delete(full_key) {
            warn!(tier = %tier, key = full_key, error = %e, "failed to evict entry");
            return;
        }
        debug!(tier = %tier, key = full_key, reason = %reason, "evicted entry");
        let key = self.logical_key(full_key).unwrap_or(full_key).to_string();
        self.emit(StorageEvent::Evicted { tier, key, reason });
    }

    fn reject(&self, tier: Tier, key: &str, reason: &str) {
        warn!(tier = %tier, key, reason, "write rejected");
        self.emit(StorageEvent::WriteRejected {
            tier,
            key: key.to_string(),
            reason: reason.to_string(),
        });
    }

    fn emit(&self, event: StorageEvent) {
        if let Some(hook) = &self.hook {
            hook(&event);
        }
    }

    /// Physical keys under the namespace in one tier
    fn namespaced_keys(&self, tier: Tier) -> Vec<String> {
        let Some(backend) = self.available_backend(tier) else {
            return Vec::new();
        };
        match backend.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|k| k.starts_with(self.config.namespace.as_str()))
                .collect(),
            Err(e) => {
                warn!(tier = %tier, error = %e, "failed to list keys");
                Vec::new()
            }
        }
    }

    /// Delete physical keys from one tier, returning how many went
    fn delete_keys(&self, tier: Tier, keys: &[String]) -> usize {
        let Some(backend) = self.available_backend(tier) else {
            return 0;
        };
        keys.iter()
            .filter(|key| match backend.delete(key) {
                Ok(()) => true,
                Err(e) => {
                    warn!(tier = %tier, key = key.as_str(), error = %e, "failed to delete entry");
                    false
                }
            })
            .count()
    }
}
