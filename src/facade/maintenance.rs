//! Namespace-wide maintenance: sweep, usage, export/import, clear

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{StorageFacade, Tier};
use crate::backend::Backend;
use crate::entry::{Entry, EntryState};
use crate::events::{EvictionReason, StorageEvent};

/// Outcome of [`StorageFacade::sweep_expired`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub expired: usize,
    pub corrupt: usize,
}

impl SweepReport {
    pub fn removed(&self) -> usize {
        self.expired + self.corrupt
    }
}

/// Namespaced byte usage of one tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierUsage {
    /// Sum of key and value lengths
    pub used_bytes: usize,
    pub item_count: usize,
    /// `max_entry_size` minus `used_bytes`, floored at zero
    pub available_bytes: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub durable: TierUsage,
    pub ephemeral: TierUsage,
}

impl StorageFacade {
    /// Scan every namespaced entry in both tiers once, deleting expired and
    /// corrupt ones. A key that vanishes or fails to read mid-sweep is skipped.
    pub fn sweep_expired(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let now = self.now();

        for tier in Tier::ALL {
            let Some(backend) = self.available_backend(tier) else {
                continue;
            };

            for full_key in self.namespaced_keys(tier) {
                let raw = match backend.read(&full_key) {
                    Ok(Some(raw)) => raw,
                    Ok(None) => continue,
                    Err(e) => {
                        debug!(tier = %tier, key = full_key.as_str(), error = %e, "skipping unreadable key");
                        continue;
                    }
                };
                report.scanned += 1;

                match Entry::validate(&raw, now, &self.config.schema_version) {
                    EntryState::Expired => {
                        self.evict(tier, backend, &full_key, EvictionReason::Expired);
                        report.expired += 1;
                    }
                    EntryState::Corrupt(_) => {
                        self.evict(tier, backend, &full_key, EvictionReason::Corrupt);
                        report.corrupt += 1;
                    }
                    EntryState::Live(_) | EntryState::VersionMismatch { .. } => {}
                }
            }
        }

        info!(
            scanned = report.scanned,
            expired = report.expired,
            corrupt = report.corrupt,
            "storage sweep complete"
        );
        self.emit(StorageEvent::SweepCompleted(report));
        report
    }

    /// Bytes and item counts of namespaced keys per tier
    pub fn usage(&self) -> Usage {
        Usage {
            durable: self.tier_usage(Tier::Durable),
            ephemeral: self.tier_usage(Tier::Ephemeral),
        }
    }

    fn tier_usage(&self, tier: Tier) -> TierUsage {
        let Some(backend) = self.available_backend(tier) else {
            return TierUsage::default();
        };

        let mut usage = TierUsage::default();
        for full_key in self.namespaced_keys(tier) {
            if let Ok(Some(raw)) = backend.read(&full_key) {
                usage.used_bytes += full_key.len() + raw.len();
                usage.item_count += 1;
            }
        }
        usage.available_bytes = self.config.max_entry_size.saturating_sub(usage.used_bytes);
        usage
    }

    /// All namespaced durable entries, raw, as one JSON object of
    /// physical key to stored string.
    pub fn export_namespace(&self) -> String {
        let mut data = BTreeMap::new();
        if let Some(backend) = self.available_backend(Tier::Durable) {
            for full_key in self.namespaced_keys(Tier::Durable) {
                if let Ok(Some(raw)) = backend.read(&full_key) {
                    data.insert(full_key, raw);
                }
            }
        }
        // A map of strings always serializes
        serde_json::to_string(&data).unwrap_or_else(|_| "{}".to_string())
    }

    /// Write back a previous export into the durable tier.
    ///
    /// Keys outside the namespace are skipped. Every namespaced value must
    /// parse as an entry before anything is written; if the backend fails
    /// partway, keys already written are restored. Returns `false` with the
    /// tier unchanged on any failure.
    pub fn import_namespace(&self, json: &str) -> bool {
        let Some(backend) = self.available_backend(Tier::Durable) else {
            return false;
        };

        let data: BTreeMap<String, Value> = match serde_json::from_str(json) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "import payload is not a JSON object");
                return false;
            }
        };

        let mut staged = Vec::new();
        for (key, value) in data {
            if !key.starts_with(self.config.namespace.as_str()) {
                debug!(key = key.as_str(), "skipping key outside namespace");
                continue;
            }
            let Value::String(raw) = value else {
                warn!(key = key.as_str(), "import value is not a string");
                return false;
            };
            if let Err(e) = Entry::parse(&raw) {
                warn!(key = key.as_str(), error = %e, "import value is not a valid entry");
                return false;
            }
            staged.push((key, raw));
        }

        let mut applied: Vec<(String, Option<String>)> = Vec::with_capacity(staged.len());
        for (key, raw) in staged {
            let previous = match backend.read(&key) {
                Ok(previous) => previous,
                Err(e) => {
                    warn!(key = key.as_str(), error = %e, "import aborted");
                    rollback(backend, applied);
                    return false;
                }
            };
            if let Err(e) = backend.write(&key, &raw) {
                warn!(key = key.as_str(), error = %e, "import aborted");
                rollback(backend, applied);
                return false;
            }
            applied.push((key, previous));
        }

        info!(imported = applied.len(), "imported namespace");
        true
    }

    /// Remove every namespaced key from both tiers
    pub fn clear_all(&self) -> usize {
        let mut removed = 0;
        for tier in Tier::ALL {
            let keys = self.namespaced_keys(tier);
            removed += self.delete_keys(tier, &keys);
        }
        info!(removed, "cleared all namespaced entries");
        removed
    }
}

/// Undo an interrupted import, newest write first
fn rollback(backend: &dyn Backend, applied: Vec<(String, Option<String>)>) {
    for (key, previous) in applied.into_iter().rev() {
        let restored = match &previous {
            Some(raw) => backend.write(&key, raw),
            None => backend.delete(&key),
        };
        if let Err(e) = restored {
            warn!(key = key.as_str(), error = %e, "failed to restore key after aborted import");
        }
    }
}
