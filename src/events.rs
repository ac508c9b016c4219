//! Diagnostic events
//!
//! The facade recovers from unavailable tiers, rejected writes and stale or
//! corrupt entries on its own. Hosts that want to observe those recoveries
//! register an observer; without one the facade only logs through `tracing`.

use crate::facade::{SweepReport, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    Expired,
    VersionMismatch,
    Corrupt,
}

impl EvictionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionReason::Expired => "expired",
            EvictionReason::VersionMismatch => "version mismatch",
            EvictionReason::Corrupt => "corrupt",
        }
    }
}

impl std::fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageEvent {
    /// Capability probe failed; the tier is a no-op for this facade's lifetime
    TierUnavailable { tier: Tier },
    /// An entry was deleted on read or during a sweep
    Evicted { tier: Tier, key: String, reason: EvictionReason },
    /// A write returned `false`
    WriteRejected { tier: Tier, key: String, reason: String },
    SweepCompleted(SweepReport),
}

/// Observer callback
pub type EventHook = Box<dyn Fn(&StorageEvent) + Send + Sync>;
