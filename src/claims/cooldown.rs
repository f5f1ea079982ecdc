//! Per-network, per-address claim cooldowns.
//!
//! # States of a (network, address) key
//! ```text
//! absent ──try_reserve──▶ InFlight ──commit──▶ Claimed(t)
//!    ▲                       │                    │
//!    └────────release────────┘                    │ now - t >= window
//!                                                 ▼
//!                          InFlight ◀──try_reserve── (expired, still stored
//!                                                     until pruned)
//! ```
//!
//! # Design Decisions
//! - Check and record are one atomic reservation per key, so two
//!   simultaneous claims for one address on one network cannot both dispatch
//! - A reservation dropped without `commit` restores the previous state,
//!   covering failed and panicked submissions alike
//! - Addresses are compared case-insensitively
//! - Nothing is persisted; expired entries are evicted by the pruner

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Canonical form of an address used as a cooldown key.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CooldownKey {
    network: String,
    address: String,
}

impl CooldownKey {
    fn new(network: &str, address: &str) -> Self {
        Self {
            network: network.to_string(),
            address: normalize_address(address),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Last accepted claim at this timestamp (ms).
    Claimed { at_ms: u64 },
    /// A claim is being dispatched; `previous` is restored on release.
    InFlight { previous: Option<u64> },
}

/// Why a key cannot be reserved right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownBlock {
    /// A previous claim is younger than the window.
    CoolingDown { remaining: Duration },
    /// Another claim for the same key is being dispatched.
    InFlight,
}

/// In-memory cooldown map shared by every claim.
#[derive(Debug, Clone)]
pub struct CooldownTracker {
    entries: Arc<DashMap<CooldownKey, Slot>>,
    window_ms: u64,
}

impl CooldownTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            window_ms: window.as_millis() as u64,
        }
    }

    fn block(&self, slot: Slot, now_ms: u64) -> Option<CooldownBlock> {
        match slot {
            Slot::InFlight { .. } => Some(CooldownBlock::InFlight),
            Slot::Claimed { at_ms } => {
                let elapsed = now_ms.saturating_sub(at_ms);
                (elapsed < self.window_ms).then(|| CooldownBlock::CoolingDown {
                    remaining: Duration::from_millis(self.window_ms - elapsed),
                })
            }
        }
    }

    /// True when `address` has no live claim on `network` at `now_ms`.
    pub fn is_eligible(&self, network: &str, address: &str, now_ms: u64) -> bool {
        self.check(network, address, now_ms).is_none()
    }

    /// Why `address` is blocked on `network`, if it is.
    pub fn check(&self, network: &str, address: &str, now_ms: u64) -> Option<CooldownBlock> {
        self.entries
            .get(&CooldownKey::new(network, address))
            .and_then(|slot| self.block(*slot, now_ms))
    }

    /// Record an accepted claim at `now_ms`, replacing any earlier one.
    pub fn record_claim(&self, network: &str, address: &str, now_ms: u64) {
        self.entries
            .insert(CooldownKey::new(network, address), Slot::Claimed { at_ms: now_ms });
        metrics::record_cooldown_entries(self.entries.len());
    }

    /// Atomically check eligibility and mark the key in flight.
    pub fn try_reserve(
        &self,
        network: &str,
        address: &str,
        now_ms: u64,
    ) -> Result<CooldownReservation, CooldownBlock> {
        let key = CooldownKey::new(network, address);

        let previous = match self.entries.entry(key.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::InFlight { previous: None });
                None
            }
            Entry::Occupied(mut occupied) => {
                let slot = *occupied.get();
                if let Some(block) = self.block(slot, now_ms) {
                    return Err(block);
                }
                let previous = match slot {
                    Slot::Claimed { at_ms } => Some(at_ms),
                    Slot::InFlight { previous } => previous,
                };
                occupied.insert(Slot::InFlight { previous });
                previous
            }
        };

        Ok(CooldownReservation {
            entries: self.entries.clone(),
            key,
            previous,
            settled: false,
        })
    }

    /// Evict entries whose window has passed. Returns how many were removed.
    pub fn prune_expired(&self, now_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, slot| match *slot {
            Slot::Claimed { at_ms } => now_ms.saturating_sub(at_ms) < self.window_ms,
            Slot::InFlight { .. } => true,
        });
        let after = self.entries.len();
        metrics::record_cooldown_entries(after);
        before.saturating_sub(after)
    }

    /// Number of tracked keys, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Periodically prune expired entries until shutdown.
    pub async fn run_pruner(self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = interval.as_secs(), "Cooldown pruner starting");

        let mut ticker = time::interval(interval);
        // The first tick completes immediately; nothing to prune at startup.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.prune_expired(now_millis());
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.len(), "Pruned expired cooldowns");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cooldown pruner received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

/// Exclusive claim on one (network, address) key while a transfer is in
/// flight. Dropping it without [`commit`](Self::commit) releases the key.
#[derive(Debug)]
pub struct CooldownReservation {
    entries: Arc<DashMap<CooldownKey, Slot>>,
    key: CooldownKey,
    previous: Option<u64>,
    settled: bool,
}

impl CooldownReservation {
    /// Turn the reservation into a recorded claim at `now_ms`.
    pub fn commit(mut self, now_ms: u64) {
        self.entries
            .insert(self.key.clone(), Slot::Claimed { at_ms: now_ms });
        self.settled = true;
        metrics::record_cooldown_entries(self.entries.len());
    }

    /// Give the key back, restoring the previous claim (if any).
    pub fn release(self) {}
}

impl Drop for CooldownReservation {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        if let Entry::Occupied(mut occupied) = self.entries.entry(self.key.clone()) {
            if matches!(occupied.get(), Slot::InFlight { .. }) {
                match self.previous {
                    Some(at_ms) => {
                        occupied.insert(Slot::Claimed { at_ms });
                    }
                    None => {
                        occupied.remove();
                    }
                }
            }
        }
    }
}
