//! Periodic sweep of the admission tables.
//!
//! Expired cache entries, stale rate windows and forgettable cooldowns are
//! also handled lazily on access, as are lapsed silences in the store, so
//! this task only bounds memory and table size.

use crate::clock::Clock;
use crate::metrics;
use crate::security::{CooldownTracker, PermissionCache, RateLimiter};
use crate::store::{Store, bounded};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Counts removed by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub cache_entries: usize,
    pub rate_windows: usize,
    pub cooldowns: usize,
    pub silences: u64,
}

/// The tables one sweep visits.
#[derive(Clone)]
pub struct Sweeper {
    pub cache: Arc<PermissionCache>,
    pub rate_limiter: Arc<RateLimiter>,
    pub cooldowns: Arc<CooldownTracker>,
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub store_timeout: Duration,
}

impl Sweeper {
    pub async fn sweep(&self) -> SweepReport {
        let purge = self.store.purge_expired_silences(self.clock.now_secs());
        let silences = match bounded(self.store_timeout, purge).await {
            Ok(removed) => removed,
            Err(e) => {
                metrics::record_store_error("purge_expired_silences");
                warn!(error = %e, "Failed to purge lapsed silences");
                0
            }
        };

        let report = SweepReport {
            cache_entries: self.cache.sweep(),
            rate_windows: self.rate_limiter.cleanup(),
            cooldowns: self.cooldowns.cleanup(),
            silences,
        };
        let stats = self.cache.stats();
        debug!(
            removed_cache = report.cache_entries,
            removed_windows = report.rate_windows,
            removed_cooldowns = report.cooldowns,
            removed_silences = report.silences,
            admin_entries = stats.admin_entries,
            silence_entries = stats.silence_entries,
            "Maintenance sweep complete"
        );
        report
    }
}

/// Spawn the maintenance task.
///
/// Runs every `every` until the runtime shuts down or the handle is aborted.
pub fn spawn_maintenance_task(sweeper: Sweeper, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;
            sweeper.sweep().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{CacheConfig, RateLimitConfig};
    use crate::db::SilenceRecord;
    use crate::store::MemoryStore;
    use crate::types::{Actor, Scope};

    fn sweeper(store: Arc<MemoryStore>, clock: Arc<ManualClock>) -> Sweeper {
        let timeout = Duration::from_millis(100);
        Sweeper {
            cache: Arc::new(PermissionCache::new(
                store.clone(),
                clock.clone(),
                &CacheConfig::default(),
                timeout,
            )),
            rate_limiter: Arc::new(RateLimiter::new(&RateLimitConfig::default(), clock.clone())),
            cooldowns: Arc::new(CooldownTracker::new(clock.clone())),
            store,
            clock,
            store_timeout: timeout,
        }
    }

    #[tokio::test]
    async fn test_sweep_clears_expired_state() {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryStore::new());
        let sweeper = sweeper(store.clone(), clock.clone());

        let alice = Actor::new("alice");
        let group = Scope::group("g1");
        sweeper.cache.is_group_admin(&group, &alice).await;
        sweeper.cache.is_silenced(&group, &alice).await;
        assert!(sweeper.rate_limiter.is_allowed(&alice));
        sweeper
            .cooldowns
            .register_use(&alice, "broadcast", Duration::from_secs(60));
        store
            .put_silence_record(&SilenceRecord {
                scope: group.key(),
                actor: Actor::new("bob"),
                silenced_by: Actor::new("mod"),
                created_at: clock.now_secs(),
                expires_at: Some(clock.now_secs() + 60),
            })
            .await
            .unwrap();

        assert_eq!(sweeper.sweep().await, SweepReport::default());

        clock.advance(Duration::from_secs(3600));
        assert_eq!(
            sweeper.sweep().await,
            SweepReport {
                cache_entries: 2,
                rate_windows: 1,
                cooldowns: 1,
                silences: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_sweep_survives_store_outage() {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryStore::new());
        let sweeper = sweeper(store.clone(), clock.clone());
        assert!(sweeper.rate_limiter.is_allowed(&Actor::new("alice")));
        store.set_unavailable(true);

        clock.advance(Duration::from_secs(3600));
        let report = sweeper.sweep().await;
        assert_eq!(report.silences, 0);
        assert_eq!(report.rate_windows, 1);
    }
}
