//! Per-(actor, command) reuse delays.
//!
//! Unlike the rate limiter this is keyed by command, so a long broadcast
//! cooldown never blocks an unrelated short command from the same actor.
//! Entries carry the cooldown they were registered with and are forgotten
//! once twice that duration has passed, on access or by `cleanup`.

use crate::clock::Clock;
use crate::types::Actor;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

type CooldownKey = (Actor, String);

#[derive(Debug, Clone, Copy)]
struct CooldownEntry {
    last_use_ms: i64,
    cooldown_ms: i64,
}

impl CooldownEntry {
    fn remaining_ms(&self, now_ms: i64) -> i64 {
        (self.last_use_ms + self.cooldown_ms - now_ms).max(0)
    }

    fn is_forgettable(&self, now_ms: i64) -> bool {
        now_ms - self.last_use_ms >= self.cooldown_ms.saturating_mul(2)
    }
}

/// Thread-safe cooldown table.
#[derive(Debug)]
pub struct CooldownTracker {
    entries: DashMap<CooldownKey, CooldownEntry>,
    clock: Arc<dyn Clock>,
}

impl CooldownTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Whole seconds until `actor` may run `command` again (0 = now).
    pub fn seconds_remaining(&self, actor: &Actor, command: &str) -> u64 {
        let key = (actor.clone(), command.to_string());
        let now_ms = self.clock.now_ms();

        let remaining_ms = match self.entries.get(&key) {
            Some(entry) => entry.remaining_ms(now_ms),
            None => return 0,
        };
        if remaining_ms == 0 {
            self.entries
                .remove_if(&key, |_, entry| entry.is_forgettable(now_ms));
        }
        to_secs_ceil(remaining_ms)
    }

    /// Record that `actor` just ran `command`. A zero cooldown records nothing.
    pub fn register_use(&self, actor: &Actor, command: &str, cooldown: Duration) {
        if cooldown.is_zero() {
            return;
        }
        self.entries.insert(
            (actor.clone(), command.to_string()),
            CooldownEntry {
                last_use_ms: self.clock.now_ms(),
                cooldown_ms: cooldown.as_millis() as i64,
            },
        );
    }

    /// Atomically check the cooldown and, if clear, register this use.
    ///
    /// Returns `Err(seconds_remaining)` when still cooling down. Two callers
    /// racing on the same key cannot both get `Ok`.
    pub fn try_begin(&self, actor: &Actor, command: &str, cooldown: Duration) -> Result<(), u64> {
        if cooldown.is_zero() {
            return Ok(());
        }
        let now_ms = self.clock.now_ms();
        let fresh = CooldownEntry {
            last_use_ms: now_ms,
            cooldown_ms: cooldown.as_millis() as i64,
        };

        match self.entries.entry((actor.clone(), command.to_string())) {
            Entry::Occupied(mut occupied) => {
                let remaining_ms = occupied.get().remaining_ms(now_ms);
                if remaining_ms > 0 {
                    return Err(to_secs_ceil(remaining_ms));
                }
                occupied.insert(fresh);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
            }
        }
        Ok(())
    }

    /// Forget entries older than twice their cooldown.
    pub fn cleanup(&self) -> usize {
        let now_ms = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_forgettable(now_ms));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(count = removed, "forgot elapsed cooldowns");
        }
        removed
    }

    /// Number of (actor, command) pairs currently tracked.
    pub fn tracked(&self) -> usize {
        self.entries.len()
    }
}

fn to_secs_ceil(ms: i64) -> u64 {
    if ms <= 0 {
        0
    } else {
        ((ms + 999) / 1000) as u64
    }
}
