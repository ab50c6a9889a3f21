//! Per-actor command volume limiting.
//!
//! A deliberately coarse fixed-window counter: each actor gets
//! `max_per_window` commands per `window_secs`, whatever the command. Its only
//! job is to damp abuse cheaply before any authorization work runs, so it
//! makes no fairness guarantees at window boundaries.
//!
//! # Algorithm
//!
//! Each actor has `(count, window_start)`. On a check, if more than a full
//! window has passed since `window_start` the window restarts with
//! `count = 1`; otherwise `count` is incremented and the check passes while
//! `count <= max_per_window`.

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::types::Actor;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Counter state for one actor.
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    window_start_ms: i64,
}

/// Thread-safe fixed-window rate limiter keyed by actor.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<Actor, RateWindow>,
    max_per_window: u32,
    window_ms: i64,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            max_per_window: config.max_per_window,
            window_ms: config.window().as_millis() as i64,
            clock,
        }
    }

    /// Count one command from `actor` and report whether it may proceed.
    ///
    /// Returns `true` if allowed, `false` if rate limited.
    pub fn is_allowed(&self, actor: &Actor) -> bool {
        let now_ms = self.clock.now_ms();

        // The entry guard makes the read-modify-write atomic per actor.
        let mut window = self.windows.entry(actor.clone()).or_insert(RateWindow {
            count: 0,
            window_start_ms: now_ms,
        });

        if now_ms - window.window_start_ms > self.window_ms {
            window.count = 1;
            window.window_start_ms = now_ms;
            return true;
        }

        window.count = window.count.saturating_add(1);
        let allowed = window.count <= self.max_per_window;
        if !allowed {
            debug!(actor = %actor, count = window.count, "command rate limit exceeded");
        }
        allowed
    }

    /// Drop windows that have fully elapsed.
    pub fn cleanup(&self) -> usize {
        let now_ms = self.clock.now_ms();
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now_ms - w.window_start_ms <= self.window_ms);
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            debug!(count = removed, "cleared elapsed rate windows");
        }
        removed
    }

    /// Number of actors currently tracked.
    pub fn tracked_actors(&self) -> usize {
        self.windows.len()
    }
}
