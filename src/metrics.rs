//! Prometheus metrics collection for chatgate.
//!
//! - `gate_dispatch_total{command,outcome}` - Terminal outcome per dispatch, by
//!   canonical command name or `unknown`
//! - `gate_command_duration_seconds{command}` - Command body latency
//! - `gate_rate_limited_total` - Events rejected by the fixed-window limiter
//! - `gate_cooldown_blocked_total{command}` - Events rejected by a cooldown
//! - `gate_cache_lookups_total{predicate,result}` - Permission cache hit/miss/error
//! - `gate_store_errors_total{operation}` - Failed or timed-out store calls
//! - `gate_audit_failures_total` - Audit records that could not be written
//! - `gate_suppressed_messages_total` - Messages dropped from silenced senders

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters
// ========================================================================

pub static DISPATCH_OUTCOMES: OnceLock<IntCounterVec> = OnceLock::new();

pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

pub static RATE_LIMITED: OnceLock<IntCounter> = OnceLock::new();

pub static COOLDOWN_BLOCKED: OnceLock<IntCounterVec> = OnceLock::new();

pub static CACHE_LOOKUPS: OnceLock<IntCounterVec> = OnceLock::new();

pub static STORE_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

pub static AUDIT_FAILURES: OnceLock<IntCounter> = OnceLock::new();

pub static SUPPRESSED_MESSAGES: OnceLock<IntCounter> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Safe to call more than once; only the first call registers anything.
/// Recording before `init` is a silent no-op.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            if $metric.get().is_none() {
                let m = $init.expect(concat!(stringify!($metric), " creation failed"));
                if let Err(e) = r.register(Box::new(m.clone())) {
                    tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                }
                let _ = $metric.set(m);
            }
        };
    }

    register!(DISPATCH_OUTCOMES, IntCounterVec::new(Opts::new("gate_dispatch_total", "Dispatch outcomes by command"), &["command", "outcome"]));
    register!(COMMAND_LATENCY, HistogramVec::new(
        HistogramOpts::new("gate_command_duration_seconds", "Command body latency by command")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["command"]));
    register!(RATE_LIMITED, IntCounter::new("gate_rate_limited_total", "Events rejected by the rate limiter"));
    register!(COOLDOWN_BLOCKED, IntCounterVec::new(Opts::new("gate_cooldown_blocked_total", "Events rejected by a command cooldown"), &["command"]));
    register!(CACHE_LOOKUPS, IntCounterVec::new(Opts::new("gate_cache_lookups_total", "Permission cache lookups"), &["predicate", "result"]));
    register!(STORE_ERRORS, IntCounterVec::new(Opts::new("gate_store_errors_total", "Failed or timed-out store calls"), &["operation"]));
    register!(AUDIT_FAILURES, IntCounter::new("gate_audit_failures_total", "Audit records that could not be written"));
    register!(SUPPRESSED_MESSAGES, IntCounter::new("gate_suppressed_messages_total", "Messages dropped from silenced senders"));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Recording helpers
// ============================================================================

#[inline]
pub fn record_outcome(command: &str, outcome: &str) {
    if let Some(c) = DISPATCH_OUTCOMES.get() {
        c.with_label_values(&[command, outcome]).inc();
    }
}

#[inline]
pub fn record_command_latency(command: &str, duration_secs: f64) {
    if let Some(h) = COMMAND_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

#[inline]
pub fn record_rate_limited() {
    if let Some(c) = RATE_LIMITED.get() {
        c.inc();
    }
}

#[inline]
pub fn record_cooldown_blocked(command: &str) {
    if let Some(c) = COOLDOWN_BLOCKED.get() {
        c.with_label_values(&[command]).inc();
    }
}

/// `predicate` is "admin" or "silence"; `result` is "hit", "miss" or "error".
#[inline]
pub fn record_cache_lookup(predicate: &str, result: &str) {
    if let Some(c) = CACHE_LOOKUPS.get() {
        c.with_label_values(&[predicate, result]).inc();
    }
}

#[inline]
pub fn record_store_error(operation: &str) {
    if let Some(c) = STORE_ERRORS.get() {
        c.with_label_values(&[operation]).inc();
    }
}

#[inline]
pub fn record_audit_failure() {
    if let Some(c) = AUDIT_FAILURES.get() {
        c.inc();
    }
}

#[inline]
pub fn record_suppressed() {
    if let Some(c) = SUPPRESSED_MESSAGES.get() {
        c.inc();
    }
}
