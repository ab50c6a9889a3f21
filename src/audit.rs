//! Audit sink.
//!
//! Every denied, executed or failed dispatch leaves one immutable
//! [`AuditRecord`]. Arguments are redacted before the record leaves the
//! process: long digit runs (phone numbers) are always masked, operators can
//! add patterns under `[audit] redact_patterns`, and the result is truncated
//! to `max_argument_len` characters.
//!
//! Writes are best effort. A failed or timed-out append is logged and counted
//! and never surfaces to the caller.

use crate::clock::Clock;
use crate::config::AuditConfig;
use crate::db::AuditRecord;
use crate::metrics;
use crate::store::{Store, bounded};
use crate::types::{Actor, Scope};
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

const MASK: &str = "[redacted]";
const PHONE_PATTERN: &str = r"\+?\d{7,}";

/// Masks sensitive substrings in command arguments.
#[derive(Debug, Clone)]
pub struct Redactor {
    patterns: Vec<Regex>,
    max_len: usize,
}

impl Redactor {
    pub fn new(config: &AuditConfig) -> Result<Self, regex::Error> {
        let mut patterns = vec![Regex::new(PHONE_PATTERN)?];
        for pattern in &config.redact_patterns {
            patterns.push(Regex::new(pattern)?);
        }
        Ok(Self {
            patterns,
            max_len: config.max_argument_len,
        })
    }

    /// Join `args` with spaces, mask every pattern match and truncate.
    pub fn redact(&self, args: &[String]) -> String {
        let mut joined = args.join(" ");
        for pattern in &self.patterns {
            if pattern.is_match(&joined) {
                joined = pattern.replace_all(&joined, MASK).into_owned();
            }
        }
        if joined.chars().count() > self.max_len {
            joined = joined.chars().take(self.max_len).collect();
            joined.push_str("...");
        }
        joined
    }
}

/// One decision to be written to the audit log.
#[derive(Debug, Clone, Copy)]
pub struct AuditEntry<'a> {
    pub actor: &'a Actor,
    pub scope: &'a Scope,
    pub command: &'a str,
    pub args: &'a [String],
    pub success: bool,
    pub reason: Option<&'a str>,
}

/// Appends redacted audit records to the store.
pub struct AuditSink {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    redactor: Redactor,
    store_timeout: Duration,
}

impl AuditSink {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        redactor: Redactor,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            redactor,
            store_timeout,
        }
    }

    /// Build the record for `entry` without writing it.
    pub fn build(&self, entry: &AuditEntry<'_>) -> AuditRecord {
        AuditRecord {
            id: Uuid::new_v4().to_string(),
            actor: entry.actor.clone(),
            scope: entry.scope.to_string(),
            command: entry.command.to_string(),
            arguments_redacted: self.redactor.redact(entry.args),
            success: entry.success,
            reason: entry.reason.map(str::to_string),
            timestamp: self.clock.now_secs(),
        }
    }

    /// Write one record. Returns whether the write succeeded.
    pub async fn record(&self, entry: AuditEntry<'_>) -> bool {
        let record = self.build(&entry);
        match bounded(self.store_timeout, self.store.append_audit(&record)).await {
            Ok(()) => {
                debug!(id = %record.id, command = %record.command, success = record.success, "Audit record written");
                true
            }
            Err(e) => {
                metrics::record_audit_failure();
                metrics::record_store_error("append_audit");
                warn!(
                    actor = %record.actor,
                    command = %record.command,
                    error = %e,
                    "Failed to write audit record"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_phone_numbers_always_masked() {
        let redactor = Redactor::new(&AuditConfig::default()).unwrap();
        assert_eq!(
            redactor.redact(&args(&["+15550001111", "spam", "42"])),
            "[redacted] spam 42"
        );
    }

    #[test]
    fn test_custom_pattern_and_truncation() {
        let config = AuditConfig {
            redact_patterns: vec![r"(?i)token=\S+".into()],
            max_argument_len: 20,
        };
        let redactor = Redactor::new(&config).unwrap();
        assert_eq!(redactor.redact(&args(&["token=abc", "x"])), "[redacted] x");

        let long = redactor.redact(&args(&["aaaaaaaaaaaaaaaaaaaaaaaaaaaa"]));
        assert_eq!(long, format!("{}...", "a".repeat(20)));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let config = AuditConfig {
            redact_patterns: vec!["(".into()],
            ..AuditConfig::default()
        };
        assert!(Redactor::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_record_written_with_redacted_args() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let sink = AuditSink::new(
            store.clone(),
            clock.clone(),
            Redactor::new(&AuditConfig::default()).unwrap(),
            Duration::from_millis(100),
        );

        let actor = Actor::new("alice");
        let scope = Scope::group("g1");
        let written = sink
            .record(AuditEntry {
                actor: &actor,
                scope: &scope,
                command: "mute",
                args: &args(&["15550001111"]),
                success: false,
                reason: Some("not_group_admin"),
            })
            .await;
        assert!(written);

        let records = store.audit_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].arguments_redacted, "[redacted]");
        assert_eq!(records[0].scope, "group:g1");
        assert_eq!(records[0].reason.as_deref(), Some("not_group_admin"));
        assert_eq!(records[0].timestamp, clock.now_secs());
    }

    #[tokio::test]
    async fn test_failed_write_is_swallowed() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let sink = AuditSink::new(
            store.clone(),
            Arc::new(ManualClock::default()),
            Redactor::new(&AuditConfig::default()).unwrap(),
            Duration::from_millis(100),
        );
        let actor = Actor::new("bob");
        let scope = Scope::direct("bob");
        assert!(
            !sink
                .record(AuditEntry {
                    actor: &actor,
                    scope: &scope,
                    command: "ping",
                    args: &[],
                    success: true,
                    reason: None,
                })
                .await
        );
    }
}
