//! Integration test common infrastructure.
//!
//! Builds a full gate over an in-memory store and a manual clock, with the
//! built-in commands plus a few test bodies bound.

#![allow(dead_code)]

use chatgate::clock::{Clock, ManualClock};
use chatgate::commands::{FnBody, Invocation};
use chatgate::config::Config;
use chatgate::db::AuditRecord;
use chatgate::services::builtin;
use chatgate::store::{MemoryStore, Store};
use chatgate::types::{Actor, Scope};
use chatgate::{Dispatcher, Gate, Outcome};
use std::sync::Arc;

pub const MASTER: &str = "15550000000";

pub const CONFIG: &str = r#"
[bot]
master = "15550000000"

[rate_limit]
max_per_window = 5
window_secs = 10

[cache]
admin_ttl_secs = 300
silence_ttl_secs = 30

[commands.broadcast]
aliases = ["bc"]
description = "Send a message to everyone"
require_admin = true
cooldown_secs = 600
allowed_scopes = ["group"]

[commands.echo]
description = "Repeat the arguments"

[commands.boom]
[commands.crash]

[commands.family]
allowed_scopes = ["family-chat"]

[commands.legacy]
enabled = false
"#;

pub struct TestGate {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub gate: Gate,
    pub dispatcher: Dispatcher,
}

impl TestGate {
    pub fn new() -> Self {
        Self::with_config(CONFIG)
    }

    pub fn with_config(raw: &str) -> Self {
        Self::with_store(raw, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(raw: &str, store: Arc<MemoryStore>) -> Self {
        let config: Config = toml::from_str(raw).expect("test config parses");
        let clock = Arc::new(ManualClock::default());
        let gate = Gate::new(&config, store.clone(), clock.clone(), builtin::descriptors())
            .expect("gate builds");

        let mut bodies = builtin::bodies(&gate);
        bodies.bind(
            "broadcast",
            Arc::new(FnBody::new(|_| Ok(Some("sent".to_string())))),
        );
        bodies.bind(
            "echo",
            Arc::new(FnBody::new(|inv: &Invocation| Ok(Some(inv.args.join(" "))))),
        );
        bodies.bind(
            "boom",
            Arc::new(FnBody::new(|_| Err(anyhow::anyhow!("boom")))),
        );
        bodies.bind(
            "crash",
            Arc::new(FnBody::new(|_| panic!("crashed on purpose"))),
        );
        bodies.bind(
            "family",
            Arc::new(FnBody::new(|_| Ok(Some("hi family".to_string())))),
        );
        bodies.bind(
            "legacy",
            Arc::new(FnBody::new(|_| Ok(None))),
        );

        let dispatcher = gate.dispatcher(bodies);
        Self {
            store,
            clock,
            gate,
            dispatcher,
        }
    }

    /// Feed `text` from `actor` in `scope` (written `group:<id>` / `direct:<id>`).
    pub async fn send(&self, actor: &str, scope: &str, text: &str) -> Outcome {
        let scope: Scope = scope.parse().expect("valid scope");
        self.dispatcher
            .on_message(&Actor::new(actor), &scope, text)
            .await
    }

    pub fn audit(&self) -> Vec<AuditRecord> {
        self.store.audit_records()
    }

    pub fn last_audit(&self) -> AuditRecord {
        self.audit().pop().expect("at least one audit record")
    }

    pub fn advance_secs(&self, secs: u64) {
        self.clock.advance(std::time::Duration::from_secs(secs));
    }

    pub fn now_secs(&self) -> i64 {
        self.clock.now_secs()
    }

    pub async fn grant_admin(&self, scope: &str, actor: &str) {
        self.gate
            .moderation
            .grant_admin(&Scope::group(scope), &Actor::new(actor), &Actor::new(MASTER))
            .await
            .expect("grant admin");
    }

    pub async fn admin_in_store(&self, scope: &str, actor: &str) -> bool {
        self.store
            .find_admin_grant(&Scope::group(scope).key(), &Actor::new(actor))
            .await
            .expect("store reachable")
    }
}

pub fn executed(reply: &str) -> Outcome {
    Outcome::Executed {
        reply: Some(reply.to_string()),
    }
}
