//! Integration tests for the admission pipeline: authorization, scope and
//! enablement checks, throttling, faults and the audit trail.

mod common;
use chatgate::dispatch::UNKNOWN_COMMAND;
use chatgate::metrics;
use chatgate::security::Reason;
use chatgate::{DenyReason, Outcome, ThrottleCause};
use common::{MASTER, TestGate, executed};

#[tokio::test]
async fn test_public_command_executes_and_is_audited() {
    let t = TestGate::new();

    let outcome = t.send("alice", "group:g1", "!echo hello world").await;
    assert_eq!(outcome, executed("hello world"));

    let record = t.last_audit();
    assert!(record.success);
    assert_eq!(record.command, "echo");
    assert_eq!(record.scope, "group:g1");
    assert_eq!(record.reason.as_deref(), Some("public_command"));
}

#[tokio::test]
async fn test_non_admin_denied_admin_command_with_one_audit_record() {
    let t = TestGate::new();

    let outcome = t.send("bob", "group:g1", "!broadcast hi").await;
    assert_eq!(
        outcome,
        Outcome::Denied {
            reason: DenyReason::Unauthorized(Reason::NotGroupAdmin)
        }
    );

    let audit = t.audit();
    assert_eq!(audit.len(), 1);
    assert!(!audit[0].success);
    assert_eq!(audit[0].reason.as_deref(), Some("not_group_admin"));
}

#[tokio::test]
async fn test_group_admin_runs_admin_command_via_alias() {
    let t = TestGate::new();
    t.grant_admin("g1", "carol").await;

    assert_eq!(t.send("carol", "group:g1", "!BC hi").await, executed("sent"));
    assert_eq!(t.last_audit().command, "broadcast");

    // Admin in g1 only.
    assert!(matches!(
        t.send("carol", "group:g2", "!bc hi").await,
        Outcome::Denied { .. }
    ));
}

#[tokio::test]
async fn test_master_passes_every_authorization_check() {
    let t = TestGate::new();

    assert_eq!(t.send(MASTER, "group:g1", "!broadcast hi").await, executed("sent"));
    assert_eq!(t.last_audit().reason.as_deref(), Some("master"));

    // Admin-only toggle in a direct chat: denied for others, fine for master.
    assert_eq!(
        t.send("dave", "direct:dave", "!toggle echo off").await,
        Outcome::Denied {
            reason: DenyReason::Unauthorized(Reason::AdminOnlyInGroups)
        }
    );
    assert_eq!(
        t.send(MASTER, &format!("direct:{MASTER}"), "!toggle echo off").await,
        executed("echo disabled")
    );
}

#[tokio::test]
async fn test_special_deny_beats_admin_grant() {
    let t = TestGate::new();
    t.grant_admin("g1", "erin").await;
    assert_eq!(
        t.send(MASTER, "group:g1", "!forbid erin broadcast").await,
        executed("erin may not use broadcast")
    );

    assert_eq!(
        t.send("erin", "group:g1", "!broadcast hi").await,
        Outcome::Denied {
            reason: DenyReason::Unauthorized(Reason::SpecialDeny)
        }
    );
}

#[tokio::test]
async fn test_special_grant_expires() {
    let t = TestGate::new();
    assert_eq!(
        t.send(MASTER, "group:g1", "!permit frank broadcast 1").await,
        executed("frank may use broadcast for 1 min")
    );

    assert_eq!(t.send("frank", "group:g1", "!broadcast").await, executed("sent"));

    t.advance_secs(61);
    assert_eq!(
        t.send("frank", "group:g1", "!broadcast").await,
        Outcome::Denied {
            reason: DenyReason::Unauthorized(Reason::NotGroupAdmin)
        }
    );
}

#[tokio::test]
async fn test_scope_allow_list() {
    let t = TestGate::new();

    assert_eq!(
        t.send("gina", "group:other", "!family").await,
        Outcome::Denied {
            reason: DenyReason::ScopeNotAllowed
        }
    );
    assert_eq!(t.last_audit().reason.as_deref(), Some("scope_not_allowed"));

    assert_eq!(
        t.send("gina", "group:family-chat", "!family").await,
        executed("hi family")
    );

    // Group-only admin command in a direct chat fails at the scope step,
    // before authorization, even for the master.
    assert_eq!(
        t.send(MASTER, &format!("direct:{MASTER}"), "!broadcast").await,
        Outcome::Denied {
            reason: DenyReason::ScopeNotAllowed
        }
    );
}

#[tokio::test]
async fn test_disabled_and_unknown_commands_denied() {
    let t = TestGate::new();

    let disabled = Outcome::Denied {
        reason: DenyReason::Disabled,
    };
    assert_eq!(t.send("hank", "group:g1", "!legacy").await, disabled);
    assert_eq!(t.last_audit().reason.as_deref(), Some("disabled"));

    assert_eq!(t.send("hank", "group:g1", "!nosuchthing").await, disabled);
    let record = t.last_audit();
    assert_eq!(record.command, "nosuchthing");
    assert_eq!(record.reason.as_deref(), Some("config_missing"));
}

#[tokio::test]
async fn test_non_command_text_is_ignored_without_audit() {
    let t = TestGate::new();

    assert_eq!(t.send("ivy", "group:g1", "good morning").await, Outcome::Ignored);
    assert_eq!(t.send("ivy", "group:g1", "! not a command").await, Outcome::Ignored);
    assert!(t.audit().is_empty());
}

#[tokio::test]
async fn test_rate_limit_fixed_window() {
    let t = TestGate::new();

    for _ in 0..5 {
        assert!(t.send("jack", "group:g1", "!ping").await.is_executed());
    }
    assert_eq!(
        t.send("jack", "group:g1", "!ping").await,
        Outcome::Throttled {
            cause: ThrottleCause::RateLimited
        }
    );
    // Throttles are not audited.
    assert_eq!(t.audit().len(), 5);

    // Other actors are unaffected.
    assert!(t.send("kate", "group:g1", "!ping").await.is_executed());

    t.advance_secs(11);
    assert!(t.send("jack", "group:g1", "!ping").await.is_executed());
}

#[tokio::test]
async fn test_rate_limit_counts_denied_attempts() {
    let t = TestGate::new();

    for _ in 0..5 {
        assert!(matches!(
            t.send("leo", "group:g1", "!broadcast").await,
            Outcome::Denied { .. }
        ));
    }
    assert_eq!(
        t.send("leo", "group:g1", "!ping").await,
        Outcome::Throttled {
            cause: ThrottleCause::RateLimited
        }
    );
}

#[tokio::test]
async fn test_cooldown_per_actor_and_command() {
    let t = TestGate::new();
    t.grant_admin("g1", "mia").await;
    t.grant_admin("g1", "ned").await;

    assert_eq!(t.send("mia", "group:g1", "!broadcast").await, executed("sent"));
    assert_eq!(
        t.send("mia", "group:g1", "!broadcast").await,
        Outcome::Throttled {
            cause: ThrottleCause::Cooldown {
                remaining_secs: 600
            }
        }
    );
    assert_eq!(t.audit().len(), 1);

    // Unrelated command and other actor are not blocked.
    assert!(t.send("mia", "group:g1", "!ping").await.is_executed());
    assert_eq!(t.send("ned", "group:g1", "!broadcast").await, executed("sent"));

    t.advance_secs(599);
    assert_eq!(
        t.send("mia", "group:g1", "!broadcast").await,
        Outcome::Throttled {
            cause: ThrottleCause::Cooldown { remaining_secs: 1 }
        }
    );

    t.advance_secs(1);
    assert_eq!(t.send("mia", "group:g1", "!broadcast").await, executed("sent"));
}

#[tokio::test]
async fn test_denied_attempt_does_not_start_cooldown() {
    let t = TestGate::new();

    assert!(matches!(
        t.send("olga", "group:g1", "!broadcast").await,
        Outcome::Denied { .. }
    ));
    t.grant_admin("g1", "olga").await;
    assert_eq!(t.send("olga", "group:g1", "!broadcast").await, executed("sent"));
}

#[tokio::test]
async fn test_body_error_and_panic_become_errored() {
    let t = TestGate::new();

    let Outcome::Errored { message } = t.send("pat", "group:g1", "!boom").await else {
        panic!("expected Errored");
    };
    assert!(message.contains("boom"));
    let record = t.last_audit();
    assert!(!record.success);
    assert_eq!(record.reason.as_deref(), Some(message.as_str()));

    let Outcome::Errored { message } = t.send("pat", "group:g1", "!crash").await else {
        panic!("expected Errored");
    };
    assert!(message.contains("crashed on purpose"));

    // The pipeline keeps working afterwards.
    assert!(t.send("pat", "group:g1", "!ping").await.is_executed());
}

#[tokio::test]
async fn test_lockdown_disables_all_but_exempt_commands() {
    let t = TestGate::new();

    assert_eq!(t.send(MASTER, "group:g1", "!lockdown on").await, executed("lockdown on"));

    assert_eq!(
        t.send("quinn", "group:g1", "!echo hi").await,
        Outcome::Denied {
            reason: DenyReason::Disabled
        }
    );
    assert_eq!(t.last_audit().reason.as_deref(), Some("lockdown"));

    let help = t.send("quinn", "group:g1", "!help").await;
    let reply = help.reply().unwrap_or_default().to_string();
    assert!(reply.contains("!lockdown"));
    assert!(reply.contains("lockdown is on"));
    assert!(!reply.contains("!echo"));

    assert_eq!(t.send(MASTER, "group:g1", "!lockdown off").await, executed("lockdown off"));
    assert_eq!(t.send("quinn", "group:g1", "!echo hi").await, executed("hi"));
}

#[tokio::test]
async fn test_store_outage() {
    let t = TestGate::new();
    t.store.set_unavailable(true);

    // Silence fails closed with nothing cached.
    assert_eq!(t.send("rita", "group:g1", "!ping").await, Outcome::Suppressed);

    // The master skips the silence gate and authorization, and the failed
    // audit write does not change the outcome.
    assert_eq!(t.send(MASTER, "group:g1", "!ping").await, executed("pong"));
    assert!(t.audit().is_empty());
}

#[tokio::test]
async fn test_usage_reply_for_missing_arguments() {
    let t = TestGate::new();
    assert_eq!(
        t.send(MASTER, "group:g1", "!mute").await,
        executed("usage: !mute <actor> [minutes]")
    );
}

#[tokio::test]
async fn test_metrics_label_by_canonical_name_only() {
    metrics::init();
    let t = TestGate::new();
    let unknown_denials = || {
        metrics::DISPATCH_OUTCOMES
            .get()
            .map(|c| c.with_label_values(&[UNKNOWN_COMMAND, "denied"]).get())
            .unwrap_or(0)
    };
    let before = unknown_denials();

    for i in 0..40 {
        assert_eq!(
            t.send(&format!("stray-{i}"), "group:g1", &format!("!junklabel{i}"))
                .await,
            Outcome::Denied {
                reason: DenyReason::Disabled
            }
        );
    }
    assert!(unknown_denials() >= before + 40);

    assert_eq!(t.send(MASTER, "group:g1", "!BC hi").await, executed("sent"));

    let exported = metrics::gather_metrics();
    assert!(!exported.contains("junklabel"));
    assert!(exported.contains(r#"command="broadcast""#));
    assert!(!exported.contains(r#"command="bc""#));
}
