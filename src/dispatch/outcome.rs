//! Terminal outcomes of one inbound event.

use crate::security::Reason;
use serde::Serialize;

/// Why an event was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The command is not allowed in this scope.
    ScopeNotAllowed,
    /// The command is disabled, unknown, unbound or held by lockdown.
    Disabled,
    /// The resolver refused the actor.
    Unauthorized(Reason),
}

/// Why an event was deferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleCause {
    RateLimited,
    Cooldown { remaining_secs: u64 },
}

/// Result of feeding one event through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Executed { reply: Option<String> },
    Denied { reason: DenyReason },
    Throttled { cause: ThrottleCause },
    Errored { message: String },
    /// Sender is silenced in this scope; the message was dropped unparsed.
    Suppressed,
    /// The text is not a command.
    Ignored,
}

impl Outcome {
    /// Metric/log label.
    pub fn code(&self) -> &'static str {
        match self {
            Outcome::Executed { .. } => "executed",
            Outcome::Denied { .. } => "denied",
            Outcome::Throttled { .. } => "throttled",
            Outcome::Errored { .. } => "errored",
            Outcome::Suppressed => "suppressed",
            Outcome::Ignored => "ignored",
        }
    }

    pub fn is_executed(&self) -> bool {
        matches!(self, Outcome::Executed { .. })
    }

    /// Reply text for the transport, if any.
    pub fn reply(&self) -> Option<&str> {
        match self {
            Outcome::Executed { reply } => reply.as_deref(),
            _ => None,
        }
    }
}
