//! Tracing spans and timing helpers for the admission pipeline.

use crate::types::{Actor, Scope};
use std::time::Instant;
use tracing::{Level, Span, span};

/// Records command body latency into the histogram when dropped.
pub struct CommandTimer {
    command: String,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command_latency(&self.command, duration);
    }
}

/// Span wrapping one dispatch. `outcome` is filled in once known.
pub fn dispatch_span(actor: &Actor, scope: &Scope, command: &str) -> Span {
    span!(
        Level::INFO,
        "gate.command",
        actor = %actor,
        scope = %scope,
        command = %command,
        outcome = tracing::field::Empty,
    )
}
