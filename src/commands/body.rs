//! Command bodies: the code that runs once an event has been admitted.

use crate::types::{Actor, Scope};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// One admitted command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub actor: Actor,
    pub scope: Scope,
    /// Canonical command name.
    pub command: String,
    /// Name or alias the sender actually typed.
    pub invoked_as: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(actor: Actor, scope: Scope, command: &str, args: Vec<String>) -> Self {
        Self {
            actor,
            scope,
            command: command.to_lowercase(),
            invoked_as: command.to_lowercase(),
            args,
        }
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

/// Executable part of a command.
///
/// Bodies return an optional reply for the transport. Errors (and panics)
/// are caught by the dispatcher and recorded as faults.
#[async_trait]
pub trait CommandBody: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> anyhow::Result<Option<String>>;
}

/// Adapter turning a plain closure into a [`CommandBody`].
pub struct FnBody<F>(pub F);

impl<F> FnBody<F>
where
    F: Fn(&Invocation) -> anyhow::Result<Option<String>> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> CommandBody for FnBody<F>
where
    F: Fn(&Invocation) -> anyhow::Result<Option<String>> + Send + Sync,
{
    async fn run(&self, invocation: &Invocation) -> anyhow::Result<Option<String>> {
        (self.0)(invocation)
    }
}

/// Bodies bound to canonical command names.
#[derive(Default, Clone)]
pub struct CommandBodies {
    bodies: HashMap<String, Arc<dyn CommandBody>>,
}

impl CommandBodies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `body` to the canonical name `command`, replacing any previous one.
    pub fn bind(&mut self, command: &str, body: Arc<dyn CommandBody>) {
        self.bodies.insert(command.to_lowercase(), body);
    }

    pub fn get(&self, command: &str) -> Option<Arc<dyn CommandBody>> {
        self.bodies.get(command).cloned()
    }
}
