//! Identity types shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque, stable identifier of a message sender.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(String);

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Actor {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for Actor {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Whether a conversation is a group or a one-to-one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Group,
    Direct,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Group => "group",
            ScopeKind::Direct => "direct",
        }
    }
}

/// A conversation context against which commands are evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    id: String,
    kind: ScopeKind,
}

impl Scope {
    pub fn group(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ScopeKind::Group,
        }
    }

    pub fn direct(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ScopeKind::Direct,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn is_group(&self) -> bool {
        self.kind == ScopeKind::Group
    }

    /// Key under which grants, silences and overrides for this conversation
    /// are stored: `kind:id`, so a group and a direct chat that happen to
    /// share an id never share state.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

/// Error returned when a scope string is not `group:<id>` or `direct:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid scope '{0}': expected group:<id> or direct:<id>")]
pub struct ParseScopeError(String);

impl FromStr for Scope {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("group", id)) if !id.is_empty() => Ok(Scope::group(id)),
            Some(("direct", id)) if !id.is_empty() => Ok(Scope::direct(id)),
            _ => Err(ParseScopeError(s.to_string())),
        }
    }
}
