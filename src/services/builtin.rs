//! Built-in commands shipped with the bot binary.
//!
//! | command    | who        | where  | effect                              |
//! |------------|------------|--------|-------------------------------------|
//! | `ping`     | anyone     | any    | replies `pong`                      |
//! | `help`     | anyone     | any    | lists the commands enabled right now |
//! | `promote`  | admin      | group  | grants admin in this group          |
//! | `demote`   | admin      | group  | revokes admin in this group         |
//! | `mute`     | admin      | group  | silences an actor, optional minutes |
//! | `unmute`   | admin      | group  | lifts a silence                     |
//! | `permit`   | admin      | group  | allow override for one command      |
//! | `forbid`   | admin      | group  | deny override for one command       |
//! | `toggle`   | admin      | any    | switches a command on or off        |
//! | `lockdown` | admin      | any    | switches lockdown on or off         |
//!
//! Wrong usage is answered with a usage line rather than an error.

use crate::commands::{CommandBodies, CommandBody, CommandDescriptor, Invocation, Switchboard};
use crate::config::ScopeRule;
use crate::gate::Gate;
use crate::services::moderation::{MAX_DURATION, Moderation};
use crate::types::{Actor, ScopeKind};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    Ping,
    Help,
    Promote,
    Demote,
    Mute,
    Unmute,
    Permit,
    Forbid,
    Toggle,
    Lockdown,
}

const ALL: [Builtin; 10] = [
    Builtin::Ping,
    Builtin::Help,
    Builtin::Promote,
    Builtin::Demote,
    Builtin::Mute,
    Builtin::Unmute,
    Builtin::Permit,
    Builtin::Forbid,
    Builtin::Toggle,
    Builtin::Lockdown,
];

impl Builtin {
    fn name(self) -> &'static str {
        match self {
            Builtin::Ping => "ping",
            Builtin::Help => "help",
            Builtin::Promote => "promote",
            Builtin::Demote => "demote",
            Builtin::Mute => "mute",
            Builtin::Unmute => "unmute",
            Builtin::Permit => "permit",
            Builtin::Forbid => "forbid",
            Builtin::Toggle => "toggle",
            Builtin::Lockdown => "lockdown",
        }
    }

    fn usage(self) -> &'static str {
        match self {
            Builtin::Ping => "ping",
            Builtin::Help => "help",
            Builtin::Promote => "promote <actor>",
            Builtin::Demote => "demote <actor>",
            Builtin::Mute => "mute <actor> [minutes]",
            Builtin::Unmute => "unmute <actor>",
            Builtin::Permit => "permit <actor> <command> [minutes]",
            Builtin::Forbid => "forbid <actor> <command> [minutes]",
            Builtin::Toggle => "toggle <command> <on|off>",
            Builtin::Lockdown => "lockdown <on|off>",
        }
    }

    fn descriptor(self) -> CommandDescriptor {
        let groups_only = vec![ScopeRule::AnyOf(ScopeKind::Group)];
        let base = CommandDescriptor::new(self.name());
        let mut descriptor = match self {
            Builtin::Ping => base,
            Builtin::Help => base.with_aliases(&["commands"]).lockdown_exempt(),
            Builtin::Promote | Builtin::Demote | Builtin::Permit | Builtin::Forbid => {
                base.admin_only().with_scopes(groups_only)
            }
            Builtin::Mute => base
                .admin_only()
                .with_aliases(&["silence"])
                .with_scopes(groups_only),
            Builtin::Unmute => base
                .admin_only()
                .with_aliases(&["unsilence"])
                .with_scopes(groups_only),
            Builtin::Toggle | Builtin::Lockdown => base.admin_only().lockdown_exempt(),
        };
        descriptor.description = match self {
            Builtin::Ping => "Check that the bot is alive",
            Builtin::Help => "List available commands",
            Builtin::Promote => "Make someone a group admin",
            Builtin::Demote => "Remove someone's group admin",
            Builtin::Mute => "Silence someone in this group",
            Builtin::Unmute => "Lift a silence",
            Builtin::Permit => "Allow someone one command",
            Builtin::Forbid => "Deny someone one command",
            Builtin::Toggle => "Switch a command on or off",
            Builtin::Lockdown => "Restrict the bot to essential commands",
        }
        .to_string();
        descriptor
    }
}

/// Descriptors for every built-in command.
pub fn descriptors() -> Vec<CommandDescriptor> {
    ALL.iter().map(|b| b.descriptor()).collect()
}

/// Bodies for every built-in command, bound to `gate`.
pub fn bodies(gate: &Gate) -> CommandBodies {
    let context = Arc::new(Context {
        moderation: gate.moderation.clone(),
        switchboard: gate.switchboard.clone(),
        prefix: gate.command_prefix().to_string(),
    });
    let mut bodies = CommandBodies::new();
    for builtin in ALL {
        bodies.bind(
            builtin.name(),
            Arc::new(BuiltinBody {
                builtin,
                context: context.clone(),
            }),
        );
    }
    bodies
}

struct Context {
    moderation: Arc<Moderation>,
    switchboard: Arc<Switchboard>,
    prefix: String,
}

struct BuiltinBody {
    builtin: Builtin,
    context: Arc<Context>,
}

fn parse_switch(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "on" | "enable" | "true" | "1" => Some(true),
        "off" | "disable" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// `None` means permanent. Anything unparsable or longer than
/// [`MAX_DURATION`] is `Err`.
fn parse_minutes(raw: Option<&str>) -> Result<Option<Duration>, ()> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    raw.parse::<u64>()
        .ok()
        .and_then(|m| m.checked_mul(60))
        .map(Duration::from_secs)
        .filter(|d| *d <= MAX_DURATION)
        .map(Some)
        .ok_or(())
}

fn for_minutes(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => format!(" for {} min", d.as_secs() / 60),
        None => String::new(),
    }
}

impl BuiltinBody {
    fn usage(&self) -> Option<String> {
        Some(format!("usage: {}{}", self.context.prefix, self.builtin.usage()))
    }

    fn help(&self) -> String {
        let table = self.context.switchboard.snapshot();
        let mut lines = Vec::new();
        for descriptor in table.descriptors() {
            if table.is_enabled(&descriptor) {
                let marker = if descriptor.require_admin { " (admin)" } else { "" };
                lines.push(format!(
                    "{}{}{} - {}",
                    self.context.prefix, descriptor.name, marker, descriptor.description
                ));
            }
        }
        if table.lockdown() {
            lines.push("lockdown is on".to_string());
        }
        lines.join("\n")
    }
}

#[async_trait]
impl CommandBody for BuiltinBody {
    async fn run(&self, inv: &Invocation) -> anyhow::Result<Option<String>> {
        let moderation = &self.context.moderation;
        let scope = &inv.scope;
        let target = inv.arg(0).map(Actor::new);

        let reply = match (self.builtin, target) {
            (Builtin::Ping, _) => "pong".to_string(),
            (Builtin::Help, _) => self.help(),

            (Builtin::Promote, Some(target)) => {
                moderation.grant_admin(scope, &target, &inv.actor).await?;
                format!("{target} is now an admin")
            }
            (Builtin::Demote, Some(target)) => {
                if moderation.revoke_admin(scope, &target).await? {
                    format!("{target} is no longer an admin")
                } else {
                    format!("{target} was not an admin")
                }
            }
            (Builtin::Mute, Some(target)) => {
                let Ok(duration) = parse_minutes(inv.arg(1)) else {
                    return Ok(self.usage());
                };
                moderation
                    .silence(scope, &target, &inv.actor, duration)
                    .await?;
                format!("{target} muted{}", for_minutes(duration))
            }
            (Builtin::Unmute, Some(target)) => {
                if moderation.unsilence(scope, &target).await? {
                    format!("{target} unmuted")
                } else {
                    format!("{target} was not muted")
                }
            }
            (Builtin::Permit | Builtin::Forbid, Some(target)) => {
                let (Some(command), Ok(duration)) = (inv.arg(1), parse_minutes(inv.arg(2)))
                else {
                    return Ok(self.usage());
                };
                let allowed = self.builtin == Builtin::Permit;
                moderation
                    .grant_special(scope, &target, command, allowed, &inv.actor, duration)
                    .await?;
                let verb = if allowed { "may" } else { "may not" };
                format!("{target} {verb} use {command}{}", for_minutes(duration))
            }
            (Builtin::Toggle, Some(_)) => {
                let (Some(command), Some(on)) = (inv.arg(0), inv.arg(1).and_then(parse_switch))
                else {
                    return Ok(self.usage());
                };
                let canonical = self.context.switchboard.set_enabled(command, on)?;
                format!("{canonical} {}", if on { "enabled" } else { "disabled" })
            }
            (Builtin::Lockdown, Some(_)) => {
                let Some(on) = inv.arg(0).and_then(parse_switch) else {
                    return Ok(self.usage());
                };
                self.context.switchboard.set_lockdown(on);
                format!("lockdown {}", if on { "on" } else { "off" })
            }
            (_, None) => return Ok(self.usage()),
        };
        Ok(Some(reply))
    }
}
