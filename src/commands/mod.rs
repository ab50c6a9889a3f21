//! Command registry, descriptors, bodies and parsing.

mod body;
mod descriptor;
mod parse;
mod registry;

pub use body::{CommandBodies, CommandBody, FnBody, Invocation};
pub use descriptor::CommandDescriptor;
pub use parse::{ParsedCommand, parse_command};
pub use registry::{CommandTable, RegistryError, Switchboard};
