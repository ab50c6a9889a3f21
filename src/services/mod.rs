//! Services layered on top of the admission pipeline.
//!
//! - [`moderation`]: the mutation boundary for grants, silences and overrides
//! - [`builtin`]: the commands shipped with the binary
//! - [`maintenance`]: periodic sweep of in-memory tables

pub mod builtin;
pub mod maintenance;
pub mod moderation;

pub use maintenance::{SweepReport, Sweeper, spawn_maintenance_task};
pub use moderation::Moderation;
