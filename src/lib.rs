//! chatgate - command admission for chat automation bots.
//!
//! For every inbound message the pipeline decides whether the sender is
//! silenced, whether the text is a command, whether the sender is sending too
//! fast, whether the command is allowed here and now, whether the sender is
//! authorized, and whether the command is still cooling down. Admitted
//! commands run and every decision that matters lands in the audit log.
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use chatgate::{Gate, config::Config, services::builtin};
//! use chatgate::clock::SystemClock;
//! use chatgate::db::Database;
//! use chatgate::types::{Actor, Scope};
//! use std::sync::Arc;
//!
//! let config = Config::load("config.toml")?;
//! let db = Database::new(&config.database.path).await?;
//! let gate = Gate::new(&config, Arc::new(db), Arc::new(SystemClock), builtin::descriptors())?;
//! let dispatcher = gate.dispatcher(builtin::bodies(&gate));
//!
//! let outcome = dispatcher
//!     .on_message(&Actor::new("15550001111"), &Scope::group("family"), "!ping")
//!     .await;
//! println!("{}", serde_json::to_string(&outcome)?);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod clock;
pub mod commands;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod http;
pub mod metrics;
pub mod security;
pub mod services;
pub mod store;
pub mod telemetry;
pub mod types;

pub use dispatch::{DenyReason, Dispatcher, Outcome, ThrottleCause};
pub use error::{GateError, GateResult};
pub use gate::{BuildError, Gate};
