//! Security module for chatgate.
//!
//! Provides the admission primitives the dispatcher composes:
//! - **Permission Cache**: TTL-bounded shadow of the admin and silence predicates
//! - **Rate Limiting**: Fixed-window per-actor command volume limit
//! - **Cooldowns**: Per-(actor, command) reuse delays
//! - **Resolver**: Precedence-ordered authorization decision
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Security Module                        │
//! ├─────────────────┬───────────────┬─────────────┬──────────────┤
//! │ PermissionCache │  RateLimiter  │  Cooldowns  │   Resolver   │
//! │ DashMap + TTL   │ Fixed window  │ DashMap     │ Pure decide  │
//! │ admin / silence │ per actor     │ actor x cmd │ + fact fetch │
//! └─────────────────┴───────────────┴─────────────┴──────────────┘
//! ```

pub mod cooldown;
pub mod permission_cache;
pub mod rate_limit;
pub mod resolver;

pub use cooldown::CooldownTracker;
pub use permission_cache::{CacheStats, PermissionCache};
pub use rate_limit::RateLimiter;
pub use resolver::{AuthFacts, Reason, Resolver, Verdict, decide};
