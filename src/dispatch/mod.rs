//! Command dispatch: admission checks, execution and outcomes.

mod outcome;
mod pipeline;

pub use outcome::{DenyReason, Outcome, ThrottleCause};
pub use pipeline::{Dispatcher, DispatcherParts, UNKNOWN_COMMAND};
