//! Join handlers.
//!
//! - `SubmitJoinHandler` - runs a membership application end to end
//! - `ensure_mandate` - direct debit mandate with reuse inside a time window
//! - `classify` - provider error conversions into `JoinError`

mod classify;
mod ensure_mandate;
mod submit_join;

pub use ensure_mandate::{ensure_mandate, MandateOutcome};
pub use submit_join::{JoinOutcome, JoinPipelineConfig, SubmitJoinHandler};
