//! Application handlers.
//!
//! Command handlers that orchestrate domain operations across ports.

pub mod join;

pub use join::{JoinOutcome, JoinPipelineConfig, MandateOutcome, SubmitJoinHandler};
