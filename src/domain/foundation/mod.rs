//! Foundation module - Shared domain primitives.
//!
//! Value objects and error types that form the vocabulary of the join domain.

mod errors;
mod ids;
mod money;

pub use errors::ValidationError;
pub use ids::SessionToken;
pub use money::MinorUnits;
