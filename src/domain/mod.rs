//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (session token, money, validation errors)
//! - `join` - Membership application, plans, error taxonomy and pipeline state
pub mod foundation;
pub mod join;
