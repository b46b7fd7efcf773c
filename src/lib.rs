//! Join Flow - membership join orchestration service
//!
//! Takes a membership application from the join wizard and drives it through
//! billing (Chargebee or Stripe), GoCardless direct debit mandates, Auth0
//! account creation, CRM signups and an operator webhook, under a per-session
//! lock so a double-submitted form only charges once.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod startup;
