//! Compensation port for the join saga.
//!
//! The pipeline does not roll back today: `NoCompensation` only reports what
//! was left behind. A real compensator (cancel subscription, delete
//! customer) can be injected without touching the orchestrator.

use async_trait::async_trait;

use crate::domain::join::CreatedResource;

#[async_trait]
pub trait Compensator: Send + Sync {
    /// Undo one created resource. Called newest first.
    async fn compensate(&self, resource: &CreatedResource) -> Result<(), String>;
}

/// Leaves every resource in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCompensation;

#[async_trait]
impl Compensator for NoCompensation {
    async fn compensate(&self, resource: &CreatedResource) -> Result<(), String> {
        tracing::warn!(?resource, "Resource left in place after failed join");
        Ok(())
    }
}
