use async_trait::async_trait;

use crate::domain::{DomainError, EntitySnapshot, HostVariables};

/// Read access to the host's device state.
#[async_trait]
pub trait EntityProvider: Send + Sync {
    /// Entities explicitly opted in to conversational control, each with its
    /// current state and the actions its domain supports.
    async fn list_exposed_entities(&self) -> Result<Vec<EntitySnapshot>, DomainError>;

    /// Variables available to the preamble template (e.g. `ha_name`).
    async fn host_variables(&self) -> Result<HostVariables, DomainError>;
}
