use async_trait::async_trait;

use crate::domain::DomainError;

/// The host's set of invocable `(domain, action)` pairs.
#[async_trait]
pub trait CapabilityRegistry: Send + Sync {
    async fn has_capability(&self, domain: &str, action: &str) -> bool;

    /// Ask the host to run `domain.action` against `entity_id`.
    ///
    /// Returns once the host has accepted the call; it does not wait for the
    /// device to reach its new state.
    async fn invoke(&self, domain: &str, action: &str, entity_id: &str)
        -> Result<(), DomainError>;
}
