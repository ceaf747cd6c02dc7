use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::application::CapabilityRegistry;
use crate::domain::{ActionRequest, DispatchOutcome, EntitySnapshot};

/// Executes model-requested actions against the host.
///
/// Each action is checked and invoked independently: an unknown capability or
/// a host failure is logged and recorded in the returned outcomes, never
/// propagated, so the remaining actions of the batch still run.
pub struct ActionDispatcher {
    registry: Arc<dyn CapabilityRegistry>,
}

impl ActionDispatcher {
    pub fn new(registry: Arc<dyn CapabilityRegistry>) -> Self {
        Self { registry }
    }

    /// Dispatch a batch concurrently. Outcomes are returned in input order.
    ///
    /// `exposed` is the entity set shown to the model this turn; actions
    /// targeting anything else are logged but still attempted.
    pub async fn dispatch(
        &self,
        actions: &[ActionRequest],
        exposed: &[EntitySnapshot],
    ) -> Vec<DispatchOutcome> {
        if actions.is_empty() {
            debug!("No actions to dispatch");
            return Vec::new();
        }

        let exposed_ids: HashSet<&str> = exposed.iter().map(|e| e.id()).collect();
        for action in actions {
            if !exposed_ids.contains(action.id.as_str()) {
                warn!(
                    "Action {} targets entity '{}' which is not exposed to the agent",
                    action.capability(),
                    action.id
                );
            }
        }

        let outcomes = join_all(actions.iter().map(|action| self.dispatch_one(action))).await;

        let invoked = outcomes.iter().filter(|o| o.is_invoked()).count();
        info!("Dispatched {}/{} actions", invoked, outcomes.len());

        outcomes
    }

    async fn dispatch_one(&self, action: &ActionRequest) -> DispatchOutcome {
        if !self
            .registry
            .has_capability(&action.domain, &action.action)
            .await
        {
            warn!(
                "Unknown capability {} requested for '{}', skipping",
                action.capability(),
                action.id
            );
            return DispatchOutcome::UnknownCapability(action.clone());
        }

        match self
            .registry
            .invoke(&action.domain, &action.action, &action.id)
            .await
        {
            Ok(()) => {
                debug!("Invoked {}", action);
                DispatchOutcome::Invoked(action.clone())
            }
            Err(e) => {
                warn!("Failed to invoke {}: {}", action, e);
                DispatchOutcome::Failed {
                    action: action.clone(),
                    reason: e.to_string(),
                }
            }
        }
    }
}
