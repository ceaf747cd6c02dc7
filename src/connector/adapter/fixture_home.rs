use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::application::{CapabilityRegistry, EntityProvider};
use crate::domain::{ActionRequest, DomainError, EntitySnapshot, HostVariables};

/// One device in a fixture file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureEntity {
    pub id: String,
    /// Defaults to the part of `id` before the first dot.
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub exposed: bool,
}

impl FixtureEntity {
    pub fn domain(&self) -> &str {
        self.domain
            .as_deref()
            .unwrap_or_else(|| self.id.split('.').next().unwrap_or(&self.id))
    }
}

/// JSON description of a home:
///
/// ```json
/// {
///   "location_name": "Home",
///   "entities": [
///     { "id": "light.kitchen", "name": "Kitchen", "state": "off", "exposed": true }
///   ],
///   "services": { "light": ["turn_on", "turn_off", "toggle"] }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureDefinition {
    #[serde(default)]
    pub location_name: String,
    #[serde(default)]
    pub entities: Vec<FixtureEntity>,
    #[serde(default)]
    pub services: BTreeMap<String, Vec<String>>,
}

/// A file-backed stand-in for the home-automation host.
///
/// Service calls update entity state for the common on/off services and are
/// recorded so callers can inspect what the agent did.
pub struct FixtureHome {
    location_name: String,
    entities: Mutex<Vec<FixtureEntity>>,
    services: BTreeMap<String, Vec<String>>,
    invocations: Mutex<Vec<ActionRequest>>,
}

impl FixtureHome {
    pub fn new(definition: FixtureDefinition) -> Self {
        Self {
            location_name: definition.location_name,
            entities: Mutex::new(definition.entities),
            services: definition.services,
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, DomainError> {
        let definition: FixtureDefinition = serde_json::from_str(raw)
            .map_err(|e| DomainError::parse(format!("invalid home fixture: {e}")))?;
        Ok(Self::new(definition))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let home = Self::from_json_str(&raw)?;
        info!(
            "Loaded home fixture from {} ({} service domains)",
            path.as_ref().display(),
            home.services.len()
        );
        Ok(home)
    }

    pub async fn invocations(&self) -> Vec<ActionRequest> {
        self.invocations.lock().await.clone()
    }

    pub async fn state_of(&self, entity_id: &str) -> Option<String> {
        self.entities
            .lock()
            .await
            .iter()
            .find(|e| e.id == entity_id)
            .and_then(|e| e.state.clone())
    }

    fn services_for(&self, domain: &str) -> &[String] {
        self.services.get(domain).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn next_state(action: &str, current: Option<&str>) -> Option<&'static str> {
    match action {
        "turn_on" => Some("on"),
        "turn_off" => Some("off"),
        "open_cover" => Some("open"),
        "close_cover" => Some("closed"),
        "lock" => Some("locked"),
        "unlock" => Some("unlocked"),
        "toggle" => match current {
            Some("on") => Some("off"),
            Some("off") => Some("on"),
            _ => None,
        },
        _ => None,
    }
}

#[async_trait]
impl EntityProvider for FixtureHome {
    async fn list_exposed_entities(&self) -> Result<Vec<EntitySnapshot>, DomainError> {
        let entities = self.entities.lock().await;
        Ok(entities
            .iter()
            .filter(|e| {
                if !e.exposed {
                    debug!("Entity {} is not exposed, skipping", e.id);
                }
                e.exposed
            })
            .map(|e| {
                let domain = e.domain();
                EntitySnapshot::new(e.id.clone(), domain)
                    .with_name(e.name.clone().unwrap_or_default())
                    .with_status(e.state.clone().unwrap_or_default())
                    .with_actions(self.services_for(domain).iter().cloned())
            })
            .collect())
    }

    async fn host_variables(&self) -> Result<HostVariables, DomainError> {
        Ok(HostVariables::new(self.location_name.clone()))
    }
}

#[async_trait]
impl CapabilityRegistry for FixtureHome {
    async fn has_capability(&self, domain: &str, action: &str) -> bool {
        self.services_for(domain).iter().any(|s| s == action)
    }

    async fn invoke(
        &self,
        domain: &str,
        action: &str,
        entity_id: &str,
    ) -> Result<(), DomainError> {
        let mut entities = self.entities.lock().await;
        let entity = entities
            .iter_mut()
            .find(|e| e.id == entity_id)
            .ok_or_else(|| DomainError::not_found(format!("entity {entity_id}")))?;

        if let Some(state) = next_state(action, entity.state.as_deref()) {
            entity.state = Some(state.to_string());
        }
        info!(
            "Called {}.{} on {} (state now {})",
            domain,
            action,
            entity_id,
            entity.state.as_deref().unwrap_or("unknown")
        );

        self.invocations
            .lock()
            .await
            .push(ActionRequest::new(entity_id, domain, action));
        Ok(())
    }
}
