use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::application::{CapabilityRegistry, EntityProvider};
use crate::domain::{DomainError, EntitySnapshot, HostVariables};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct StateObject {
    entity_id: String,
    state: String,
    #[serde(default)]
    attributes: StateAttributes,
}

#[derive(Default, Deserialize)]
struct StateAttributes {
    #[serde(default)]
    friendly_name: Option<String>,
}

#[derive(Deserialize)]
struct ServiceDomain {
    domain: String,
    services: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct ConfigObject {
    #[serde(default)]
    location_name: String,
}

type ServiceIndex = BTreeMap<String, Vec<String>>;

/// Home Assistant over its REST API.
///
/// The REST API does not carry the conversation-exposure flag, so the set of
/// exposed entities is given explicitly. The service index is refreshed every
/// time entities are listed (once per turn) and reused for capability checks.
pub struct HassRestHome {
    client: reqwest::Client,
    base_url: String,
    token: String,
    exposed: HashSet<String>,
    services: Mutex<Option<ServiceIndex>>,
}

impl HassRestHome {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        exposed: impl IntoIterator<Item = String>,
    ) -> Self {
        let base: String = base_url.into();
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base.trim_end_matches('/').to_string(),
            token: token.into(),
            exposed: exposed.into_iter().collect(),
            services: Mutex::new(None),
        }
    }

    /// `HASS_TOKEN` holds a long-lived access token.
    pub fn from_env(
        base_url: impl Into<String>,
        exposed: impl IntoIterator<Item = String>,
    ) -> Result<Self, DomainError> {
        let token = std::env::var("HASS_TOKEN")
            .map_err(|_| DomainError::invalid_input("HASS_TOKEN is not set"))?;
        Ok(Self::new(base_url, token, exposed))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DomainError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| DomainError::host(format!("GET {path} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(DomainError::host(format!(
                "GET {path} returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DomainError::host(format!("GET {path}: invalid response: {e}")))
    }

    async fn refresh_services(&self) -> Result<ServiceIndex, DomainError> {
        let domains: Vec<ServiceDomain> = self.get_json("/api/services").await?;
        let index: ServiceIndex = domains
            .into_iter()
            .map(|d| (d.domain, d.services.into_keys().collect()))
            .collect();
        *self.services.lock().await = Some(index.clone());
        Ok(index)
    }

    async fn service_index(&self) -> Result<ServiceIndex, DomainError> {
        if let Some(index) = self.services.lock().await.as_ref() {
            return Ok(index.clone());
        }
        self.refresh_services().await
    }
}

#[async_trait]
impl EntityProvider for HassRestHome {
    async fn list_exposed_entities(&self) -> Result<Vec<EntitySnapshot>, DomainError> {
        let services = self.refresh_services().await?;
        let states: Vec<StateObject> = self.get_json("/api/states").await?;

        let entities: Vec<EntitySnapshot> = states
            .into_iter()
            .filter(|s| self.exposed.contains(&s.entity_id))
            .map(|s| {
                let domain = s.entity_id.split('.').next().unwrap_or_default().to_string();
                let actions = services.get(&domain).cloned().unwrap_or_default();
                EntitySnapshot::new(s.entity_id, domain)
                    .with_name(s.attributes.friendly_name.unwrap_or_default())
                    .with_status(s.state)
                    .with_actions(actions)
            })
            .collect();

        if entities.len() < self.exposed.len() {
            warn!(
                "{} of {} exposed entities were not found in Home Assistant",
                self.exposed.len() - entities.len(),
                self.exposed.len()
            );
        }
        Ok(entities)
    }

    async fn host_variables(&self) -> Result<HostVariables, DomainError> {
        let config: ConfigObject = self.get_json("/api/config").await?;
        Ok(HostVariables::new(config.location_name))
    }
}

#[async_trait]
impl CapabilityRegistry for HassRestHome {
    async fn has_capability(&self, domain: &str, action: &str) -> bool {
        match self.service_index().await {
            Ok(index) => index
                .get(domain)
                .is_some_and(|services| services.iter().any(|s| s == action)),
            Err(e) => {
                warn!("Could not load Home Assistant services: {e}");
                false
            }
        }
    }

    async fn invoke(
        &self,
        domain: &str,
        action: &str,
        entity_id: &str,
    ) -> Result<(), DomainError> {
        let path = format!("/api/services/{domain}/{action}");
        let response = self
            .client
            .post(self.url(&path))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "entity_id": entity_id }))
            .send()
            .await
            .map_err(|e| DomainError::host(format!("POST {path} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(DomainError::host(format!(
                "POST {path} returned {}",
                response.status()
            )));
        }

        debug!("Home Assistant accepted {domain}.{action} for {entity_id}");
        Ok(())
    }
}
