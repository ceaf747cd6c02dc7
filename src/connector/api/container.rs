use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::application::{
    CapabilityRegistry, ChatClient, ConversationStore, EntityProvider, ProcessUtteranceUseCase,
};
use crate::connector::adapter::{
    FixtureDefinition, FixtureHome, HassRestHome, LruConversationStore, MockChatClient,
    OpenAiClient,
};
use crate::domain::AgentSettings;

#[derive(Default)]
pub struct ContainerConfig {
    /// JSON options file; missing fields take their defaults.
    pub options_path: Option<String>,
    pub chat_model: Option<String>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub temperature: Option<f32>,
    pub session_capacity: Option<usize>,
    /// JSON home fixture file.
    pub home_path: Option<String>,
    /// Home Assistant base URL; takes precedence over `home_path`.
    pub hass_url: Option<String>,
    /// Entity ids exposed to the agent when talking to Home Assistant.
    pub exposed_entities: Vec<String>,
    /// Answer from the scripted mock client instead of calling OpenAI.
    pub mock_llm: bool,
}

impl ContainerConfig {
    fn settings(&self) -> Result<AgentSettings> {
        let mut settings = match self.options_path.as_deref() {
            Some(path) => AgentSettings::from_json_file(path)
                .with_context(|| format!("failed to load options from {path}"))?,
            None => AgentSettings::default(),
        };

        if let Some(model) = &self.chat_model {
            settings = settings.with_chat_model(model.clone());
        }
        if let Some(max_tokens) = self.max_tokens {
            settings = settings.with_max_tokens(max_tokens);
        }
        if let Some(top_p) = self.top_p {
            settings = settings.with_top_p(top_p);
        }
        if let Some(temperature) = self.temperature {
            settings = settings.with_temperature(temperature);
        }
        if let Some(capacity) = self.session_capacity {
            settings = settings.with_session_capacity(capacity);
        }

        settings.validate()?;
        Ok(settings)
    }
}

pub struct Container {
    entity_provider: Arc<dyn EntityProvider>,
    capability_registry: Arc<dyn CapabilityRegistry>,
    chat_client: Arc<dyn ChatClient>,
    /// Present unless the mock client is in use; needed for key checks.
    openai_client: Option<Arc<OpenAiClient>>,
    store: Arc<dyn ConversationStore>,
    settings: AgentSettings,
}

impl Container {
    pub async fn new(config: ContainerConfig) -> Result<Self> {
        let settings = config.settings()?;
        debug!("Agent settings: {:?}", settings);

        // Initialize host access
        let (entity_provider, capability_registry): (
            Arc<dyn EntityProvider>,
            Arc<dyn CapabilityRegistry>,
        ) = if let Some(url) = config.hass_url.as_deref() {
            debug!(
                "Using Home Assistant at {} with {} exposed entities",
                url,
                config.exposed_entities.len()
            );
            let home = Arc::new(HassRestHome::from_env(
                url,
                config.exposed_entities.iter().cloned(),
            )?);
            (home.clone(), home)
        } else if let Some(path) = config.home_path.as_deref() {
            debug!("Using home fixture {}", path);
            let home = Arc::new(
                FixtureHome::from_file(path)
                    .with_context(|| format!("failed to load home fixture {path}"))?,
            );
            (home.clone(), home)
        } else {
            warn!("No home configured (--home or --hass-url); the agent sees no devices");
            let home = Arc::new(FixtureHome::new(FixtureDefinition::default()));
            (home.clone(), home)
        };

        // Initialize chat client
        let (chat_client, openai_client): (Arc<dyn ChatClient>, Option<Arc<OpenAiClient>>) =
            if config.mock_llm {
                debug!("Using mock chat client");
                (Arc::new(MockChatClient::new()), None)
            } else {
                debug!(
                    "Using OpenAI chat completions at {}",
                    OpenAiClient::configured_base_url()
                );
                let client = Arc::new(OpenAiClient::from_env()?);
                (client.clone(), Some(client))
            };

        let store = Arc::new(LruConversationStore::new(settings.session_capacity)?);
        debug!("Conversation store holds up to {} sessions", store.capacity().await);

        Ok(Self {
            entity_provider,
            capability_registry,
            chat_client,
            openai_client,
            store,
            settings,
        })
    }

    pub fn process_utterance_use_case(&self) -> ProcessUtteranceUseCase {
        ProcessUtteranceUseCase::new(
            self.entity_provider.clone(),
            self.capability_registry.clone(),
            self.chat_client.clone(),
            self.store.clone(),
            self.settings.clone(),
        )
    }

    pub fn entity_provider(&self) -> Arc<dyn EntityProvider> {
        self.entity_provider.clone()
    }

    pub fn openai_client(&self) -> Option<Arc<OpenAiClient>> {
        self.openai_client.clone()
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }
}
