use std::sync::Arc;
use std::time::Instant;

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::application::{
    ActionDispatcher, CapabilityRegistry, ChatClient, ChatRequest, ConversationStore,
    EntityProvider,
};
use crate::domain::{
    AgentSettings, ConversationResult, ConversationSession, DomainError, HostVariables, Message,
    PromptRenderer, ResponseExtractor, TurnOutcome,
};

pub const ATTRIBUTION_NAME: &str = "Powered by OpenAI";
pub const ATTRIBUTION_URL: &str = "https://www.openai.com";
/// Replies are produced by the model itself, so any language is accepted.
pub const SUPPORTED_LANGUAGES: &str = "*";

/// The session a turn works on: either one already in the store (locked for
/// the whole turn) or a new one that only reaches the store on commit.
enum TurnSession {
    Stored(OwnedMutexGuard<ConversationSession>),
    Fresh(ConversationSession),
}

impl TurnSession {
    fn session(&self) -> &ConversationSession {
        match self {
            TurnSession::Stored(guard) => &**guard,
            TurnSession::Fresh(session) => session,
        }
    }

    fn id(&self) -> String {
        self.session().id().to_string()
    }

    async fn commit(self, store: &dyn ConversationStore, appended: Vec<Message>) {
        match self {
            TurnSession::Stored(mut guard) => {
                for message in appended {
                    guard.append(message);
                }
            }
            TurnSession::Fresh(mut session) => {
                for message in appended {
                    session.append(message);
                }
                store.insert(session).await;
            }
        }
    }
}

/// Handles one utterance end to end: preamble, session, entity snapshot,
/// prompt, model call, extraction, dispatch, reply, history.
///
/// The preamble template failing and the model call failing are the only
/// two early exits; neither touches the conversation history.
pub struct ProcessUtteranceUseCase {
    entity_provider: Arc<dyn EntityProvider>,
    chat_client: Arc<dyn ChatClient>,
    store: Arc<dyn ConversationStore>,
    dispatcher: ActionDispatcher,
    renderer: PromptRenderer,
    extractor: ResponseExtractor,
    settings: AgentSettings,
}

impl ProcessUtteranceUseCase {
    pub fn new(
        entity_provider: Arc<dyn EntityProvider>,
        capability_registry: Arc<dyn CapabilityRegistry>,
        chat_client: Arc<dyn ChatClient>,
        store: Arc<dyn ConversationStore>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            entity_provider,
            chat_client,
            store,
            dispatcher: ActionDispatcher::new(capability_registry),
            renderer: PromptRenderer::new(),
            extractor: ResponseExtractor::default(),
            settings,
        }
    }

    pub fn with_extractor(mut self, extractor: ResponseExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub async fn execute(
        &self,
        user_text: &str,
        conversation_id: Option<&str>,
        language: &str,
    ) -> ConversationResult {
        let start_time = Instant::now();

        let host_vars = match self.entity_provider.host_variables().await {
            Ok(vars) => vars,
            Err(e) => {
                warn!(
                    "Failed to read host variables for conversation {:?}, rendering preamble without them: {e}",
                    conversation_id
                );
                HostVariables::default()
            }
        };

        let system_message = match self
            .renderer
            .render_system_message(&self.settings.prompt, &host_vars)
        {
            Ok(message) => message,
            Err(e) => {
                error!(
                    "Error rendering prompt for conversation {:?}: {} (template: {:?})",
                    conversation_id, e, self.settings.prompt
                );
                let id = conversation_id
                    .map(str::to_string)
                    .unwrap_or_else(ConversationSession::generate_id);
                return ConversationResult::new(
                    format!("Sorry, I had a problem with my template: {}", detail(&e)),
                    id,
                    language,
                    TurnOutcome::TemplateError,
                );
            }
        };

        let turn = self.resolve_session(conversation_id, system_message).await;
        let span = info_span!("turn", conversation_id = %turn.id());

        let result = self
            .run_turn(turn, user_text, language)
            .instrument(span)
            .await;

        info!(
            "Conversation {} turn finished as {:?} in {:.2}s",
            result.conversation_id(),
            result.outcome(),
            start_time.elapsed().as_secs_f64()
        );
        result
    }

    /// Everything after the session is resolved. Runs inside the `turn`
    /// span so host, extraction and dispatch logs carry the conversation id.
    async fn run_turn(
        &self,
        turn: TurnSession,
        user_text: &str,
        language: &str,
    ) -> ConversationResult {
        let id = turn.id();

        let entities = match self.entity_provider.list_exposed_entities().await {
            Ok(entities) => entities,
            Err(e) => {
                error!("Failed to list exposed entities for conversation {id}: {e}");
                Vec::new()
            }
        };
        debug!("Conversation {id}: {} exposed entities", entities.len());

        let entities_text = PromptRenderer::render_entities(&entities);
        let prompt = PromptRenderer::render_prompt(&entities_text, user_text);

        let mut messages = turn.session().messages().to_vec();
        messages.push(Message::user(prompt));

        let request = ChatRequest::from_settings(&self.settings, messages, id.clone());
        debug!("Prompt for {}: {:?}", request.model, request.messages);

        let content = match self.chat_client.complete(&request).await {
            Ok(content) => content,
            Err(e) => {
                error!(
                    "Chat completion failed for conversation {id} (utterance {:?}): {e}",
                    user_text
                );
                return ConversationResult::new(
                    format!("Sorry, I had a problem talking to OpenAI: {}", detail(&e)),
                    id,
                    language,
                    TurnOutcome::ProviderError,
                );
            }
        };
        debug!("Response for {}: {}", request.model, content);

        match self.extractor.extract(&content) {
            None => {
                turn.commit(
                    self.store.as_ref(),
                    vec![Message::user(user_text), Message::assistant(content.as_str())],
                )
                .await;
                ConversationResult::new(content, id, language, TurnOutcome::RawFallback)
            }
            Some(payload) => {
                // Actions run before the assistant field is checked, so a
                // payload without one can still have switched devices.
                if !payload.has_actions() {
                    info!("No entities detected for prompt {:?}", user_text);
                }
                let dispatched = self
                    .dispatcher
                    .dispatch(payload.actions(), &entities)
                    .await;

                match payload.assistant() {
                    Some(reply) => {
                        turn.commit(
                            self.store.as_ref(),
                            vec![Message::user(user_text), Message::assistant(reply)],
                        )
                        .await;
                        ConversationResult::new(reply, id, language, TurnOutcome::Structured)
                            .with_dispatched(dispatched)
                    }
                    None => {
                        error!(
                            "Error extracting assistant response for conversation {id} (utterance {:?}): {}",
                            user_text, content
                        );
                        turn.commit(self.store.as_ref(), vec![Message::user(user_text)])
                            .await;
                        ConversationResult::new(
                            "Sorry, there was an error understanding OpenAI: the response had no \"assistant\" field",
                            id,
                            language,
                            TurnOutcome::AssistantFieldMissing,
                        )
                        .with_dispatched(dispatched)
                    }
                }
            }
        }
    }

    /// Known ids continue their transcript; absent or unknown ids start a new
    /// one seeded with the system message.
    async fn resolve_session(
        &self,
        conversation_id: Option<&str>,
        system_message: String,
    ) -> TurnSession {
        if let Some(id) = conversation_id {
            if let Some(handle) = self.store.get(id).await {
                debug!("Continuing conversation {id}");
                return TurnSession::Stored(handle.lock_owned().await);
            }
            debug!("Unknown conversation {id}, starting a new one");
        }

        let session = ConversationSession::start(system_message);
        debug!("Started conversation {}", session.id());
        TurnSession::Fresh(session)
    }
}

fn detail(err: &DomainError) -> String {
    match err {
        DomainError::TemplateError(msg) | DomainError::ProviderError(msg) => msg.clone(),
        other => other.to_string(),
    }
}
