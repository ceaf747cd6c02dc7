//! End-to-end tests for a conversation turn.
//!
//! These drive `ProcessUtteranceUseCase` with the in-crate mock chat client,
//! a fixture home and the LRU conversation store.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use openai_control::{
    ActionRequest, AgentSettings, ConversationStore, DispatchOutcome, DomainError,
    EntityProvider, EntitySnapshot, ExtractionStrategy, FixtureHome, HostVariables,
    LruConversationStore, MockChatClient, ProcessUtteranceUseCase, ResponseExtractor, Role,
    TurnOutcome,
};

const KITCHEN_HOME: &str = r#"{
    "location_name": "Maple Street",
    "entities": [
        {"id": "light.kitchen", "name": "Kitchen", "state": "off", "exposed": true}
    ],
    "services": {"light": ["turn_on", "turn_off"]}
}"#;

const KITCHEN_COMMAND: &str = r#"{"entities":[{"id":"light.kitchen","domain":"light","action":"turn_on"}],"assistant":"Turning on the kitchen light."}"#;

struct TestEnv {
    home: Arc<FixtureHome>,
    chat: Arc<MockChatClient>,
    store: Arc<LruConversationStore>,
    use_case: ProcessUtteranceUseCase,
}

fn setup_test_env_with(home_json: &str, settings: AgentSettings) -> TestEnv {
    let home = Arc::new(FixtureHome::from_json_str(home_json).expect("fixture"));
    let chat = Arc::new(MockChatClient::new());
    let store = Arc::new(LruConversationStore::new(16).expect("store"));
    let use_case = ProcessUtteranceUseCase::new(
        home.clone(),
        home.clone(),
        chat.clone(),
        store.clone(),
        settings,
    );

    TestEnv {
        home,
        chat,
        store,
        use_case,
    }
}

fn setup_test_env() -> TestEnv {
    setup_test_env_with(KITCHEN_HOME, AgentSettings::default())
}

async fn history_roles(store: &LruConversationStore, id: &str) -> Vec<Role> {
    let handle = store.get(id).await.expect("conversation stored");
    let session = handle.lock().await;
    session.messages().iter().map(|m| m.role()).collect()
}

#[tokio::test]
async fn test_new_conversation_turns_on_kitchen_light() {
    let env = setup_test_env();
    env.chat.push_response(KITCHEN_COMMAND).await;

    let result = env
        .use_case
        .execute("turn on the kitchen light", None, "en")
        .await;

    assert!(!result.is_error());
    assert_eq!(result.outcome(), TurnOutcome::Structured);
    assert_eq!(result.reply_text(), "Turning on the kitchen light.");
    assert!(!result.conversation_id().is_empty());

    assert_eq!(
        env.home.invocations().await,
        vec![ActionRequest::new("light.kitchen", "light", "turn_on")]
    );
    assert_eq!(env.home.state_of("light.kitchen").await.as_deref(), Some("on"));

    assert_eq!(
        history_roles(&env.store, result.conversation_id()).await,
        vec![Role::System, Role::User, Role::Assistant]
    );
}

#[tokio::test]
async fn test_request_carries_settings_and_rendered_prompt() {
    let settings = AgentSettings::default()
        .with_chat_model("gpt-4o-mini")
        .with_max_tokens(100)
        .with_top_p(0.9)
        .with_temperature(0.1);
    let env = setup_test_env_with(KITCHEN_HOME, settings);
    env.chat.push_response(KITCHEN_COMMAND).await;

    let result = env
        .use_case
        .execute("turn on the kitchen light", None, "en")
        .await;
    let request = env.chat.last_request().await.expect("model was called");

    assert_eq!(request.model, "gpt-4o-mini");
    assert_eq!(request.max_tokens, 100);
    assert_eq!(request.top_p, 0.9);
    assert_eq!(request.temperature, 0.1);
    assert_eq!(request.user, result.conversation_id());

    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role(), Role::System);
    assert!(request.messages[0]
        .content()
        .starts_with("This smart home is controlled by Home Assistant."));

    let prompt = request.messages[1].content();
    assert!(prompt.contains("light.kitchen<>Kitchen<>light<>off<>turn_on,turn_off"));
    assert!(prompt.contains("Prompt: \"turn on the kitchen light\""));

    // The transcript keeps the raw utterance, not the rendered prompt.
    let handle = env.store.get(result.conversation_id()).await.unwrap();
    let session = handle.lock().await;
    assert_eq!(session.messages()[1].content(), "turn on the kitchen light");
}

#[tokio::test]
async fn test_malformed_preamble_skips_model_and_history() {
    let settings = AgentSettings::default().with_prompt("{{ undefined_location }} home");
    let env = setup_test_env_with(KITCHEN_HOME, settings);

    let result = env.use_case.execute("turn on the kitchen light", None, "en").await;

    assert!(result.is_error());
    assert_eq!(result.outcome(), TurnOutcome::TemplateError);
    assert!(result
        .reply_text()
        .starts_with("Sorry, I had a problem with my template:"));
    assert_eq!(env.chat.call_count(), 0);
    assert!(env.store.is_empty().await);
    assert!(env.store.get(result.conversation_id()).await.is_none());
    assert!(env.home.invocations().await.is_empty());
}

#[tokio::test]
async fn test_preamble_renders_location_name() {
    let settings = AgentSettings::default().with_prompt("{{ ha_name }} is a smart home.");
    let env = setup_test_env_with(KITCHEN_HOME, settings);

    env.use_case.execute("hello", None, "en").await;

    let request = env.chat.last_request().await.unwrap();
    assert!(request.messages[0]
        .content()
        .starts_with("Maple Street is a smart home."));
}

#[tokio::test]
async fn test_plain_text_reply_falls_back_to_raw_content() {
    let env = setup_test_env();
    env.chat.push_response("Hello! How can I help?").await;

    let result = env.use_case.execute("hi there", None, "en").await;

    assert!(!result.is_error());
    assert_eq!(result.outcome(), TurnOutcome::RawFallback);
    assert_eq!(result.reply_text(), "Hello! How can I help?");
    assert!(env.home.invocations().await.is_empty());
    assert_eq!(
        history_roles(&env.store, result.conversation_id()).await,
        vec![Role::System, Role::User, Role::Assistant]
    );
}

#[tokio::test]
async fn test_prose_prefixed_json_is_extracted() {
    let env = setup_test_env();
    env.chat
        .push_response(r#"Sure thing! {"entities":[],"assistant":"Done."}"#)
        .await;

    let result = env.use_case.execute("do nothing", None, "en").await;

    assert_eq!(result.reply_text(), "Done.");
    assert!(result.dispatched().is_empty());
    assert!(env.home.invocations().await.is_empty());
}

#[tokio::test]
async fn test_provider_error_leaves_history_untouched() {
    let env = setup_test_env();
    env.chat.push_response(KITCHEN_COMMAND).await;
    let first = env
        .use_case
        .execute("turn on the kitchen light", None, "en")
        .await;
    let id = first.conversation_id().to_string();

    env.chat.push_error("authentication failed (401 Unauthorized)").await;
    let failed = env
        .use_case
        .execute("and the hall light", Some(&id), "en")
        .await;

    assert!(failed.is_error());
    assert_eq!(failed.outcome(), TurnOutcome::ProviderError);
    assert_eq!(failed.conversation_id(), id);
    assert!(failed
        .reply_text()
        .contains("Sorry, I had a problem talking to OpenAI: authentication failed"));
    assert_eq!(history_roles(&env.store, &id).await.len(), 3);
}

#[tokio::test]
async fn test_provider_error_on_new_conversation_stores_nothing() {
    let env = setup_test_env();
    env.chat.push_error("connection failed").await;

    let result = env.use_case.execute("hello", None, "en").await;

    assert!(result.is_error());
    assert!(env.store.is_empty().await);
}

#[tokio::test]
async fn test_missing_assistant_field_still_runs_actions() {
    let env = setup_test_env();
    env.chat
        .push_response(r#"{"entities":[{"id":"light.kitchen","domain":"light","action":"turn_on"}]}"#)
        .await;

    let result = env
        .use_case
        .execute("turn on the kitchen light", None, "en")
        .await;

    assert!(result.is_error());
    assert_eq!(result.outcome(), TurnOutcome::AssistantFieldMissing);
    assert!(result
        .reply_text()
        .starts_with("Sorry, there was an error understanding OpenAI"));
    assert_eq!(env.home.invocations().await.len(), 1);
    assert_eq!(
        history_roles(&env.store, result.conversation_id()).await,
        vec![Role::System, Role::User]
    );
}

#[tokio::test]
async fn test_unknown_capability_does_not_fail_turn() {
    let env = setup_test_env();
    env.chat
        .push_response(
            r#"{"entities":[
                {"id":"light.kitchen","domain":"light","action":"explode"},
                {"id":"light.kitchen","domain":"light","action":"turn_on"}
            ],"assistant":"On it."}"#,
        )
        .await;

    let result = env.use_case.execute("kitchen light on", None, "en").await;

    assert!(!result.is_error());
    assert_eq!(result.reply_text(), "On it.");
    assert_eq!(result.dispatched().len(), 2);
    assert!(matches!(
        result.dispatched()[0],
        DispatchOutcome::UnknownCapability(_)
    ));
    assert!(result.dispatched()[1].is_invoked());
    assert_eq!(env.home.invocations().await.len(), 1);
}

#[tokio::test]
async fn test_every_requested_action_is_attempted() {
    let env = setup_test_env_with(
        include_str!("fixtures/home.json"),
        AgentSettings::default(),
    );
    env.chat
        .push_response(
            r#"{"entities":[
                {"id":"light.kitchen","domain":"light","action":"turn_on"},
                {"id":"light.living_room","domain":"light","action":"turn_off"},
                {"id":"switch.coffee_maker","domain":"switch","action":"toggle"}
            ],"assistant":"Good morning!"}"#,
        )
        .await;

    let result = env.use_case.execute("morning routine", None, "en").await;

    assert_eq!(result.reply_text(), "Good morning!");
    assert_eq!(result.dispatched().len(), 3);
    assert!(result.dispatched().iter().all(|o| o.is_invoked()));
    assert_eq!(env.home.state_of("light.living_room").await.as_deref(), Some("off"));
    assert_eq!(env.home.state_of("switch.coffee_maker").await.as_deref(), Some("on"));
}

#[tokio::test]
async fn test_unexposed_entities_are_not_shown_to_model() {
    let env = setup_test_env_with(
        include_str!("fixtures/home.json"),
        AgentSettings::default(),
    );

    env.use_case.execute("what is open?", None, "en").await;

    let request = env.chat.last_request().await.unwrap();
    let prompt = request.messages.last().unwrap().content();
    assert!(prompt.contains("sensor.outdoor_temperature<>"));
    assert!(!prompt.contains("cover.garage_door"));
}

#[tokio::test]
async fn test_follow_up_turn_continues_history() {
    let env = setup_test_env();
    env.chat.push_response(KITCHEN_COMMAND).await;
    env.chat
        .push_response(r#"{"entities":[{"id":"light.kitchen","domain":"light","action":"turn_off"}],"assistant":"Off again."}"#)
        .await;

    let first = env
        .use_case
        .execute("turn on the kitchen light", None, "en")
        .await;
    let second = env
        .use_case
        .execute("now turn it off", Some(first.conversation_id()), "en")
        .await;

    assert_eq!(second.conversation_id(), first.conversation_id());
    assert_eq!(second.reply_text(), "Off again.");

    let request = env.chat.last_request().await.unwrap();
    let roles: Vec<Role> = request.messages.iter().map(|m| m.role()).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::User]
    );
    assert_eq!(request.messages[2].content(), "Turning on the kitchen light.");
    assert_eq!(
        history_roles(&env.store, first.conversation_id()).await.len(),
        5
    );
    assert_eq!(env.store.len().await, 1);
}

#[tokio::test]
async fn test_unknown_conversation_id_starts_new_conversation() {
    let env = setup_test_env();

    let result = env
        .use_case
        .execute("hello", Some("does-not-exist"), "en")
        .await;

    assert_ne!(result.conversation_id(), "does-not-exist");
    assert!(env.store.get("does-not-exist").await.is_none());
    assert!(env.store.get(result.conversation_id()).await.is_some());
}

#[tokio::test]
async fn test_result_carries_language() {
    let env = setup_test_env();
    let result = env.use_case.execute("hallo", None, "de").await;
    assert_eq!(result.language(), "de");
}

#[tokio::test]
async fn test_concurrent_turns_on_one_conversation_keep_order() {
    let env = setup_test_env();
    let first = env.use_case.execute("hello", None, "en").await;
    let id = first.conversation_id().to_string();

    env.chat.push_response(r#"{"assistant":"one"}"#).await;
    env.chat.push_response(r#"{"assistant":"two"}"#).await;

    let (a, b) = tokio::join!(
        env.use_case.execute("first", Some(&id), "en"),
        env.use_case.execute("second", Some(&id), "en"),
    );
    assert!(!a.is_error() && !b.is_error());

    let roles = history_roles(&env.store, &id).await;
    assert_eq!(
        roles,
        vec![
            Role::System,
            Role::User,
            Role::Assistant,
            Role::User,
            Role::Assistant,
            Role::User,
            Role::Assistant
        ]
    );
}

#[tokio::test]
async fn test_container_loads_options_file_and_home_fixture() {
    use std::io::Write;

    use openai_control::{Container, ContainerConfig};

    let mut options = tempfile::NamedTempFile::new().unwrap();
    write!(
        options,
        r#"{{"prompt": "{{{{ ha_name }}}} runs on Home Assistant.", "chat_model": "gpt-4o", "max_tokens": 64}}"#
    )
    .unwrap();

    let container = Container::new(ContainerConfig {
        options_path: Some(options.path().display().to_string()),
        temperature: Some(0.2),
        home_path: Some(format!(
            "{}/tests/fixtures/home.json",
            env!("CARGO_MANIFEST_DIR")
        )),
        mock_llm: true,
        ..Default::default()
    })
    .await
    .unwrap();

    let settings = container.settings();
    assert_eq!(settings.chat_model, "gpt-4o");
    assert_eq!(settings.max_tokens, 64);
    assert_eq!(settings.temperature, 0.2);
    assert_eq!(settings.top_p, 1.0);
    assert!(container.openai_client().is_none());

    let result = container
        .process_utterance_use_case()
        .execute("hello", None, "en")
        .await;
    assert_eq!(result.reply_text(), "This is a mock reply.");
}

#[tokio::test]
async fn test_container_rejects_invalid_options() {
    use openai_control::{Container, ContainerConfig};

    let result = Container::new(ContainerConfig {
        top_p: Some(1.5),
        mock_llm: true,
        ..Default::default()
    })
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_unexposed_target_is_attempted_once() {
    let env = setup_test_env_with(
        include_str!("fixtures/home.json"),
        AgentSettings::default(),
    );
    env.chat
        .push_response(
            r#"{"entities":[{"id":"cover.garage_door","domain":"cover","action":"open_cover"}],"assistant":"Opening the garage."}"#,
        )
        .await;

    let result = env.use_case.execute("open the garage", None, "en").await;

    assert_eq!(result.outcome(), TurnOutcome::Structured);
    assert_eq!(result.dispatched().len(), 1);
    assert!(result.dispatched()[0].is_invoked());
    assert_eq!(
        env.home.invocations().await,
        vec![ActionRequest::new("cover.garage_door", "cover", "open_cover")]
    );
    assert_eq!(env.home.state_of("cover.garage_door").await.as_deref(), Some("open"));
}

/// Recognises replies of the form `REPLY: <text>`.
struct PrefixedReply;

impl ExtractionStrategy for PrefixedReply {
    fn name(&self) -> &'static str {
        "prefixed_reply"
    }

    fn extract(&self, raw: &str) -> Option<Map<String, Value>> {
        let text = raw.strip_prefix("REPLY:")?;
        let mut object = Map::new();
        object.insert("assistant".to_string(), Value::String(text.trim().to_string()));
        Some(object)
    }
}

#[tokio::test]
async fn test_custom_extraction_strategy_joins_chain() {
    let home = Arc::new(FixtureHome::from_json_str(KITCHEN_HOME).unwrap());
    let chat = Arc::new(MockChatClient::new());
    let store = Arc::new(LruConversationStore::new(4).unwrap());
    let extractor = ResponseExtractor::default().with_strategy(Box::new(PrefixedReply));
    assert_eq!(
        extractor.strategy_names(),
        vec!["exact", "brace_bounded", "code_fence", "prefixed_reply"]
    );
    let use_case = ProcessUtteranceUseCase::new(
        home.clone(),
        home.clone(),
        chat.clone(),
        store,
        AgentSettings::default(),
    )
    .with_extractor(extractor);

    chat.push_response("REPLY: Nothing to do.").await;
    let result = use_case.execute("hello", None, "en").await;

    assert_eq!(result.outcome(), TurnOutcome::Structured);
    assert_eq!(result.reply_text(), "Nothing to do.");
}

/// Lists the fixture's entities but cannot report host variables.
struct NoHostVariables(Arc<FixtureHome>);

#[async_trait]
impl EntityProvider for NoHostVariables {
    async fn list_exposed_entities(&self) -> Result<Vec<EntitySnapshot>, DomainError> {
        self.0.list_exposed_entities().await
    }

    async fn host_variables(&self) -> Result<HostVariables, DomainError> {
        Err(DomainError::host("config endpoint unavailable"))
    }
}

#[tokio::test]
async fn test_host_variable_failure_renders_empty_location() {
    let home = Arc::new(FixtureHome::from_json_str(KITCHEN_HOME).unwrap());
    let chat = Arc::new(MockChatClient::new());
    let store = Arc::new(LruConversationStore::new(4).unwrap());
    let use_case = ProcessUtteranceUseCase::new(
        Arc::new(NoHostVariables(home.clone())),
        home,
        chat.clone(),
        store,
        AgentSettings::default().with_prompt("[{{ ha_name }}] smart home."),
    );

    let result = use_case.execute("hello", None, "en").await;

    assert!(!result.is_error());
    let request = chat.last_request().await.unwrap();
    assert!(request.messages[0].content().starts_with("[] smart home."));
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

#[tokio::test]
async fn test_dispatch_warnings_carry_conversation_id() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let env = setup_test_env();
    env.chat
        .push_response(
            r#"{"entities":[
                {"id":"light.kitchen","domain":"light","action":"explode"},
                {"id":"light.gone","domain":"light","action":"turn_on"}
            ],"assistant":"Trying."}"#,
        )
        .await;

    let result = env.use_case.execute("do things", None, "en").await;
    let id = result.conversation_id();

    let warnings: Vec<String> = logs
        .lines()
        .into_iter()
        .filter(|line| line.contains("WARN"))
        .collect();
    assert_eq!(warnings.len(), 3, "{warnings:#?}");
    assert!(warnings.iter().any(|l| l.contains("not exposed")));
    assert!(warnings.iter().any(|l| l.contains("Unknown capability")));
    assert!(warnings.iter().any(|l| l.contains("Failed to invoke")));
    for line in &warnings {
        assert!(line.contains(id), "missing conversation id: {line}");
    }
}
