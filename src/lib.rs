pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use cli::Commands;

pub use application::{
    ActionDispatcher, CapabilityRegistry, ChatClient, ChatRequest, ConversationStore,
    EntityProvider, ProcessUtteranceUseCase, SessionHandle,
};

pub use connector::{
    Container, ContainerConfig, FixtureDefinition, FixtureEntity, FixtureHome, HassRestHome,
    LruConversationStore, MockChatClient, OpenAiClient, Router,
};

pub use domain::{
    ActionPayload, ActionRequest, AgentSettings, ConversationResult, ConversationSession,
    DispatchOutcome, DomainError, EntitySnapshot, ExtractionStrategy, HostVariables, Message,
    PromptRenderer, ResponseExtractor, Role, TurnOutcome,
};
