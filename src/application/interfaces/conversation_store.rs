use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::ConversationSession;

/// Shared handle to one conversation. Holding the lock for a whole turn
/// serializes concurrent turns on the same conversation id.
pub type SessionHandle = Arc<Mutex<ConversationSession>>;

/// Keeps conversation transcripts between turns.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get(&self, conversation_id: &str) -> Option<SessionHandle>;

    /// Store a session under its own id, replacing any previous one.
    async fn insert(&self, session: ConversationSession) -> SessionHandle;

    async fn remove(&self, conversation_id: &str) -> Option<SessionHandle>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
