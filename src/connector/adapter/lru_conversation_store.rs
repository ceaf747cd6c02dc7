use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::{ConversationStore, SessionHandle};
use crate::domain::{ConversationSession, DomainError};

/// In-memory conversation store bounded by entry count.
///
/// Looking a conversation up marks it as recently used; inserting past
/// capacity evicts the least recently used conversation.
pub struct LruConversationStore {
    sessions: Mutex<LruCache<String, SessionHandle>>,
}

impl LruConversationStore {
    pub fn new(capacity: usize) -> Result<Self, DomainError> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| DomainError::invalid_input("session capacity must be positive"))?;

        Ok(Self {
            sessions: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub async fn capacity(&self) -> usize {
        self.sessions.lock().await.cap().get()
    }
}

#[async_trait]
impl ConversationStore for LruConversationStore {
    async fn get(&self, conversation_id: &str) -> Option<SessionHandle> {
        self.sessions.lock().await.get(conversation_id).cloned()
    }

    async fn insert(&self, session: ConversationSession) -> SessionHandle {
        let id = session.id().to_string();
        let handle: SessionHandle = Arc::new(Mutex::new(session));

        let mut sessions = self.sessions.lock().await;
        if let Some((evicted, _)) = sessions.push(id.clone(), handle.clone()) {
            if evicted != id {
                debug!("Evicted least recently used conversation {}", evicted);
            }
        }
        handle
    }

    async fn remove(&self, conversation_id: &str) -> Option<SessionHandle> {
        self.sessions.lock().await.pop(conversation_id)
    }

    async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
