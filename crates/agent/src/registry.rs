//! Session registry — one controller per open conversation.
//!
//! Conversations never share a record or transcript; the registry only hands
//! out controllers by id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hcplog_config::{AppConfig, SessionConfig};
use hcplog_core::assistant::Assistant;
use hcplog_core::event::EventBus;
use hcplog_core::message::ConversationId;
use hcplog_store::{MergePolicy, RecordStore};
use tokio::sync::RwLock;
use tracing::info;

use crate::controller::ConversationController;

pub struct SessionRegistry {
    sessions: RwLock<HashMap<ConversationId, Arc<ConversationController>>>,
    assistant: Arc<dyn Assistant>,
    events: Arc<EventBus>,
    session: SessionConfig,
    timeout: Option<Duration>,
}

impl SessionRegistry {
    /// Create an empty registry with default session settings.
    pub fn new(assistant: Arc<dyn Assistant>, events: Arc<EventBus>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            assistant,
            events,
            session: SessionConfig::default(),
            timeout: None,
        }
    }

    /// Create an empty registry using the session and timeout settings in `config`.
    pub fn from_config(
        config: &AppConfig,
        assistant: Arc<dyn Assistant>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            session: config.session.clone(),
            timeout: config.assistant.timeout_secs.map(Duration::from_secs),
            ..Self::new(assistant, events)
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Open a fresh conversation dated today, greeting included.
    pub async fn open(&self) -> Arc<ConversationController> {
        let id = ConversationId::new();
        let store = RecordStore::new(id.clone(), &self.session.greeting, self.events.clone());

        let policy = if self.session.honor_payload_tags {
            MergePolicy::honoring_tags()
        } else {
            MergePolicy::new()
        };
        let mut controller = ConversationController::new(store, self.assistant.clone())
            .with_policy(policy)
            .with_failure_message(self.session.failure_message.clone());
        if let Some(timeout) = self.timeout {
            controller = controller.with_timeout(timeout);
        }

        let controller = Arc::new(controller);
        self.sessions.write().await.insert(id.clone(), controller.clone());
        info!(conversation_id = %id, assistant = self.assistant.name(), "Opened conversation");
        controller
    }

    pub async fn get(&self, id: &ConversationId) -> Option<Arc<ConversationController>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Forget a conversation. Its state goes away with the last controller handle.
    pub async fn close(&self, id: &ConversationId) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!(conversation_id = %id, "Closed conversation");
        }
        removed
    }

    /// Ids of all open conversations.
    pub async fn list(&self) -> Vec<ConversationId> {
        self.sessions.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
