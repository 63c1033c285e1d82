//! The record store — one conversation's state behind a command handler.

use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use hcplog_core::assistant::AssistantRequest;
use hcplog_core::error::{Error, MessageError, RecordError};
use hcplog_core::event::{DomainEvent, EventBus};
use hcplog_core::extraction::{ExtractionPayload, FillKind, FillSource};
use hcplog_core::message::{ChatMessage, ConversationId, Sender, Transcript};
use hcplog_core::record::{FieldName, FieldUpdate, InteractionRecord};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

/// Everything a conversation owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    pub record: InteractionRecord,
    pub transcript: Transcript,
    pub pending_request: bool,
    pub last_fill_source: FillSource,
}

impl ConversationState {
    /// Fresh session state: a blank record dated `today` and a greeting.
    pub fn new(today: NaiveDate, greeting: &str) -> Self {
        let mut transcript = Transcript::new();
        transcript.push(Sender::Assistant, greeting);
        Self {
            record: InteractionRecord::new(today),
            transcript,
            pending_request: false,
            last_fill_source: FillSource::None,
        }
    }
}

/// The closed set of mutations the store accepts.
#[derive(Debug, Clone)]
pub enum StoreCommand {
    /// Set one named field.
    PatchField { field: String, value: Value },

    /// Merge several fields at once. Unlisted fields keep their values.
    ReplaceFields {
        fields: ExtractionPayload,
        source: FillKind,
    },

    /// Append a chat message.
    AppendMessage { sender: Sender, text: String },

    /// Append the user's message and mark a request as pending, atomically.
    BeginTurn { text: String },

    /// Clear the pending flag.
    EndTurn,
}

/// What a successful command did.
#[derive(Debug, Clone)]
pub enum Applied {
    Patched(FieldName),
    Merged {
        source: FillKind,
        fields: Vec<FieldName>,
    },
    Appended(ChatMessage),
    TurnStarted(AssistantRequest),
    TurnEnded,
}

/// Single source of truth for one conversation.
///
/// Cloning is cheap and yields a handle to the same state.
#[derive(Clone)]
pub struct RecordStore {
    id: ConversationId,
    state: Arc<RwLock<ConversationState>>,
    events: Arc<EventBus>,
}

impl RecordStore {
    /// Create a store for a new session dated today.
    pub fn new(id: ConversationId, greeting: &str, events: Arc<EventBus>) -> Self {
        Self::with_state(
            id,
            ConversationState::new(Local::now().date_naive(), greeting),
            events,
        )
    }

    pub fn with_state(id: ConversationId, state: ConversationState, events: Arc<EventBus>) -> Self {
        Self {
            id,
            state: Arc::new(RwLock::new(state)),
            events,
        }
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// An immutable snapshot of the whole conversation.
    pub async fn read(&self) -> ConversationState {
        self.state.read().await.clone()
    }

    pub async fn is_pending(&self) -> bool {
        self.state.read().await.pending_request
    }

    /// Apply one command. This is the only path by which state changes.
    pub async fn dispatch(&self, command: StoreCommand) -> Result<Applied, Error> {
        debug!(conversation_id = %self.id, ?command, "Dispatching store command");
        let applied = match command {
            StoreCommand::PatchField { field, value } => {
                Applied::Patched(self.patch_field(&field, &value).await?)
            }
            StoreCommand::ReplaceFields { fields, source } => Applied::Merged {
                fields: self.merge_fields(&fields, source).await?,
                source,
            },
            StoreCommand::AppendMessage { sender, text } => {
                Applied::Appended(self.push_message(sender, text).await?)
            }
            StoreCommand::BeginTurn { text } => Applied::TurnStarted(self.start_turn(&text).await?),
            StoreCommand::EndTurn => {
                self.state.write().await.pending_request = false;
                Applied::TurnEnded
            }
        };
        Ok(applied)
    }

    /// Set one field; fails on an unknown field or out-of-domain value.
    pub async fn apply_field_patch(
        &self,
        field: &str,
        value: Value,
    ) -> Result<FieldName, RecordError> {
        self.patch_field(field, &value).await
    }

    /// Merge every supplied key into the record, or none of them.
    pub async fn apply_full_record(
        &self,
        fields: &ExtractionPayload,
    ) -> Result<Vec<FieldName>, RecordError> {
        self.merge_fields(fields, FillKind::Full).await
    }

    /// Append to the transcript. Blank user messages are refused.
    pub async fn append_message(
        &self,
        sender: Sender,
        text: impl Into<String>,
    ) -> Result<ChatMessage, MessageError> {
        self.push_message(sender, text.into()).await
    }

    /// Open a turn: append the trimmed user text and set the pending flag.
    ///
    /// Returns the request to send, built from the transcript as it stands
    /// right after the append.
    pub async fn begin_turn(&self, text: &str) -> Result<AssistantRequest, Error> {
        self.start_turn(text).await
    }

    pub async fn end_turn(&self) {
        self.state.write().await.pending_request = false;
    }

    pub(crate) async fn merge_fields(
        &self,
        fields: &ExtractionPayload,
        source: FillKind,
    ) -> Result<Vec<FieldName>, RecordError> {
        // Validate everything before taking the lock so a bad key changes nothing
        let updates = fields.validate()?;
        let mut names: Vec<FieldName> = updates.iter().map(FieldUpdate::field).collect();
        names.sort();
        names.dedup();

        {
            let mut state = self.state.write().await;
            for update in updates {
                state.record.apply(update);
            }
            state.last_fill_source = source.into();
        }

        match source {
            FillKind::Full => self.events.publish(DomainEvent::RecordFilled {
                conversation_id: self.id.to_string(),
                fields: names.clone(),
                timestamp: Utc::now(),
            }),
            FillKind::Patch => {
                for field in &names {
                    self.publish_patch(*field);
                }
            }
        }
        Ok(names)
    }

    async fn patch_field(&self, field: &str, value: &Value) -> Result<FieldName, RecordError> {
        let update = FieldUpdate::parse(field, value)?;
        let name = update.field();
        {
            let mut state = self.state.write().await;
            state.record.apply(update);
            state.last_fill_source = FillSource::Patch;
        }
        self.publish_patch(name);
        Ok(name)
    }

    async fn push_message(&self, sender: Sender, text: String) -> Result<ChatMessage, MessageError> {
        if text.trim().is_empty() {
            if sender == Sender::User {
                return Err(MessageError::EmptyMessage);
            }
            debug!(conversation_id = %self.id, "Appending empty assistant placeholder");
        }
        let message = self.state.write().await.transcript.push(sender, text).clone();
        self.publish_append(&message);
        Ok(message)
    }

    async fn start_turn(&self, text: &str) -> Result<AssistantRequest, Error> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(MessageError::EmptyMessage.into());
        }

        let (message, request) = {
            let mut state = self.state.write().await;
            if state.pending_request {
                return Err(Error::TurnInProgress {
                    conversation_id: self.id.to_string(),
                });
            }
            let message = state.transcript.push(Sender::User, trimmed).clone();
            state.pending_request = true;
            let request = AssistantRequest::new(trimmed, state.transcript.iter());
            (message, request)
        };

        self.publish_append(&message);
        Ok(request)
    }

    fn publish_patch(&self, field: FieldName) {
        self.events.publish(DomainEvent::FieldPatched {
            conversation_id: self.id.to_string(),
            field,
            timestamp: Utc::now(),
        });
    }

    fn publish_append(&self, message: &ChatMessage) {
        self.events.publish(DomainEvent::MessageAppended {
            conversation_id: self.id.to_string(),
            sender: message.sender,
            position: message.position,
            timestamp: Utc::now(),
        });
    }
}
