//! # hcplog Core
//!
//! Domain types, traits, and error definitions for the hcplog visit logger.
//! This crate defines the model every other crate implements against: the
//! interaction record, the chat transcript, extraction payloads and the
//! assistant collaborator trait.

pub mod assistant;
pub mod error;
pub mod event;
pub mod extraction;
pub mod message;
pub mod record;

// Re-export key types at crate root for ergonomics
pub use assistant::{Assistant, AssistantRequest, AssistantResponse, TranscriptEntry};
pub use error::{CollaboratorError, Error, MessageError, RecordError, Result};
pub use event::{DomainEvent, EventBus};
pub use extraction::{ExtractionPayload, FillKind, FillSource};
pub use message::{ChatMessage, ConversationId, Sender, Transcript};
pub use record::{FieldName, FieldUpdate, InteractionRecord, InteractionType, Sentiment};
