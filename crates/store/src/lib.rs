//! Conversation state for hcplog.
//!
//! The [`RecordStore`] is the single owner of one conversation's record,
//! transcript and turn flags. It is a small command handler: every change is
//! a [`StoreCommand`] applied under one exclusive lock, and readers only ever
//! see whole snapshots.
//!
//! The [`MergePolicy`] decides how an assistant's extraction is routed into
//! the store.

pub mod merge;
pub mod store;

pub use merge::{MergeOutcome, MergePolicy};
pub use store::{Applied, ConversationState, RecordStore, StoreCommand};
