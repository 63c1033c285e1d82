//! Extraction merge policy — classify an assistant payload and route it.
//!
//! The rule is the key count: one key is a targeted correction ("change the
//! date to Friday"), two or more keys are a freshly drafted record. The
//! policy never looks at which field was named.
//!
//! Collaborators may tag a payload with their intent. Tags are ignored unless
//! the policy is built with [`MergePolicy::honoring_tags`].

use chrono::Utc;
use hcplog_core::error::RecordError;
use hcplog_core::event::DomainEvent;
use hcplog_core::extraction::{ExtractionPayload, FillKind};
use hcplog_core::record::FieldName;
use tracing::{debug, warn};

use crate::store::RecordStore;

/// What happened to an extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Empty or absent payload
    NoChange,
    /// The record was updated
    Applied { kind: FillKind, fields: Vec<FieldName> },
    /// The payload was refused as a whole; the record is untouched
    Rejected(RecordError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MergePolicy {
    honor_tags: bool,
}

impl MergePolicy {
    /// Key-count classification only.
    pub fn new() -> Self {
        Self { honor_tags: false }
    }

    /// Prefer a collaborator's explicit tag over the key count.
    pub fn honoring_tags() -> Self {
        Self { honor_tags: true }
    }

    /// Decide patch vs full. `None` means there is nothing to apply.
    pub fn classify(&self, payload: &ExtractionPayload) -> Option<FillKind> {
        if payload.is_empty() {
            return None;
        }
        if self.honor_tags {
            if let Some(kind) = payload.kind {
                return Some(kind);
            }
        }
        if payload.len() == 1 {
            Some(FillKind::Patch)
        } else {
            Some(FillKind::Full)
        }
    }

    /// Route a payload into the store.
    ///
    /// Failures are reported through the outcome and the event bus; they are
    /// never propagated, so the caller's turn always continues.
    pub async fn apply(
        &self,
        store: &RecordStore,
        payload: &ExtractionPayload,
    ) -> MergeOutcome {
        let Some(kind) = self.classify(payload) else {
            return MergeOutcome::NoChange;
        };

        let result = match (kind, payload.fields.iter().next()) {
            (FillKind::Patch, Some((field, value))) if payload.len() == 1 => store
                .apply_field_patch(field, value.clone())
                .await
                .map(|name| vec![name]),
            (FillKind::Patch, _) => store.merge_fields(payload, FillKind::Patch).await,
            (FillKind::Full, _) => store.apply_full_record(payload).await,
        };

        match result {
            Ok(fields) => {
                debug!(
                    conversation_id = %store.id(),
                    ?kind,
                    fields = fields.len(),
                    "Merged extraction into record"
                );
                MergeOutcome::Applied { kind, fields }
            }
            Err(e) => {
                warn!(conversation_id = %store.id(), error = %e, "Rejected extraction");
                store.events().publish(DomainEvent::MergeRejected {
                    conversation_id: store.id().to_string(),
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                MergeOutcome::Rejected(e)
            }
        }
    }
}
