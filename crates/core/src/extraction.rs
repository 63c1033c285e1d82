//! Extraction payloads — structured field data the assistant derived from chat.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RecordError;
use crate::record::{FieldName, FieldUpdate};

/// What kind of form fill a payload represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillKind {
    /// A targeted single-field correction
    Patch,
    /// A record drafted from scratch
    Full,
}

/// Which kind of fill last changed the record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillSource {
    #[default]
    None,
    Patch,
    Full,
}

impl From<FillKind> for FillSource {
    fn from(kind: FillKind) -> Self {
        match kind {
            FillKind::Patch => FillSource::Patch,
            FillKind::Full => FillSource::Full,
        }
    }
}

/// A mapping from record field names to new values.
///
/// On the wire this is a plain JSON object. The optional `kind` tag is set
/// by collaborators that know whether they meant a correction or a fresh
/// record; it is never serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionPayload {
    pub fields: BTreeMap<String, Value>,

    #[serde(skip)]
    pub kind: Option<FillKind>,
}

impl ExtractionPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Tag the payload with the collaborator's intent.
    pub fn tagged(mut self, kind: FillKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate every entry. The first invalid entry fails the whole payload.
    ///
    /// Two keys that spell the same field (`hcpName` and `hcp_name`) are
    /// rejected rather than letting one silently win.
    pub fn validate(&self) -> Result<Vec<FieldUpdate>, RecordError> {
        let mut seen: BTreeMap<FieldName, &str> = BTreeMap::new();
        let mut updates = Vec::with_capacity(self.fields.len());

        for (name, value) in &self.fields {
            let update = FieldUpdate::parse(name, value)?;
            if let Some(first) = seen.insert(update.field(), name) {
                return Err(RecordError::InvalidValue {
                    field: update.field().to_string(),
                    reason: format!("given twice, as '{first}' and '{name}'"),
                });
            }
            updates.push(update);
        }
        Ok(updates)
    }
}
