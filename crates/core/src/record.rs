//! The interaction record — the structured form a field rep fills in.
//!
//! All fields are optional and may change at any time. Values coming from
//! the assistant are untyped JSON; they are validated into a [`FieldUpdate`]
//! before anything touches the record, so applying an update can never fail
//! halfway.

use chrono::{Local, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RecordError;

/// Every attribute of an [`InteractionRecord`] that may be addressed by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldName {
    HcpName,
    InteractionType,
    Date,
    Time,
    Topics,
    Sentiment,
    Outcomes,
    FollowUp,
}

impl FieldName {
    pub const ALL: [FieldName; 8] = [
        FieldName::HcpName,
        FieldName::InteractionType,
        FieldName::Date,
        FieldName::Time,
        FieldName::Topics,
        FieldName::Sentiment,
        FieldName::Outcomes,
        FieldName::FollowUp,
    ];

    /// Canonical (camelCase) name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::HcpName => "hcpName",
            FieldName::InteractionType => "interactionType",
            FieldName::Date => "date",
            FieldName::Time => "time",
            FieldName::Topics => "topics",
            FieldName::Sentiment => "sentiment",
            FieldName::Outcomes => "outcomes",
            FieldName::FollowUp => "followUp",
        }
    }

    /// Resolve a field name as an assistant may spell it.
    ///
    /// Accepts the canonical camelCase names, their snake_case forms and the
    /// longer names used by the CRM backend (`interaction_date`,
    /// `topics_discussed`, `follow_up_actions`).
    pub fn parse(name: &str) -> Result<Self, RecordError> {
        let field = match name.trim() {
            "hcpName" | "hcp_name" => FieldName::HcpName,
            "interactionType" | "interaction_type" => FieldName::InteractionType,
            "date" | "interactionDate" | "interaction_date" => FieldName::Date,
            "time" | "interactionTime" | "interaction_time" => FieldName::Time,
            "topics" | "topicsDiscussed" | "topics_discussed" => FieldName::Topics,
            "sentiment" => FieldName::Sentiment,
            "outcomes" => FieldName::Outcomes,
            "followUp" | "follow_up" | "followUpActions" | "follow_up_actions" => {
                FieldName::FollowUp
            }
            other => return Err(RecordError::InvalidField(other.to_string())),
        };
        Ok(field)
    }
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the rep met the HCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionType {
    Meeting,
    Call,
    Email,
    Conference,
}

impl InteractionType {
    pub const ALL: [InteractionType; 4] = [
        InteractionType::Meeting,
        InteractionType::Call,
        InteractionType::Email,
        InteractionType::Conference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::Meeting => "Meeting",
            InteractionType::Call => "Call",
            InteractionType::Email => "Email",
            InteractionType::Conference => "Conference",
        }
    }

    /// Case-insensitive lookup.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

/// The HCP's observed attitude during the interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        }
    }

    /// Case-insensitive lookup.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

/// The canonical record being built during a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    #[serde(default)]
    pub hcp_name: Option<String>,

    #[serde(default)]
    pub interaction_type: Option<InteractionType>,

    #[serde(default)]
    pub date: Option<NaiveDate>,

    #[serde(default)]
    pub time: Option<NaiveTime>,

    #[serde(default)]
    pub topics: Option<String>,

    #[serde(default)]
    pub sentiment: Sentiment,

    #[serde(default)]
    pub outcomes: Option<String>,

    #[serde(default)]
    pub follow_up: Option<String>,
}

impl InteractionRecord {
    /// A blank record dated `today`. Interaction type starts as a meeting.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            hcp_name: None,
            interaction_type: Some(InteractionType::Meeting),
            date: Some(today),
            time: None,
            topics: None,
            sentiment: Sentiment::Neutral,
            outcomes: None,
            follow_up: None,
        }
    }

    /// Apply a validated update. Cannot fail.
    pub fn apply(&mut self, update: FieldUpdate) {
        match update {
            FieldUpdate::HcpName(v) => self.hcp_name = v,
            FieldUpdate::InteractionType(v) => self.interaction_type = v,
            FieldUpdate::Date(v) => self.date = v,
            FieldUpdate::Time(v) => self.time = v,
            FieldUpdate::Topics(v) => self.topics = v,
            FieldUpdate::Sentiment(v) => self.sentiment = v,
            FieldUpdate::Outcomes(v) => self.outcomes = v,
            FieldUpdate::FollowUp(v) => self.follow_up = v,
        }
    }

    /// Render a field for display; empty fields render as `None`.
    pub fn display_value(&self, field: FieldName) -> Option<String> {
        match field {
            FieldName::HcpName => self.hcp_name.clone(),
            FieldName::InteractionType => self.interaction_type.map(|t| t.as_str().to_string()),
            FieldName::Date => self.date.map(|d| d.format("%Y-%m-%d").to_string()),
            FieldName::Time => self.time.map(|t| {
                // Seconds only when the rep gave them
                let pattern = if t.second() == 0 { "%H:%M" } else { "%H:%M:%S" };
                t.format(pattern).to_string()
            }),
            FieldName::Topics => self.topics.clone(),
            FieldName::Sentiment => Some(self.sentiment.as_str().to_string()),
            FieldName::Outcomes => self.outcomes.clone(),
            FieldName::FollowUp => self.follow_up.clone(),
        }
    }
}

impl Default for InteractionRecord {
    fn default() -> Self {
        Self::new(Local::now().date_naive())
    }
}

/// A single field change that has already passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    HcpName(Option<String>),
    InteractionType(Option<InteractionType>),
    Date(Option<NaiveDate>),
    Time(Option<NaiveTime>),
    Topics(Option<String>),
    Sentiment(Sentiment),
    Outcomes(Option<String>),
    FollowUp(Option<String>),
}

impl FieldUpdate {
    /// Validate a raw `(name, value)` pair from an extraction.
    ///
    /// `null` clears an optional field. Sentiment is never empty, so `null`
    /// is rejected there like any other out-of-domain value.
    pub fn parse(name: &str, value: &Value) -> Result<Self, RecordError> {
        let field = FieldName::parse(name)?;
        Self::for_field(field, value)
    }

    pub fn for_field(field: FieldName, value: &Value) -> Result<Self, RecordError> {
        let text = text_value(field, value)?;
        let update = match field {
            FieldName::HcpName => FieldUpdate::HcpName(text),
            FieldName::Topics => FieldUpdate::Topics(text),
            FieldName::Outcomes => FieldUpdate::Outcomes(text),
            FieldName::FollowUp => FieldUpdate::FollowUp(text),
            FieldName::InteractionType => match text {
                None => FieldUpdate::InteractionType(None),
                Some(raw) => match InteractionType::parse(&raw) {
                    Some(t) => FieldUpdate::InteractionType(Some(t)),
                    None => {
                        return Err(enum_error(
                            field,
                            raw,
                            InteractionType::ALL.iter().map(|t| t.as_str()),
                        ));
                    }
                },
            },
            FieldName::Sentiment => {
                let raw = text.unwrap_or_else(|| "null".into());
                match Sentiment::parse(&raw) {
                    Some(s) => FieldUpdate::Sentiment(s),
                    None => {
                        return Err(enum_error(
                            field,
                            raw,
                            Sentiment::ALL.iter().map(|s| s.as_str()),
                        ));
                    }
                }
            }
            FieldName::Date => match text {
                None => FieldUpdate::Date(None),
                Some(raw) => {
                    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
                        RecordError::InvalidValue {
                            field: field.to_string(),
                            reason: format!("'{raw}' is not a YYYY-MM-DD date ({e})"),
                        }
                    })?;
                    FieldUpdate::Date(Some(date))
                }
            },
            FieldName::Time => match text {
                None => FieldUpdate::Time(None),
                Some(raw) => {
                    let trimmed = raw.trim();
                    let time = NaiveTime::parse_from_str(trimmed, "%H:%M")
                        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
                        .map_err(|e| RecordError::InvalidValue {
                            field: field.to_string(),
                            reason: format!("'{raw}' is not an HH:MM time ({e})"),
                        })?;
                    FieldUpdate::Time(Some(time))
                }
            },
        };
        Ok(update)
    }

    pub fn field(&self) -> FieldName {
        match self {
            FieldUpdate::HcpName(_) => FieldName::HcpName,
            FieldUpdate::InteractionType(_) => FieldName::InteractionType,
            FieldUpdate::Date(_) => FieldName::Date,
            FieldUpdate::Time(_) => FieldName::Time,
            FieldUpdate::Topics(_) => FieldName::Topics,
            FieldUpdate::Sentiment(_) => FieldName::Sentiment,
            FieldUpdate::Outcomes(_) => FieldName::Outcomes,
            FieldUpdate::FollowUp(_) => FieldName::FollowUp,
        }
    }
}

fn text_value(field: FieldName, value: &Value) -> Result<Option<String>, RecordError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(RecordError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected a string, got {other}"),
        }),
    }
}

fn enum_error<'a>(
    field: FieldName,
    value: String,
    allowed: impl Iterator<Item = &'a str>,
) -> RecordError {
    RecordError::InvalidEnumValue {
        field: field.to_string(),
        value,
        allowed: allowed.collect::<Vec<_>>().join(", "),
    }
}
