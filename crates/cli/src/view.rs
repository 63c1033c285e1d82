//! Terminal rendering of the form and parsing of REPL input.

use hcplog_core::message::{ChatMessage, Sender};
use hcplog_core::record::{FieldName, InteractionRecord};
use hcplog_store::ConversationState;

/// What the rep typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Exit,
    Help,
    /// Print the current form
    Form,
    /// Edit one field directly, bypassing the assistant
    Set { field: String, value: String },
    /// Clear one field
    Clear { field: String },
    /// Anything else goes to the assistant
    Message(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line {
            "exit" | "quit" | "/exit" | "/quit" | ":q" => return Input::Exit,
            "/help" | "/?" => return Input::Help,
            "/form" => return Input::Form,
            _ => {}
        }

        let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        match command {
            // A command without its field is a usage mistake, not chat
            "/set" | "/clear" if rest.trim().is_empty() => Input::Help,
            "/set" => {
                let rest = rest.trim();
                let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                let field = field.to_string();
                match value.trim() {
                    "" => Input::Clear { field },
                    value => Input::Set {
                        field,
                        value: value.to_string(),
                    },
                }
            }
            "/clear" => Input::Clear {
                field: rest.trim().to_string(),
            },
            _ => Input::Message(line.to_string()),
        }
    }
}

pub const HELP: &str = "\
  Commands:
    /form                 Show the form
    /set <field> <value>  Edit a field directly (e.g. /set sentiment Positive)
                          With no value the field is emptied
    /clear <field>        Empty a field
    /help                 Show this help
    exit                  Quit";

fn label(field: FieldName) -> &'static str {
    match field {
        FieldName::HcpName => "HCP Name",
        FieldName::InteractionType => "Interaction Type",
        FieldName::Date => "Date",
        FieldName::Time => "Time",
        FieldName::Topics => "Topics Discussed",
        FieldName::Sentiment => "Sentiment",
        FieldName::Outcomes => "Outcomes",
        FieldName::FollowUp => "Follow-up Actions",
    }
}

/// The form as aligned `label: value` lines.
pub fn render_form(record: &InteractionRecord) -> String {
    let mut out = String::new();
    for field in FieldName::ALL {
        let value = record
            .display_value(field)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "(empty)".into());
        out.push_str(&format!("  {:<18} {}\n", format!("{}:", label(field)), value));
    }
    out
}

pub fn render_message(message: &ChatMessage) -> String {
    let who = match message.sender {
        Sender::User => "You",
        Sender::Assistant => "Assistant",
    };
    message
        .text
        .lines()
        .map(|line| format!("  {who} > {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Everything appended to the transcript after `seen` messages.
pub fn render_new_messages(state: &ConversationState, seen: usize) -> String {
    state.transcript.messages()[seen.min(state.transcript.len())..]
        .iter()
        .filter(|m| m.sender == Sender::Assistant)
        .map(render_message)
        .collect::<Vec<_>>()
        .join("\n")
}
