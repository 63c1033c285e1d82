//! `hcplog chat` — Interactive or single-message logging session.

use std::io::Write;
use std::sync::Arc;

use hcplog_agent::{ConversationController, SessionRegistry, TurnOutcome};
use hcplog_config::AppConfig;
use hcplog_core::event::EventBus;
use hcplog_store::{MergeOutcome, StoreCommand};
use serde_json::Value;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::view::{self, HELP, Input};

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if config.assistant.kind == "openai" && !config.assistant.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: assistant.kind is \"openai\" but no API key is configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    HCPLOG_API_KEY = '...'   (generic)");
        eprintln!("    GROQ_API_KEY   = 'gsk_...'");
        eprintln!("    OPENAI_API_KEY = 'sk-...'");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let assistant = hcplog_providers::build_from_config(&config.assistant)
        .map_err(|e| format!("Failed to build assistant: {e}"))?;
    let events = Arc::new(EventBus::default());
    let registry = SessionRegistry::from_config(&config, assistant.clone(), events);
    let session = registry.open().await;

    if let Some(msg) = message {
        // Single message mode
        let seen = session.snapshot().await.transcript.len();
        eprint!("  Thinking...");
        let outcome = session.send(&msg).await?;
        eprint!("\r              \r");

        let state = session.snapshot().await;
        println!("{}", view::render_new_messages(&state, seen));
        report_merge(&outcome);
        println!();
        print!("{}", view::render_form(&state.record));
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        hcplog — Log an HCP Interaction        ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Assistant: {} ({})", assistant.name(), config.assistant.kind);
    println!("  Session:   {}", session.store().id());
    println!();
    println!("  Describe your visit and the form fills itself in.");
    println!("  Type /help for commands, 'exit' or Ctrl+C to quit.");
    println!();

    let state = session.snapshot().await;
    for message in state.transcript.iter() {
        println!("{}", view::render_message(message));
    }
    println!();

    let mut lines = stdin_lines();
    prompt()?;

    while let Some(line) = lines.recv().await {
        match Input::parse(&line) {
            Input::Exit => break,
            Input::Help => println!("{HELP}"),
            Input::Form => print!("{}", view::render_form(&session.snapshot().await.record)),
            Input::Set { field, value } => {
                edit_field(&session, field, Value::String(value)).await;
            }
            Input::Clear { field } => edit_field(&session, field, Value::Null).await,
            Input::Message(text) => chat_turn(&session, &text).await,
        }
        println!();
        prompt()?;
    }

    registry.close(session.store().id()).await;
    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}

async fn chat_turn(session: &ConversationController, text: &str) {
    let seen = session.snapshot().await.transcript.len();

    eprint!("  ...");
    let result = session.send(text).await;
    eprint!("\r     \r");

    match result {
        Ok(TurnOutcome::Skipped) => {}
        Ok(outcome) => {
            let state = session.snapshot().await;
            println!();
            println!("{}", view::render_new_messages(&state, seen));
            if report_merge(&outcome) {
                println!();
                print!("{}", view::render_form(&state.record));
            }
        }
        Err(e) => eprintln!("  [Error] {e}"),
    }
}

/// Apply a direct form edit through the store.
async fn edit_field(session: &ConversationController, field: String, value: Value) {
    match session
        .store()
        .dispatch(StoreCommand::PatchField { field, value })
        .await
    {
        Ok(_) => print!("{}", view::render_form(&session.snapshot().await.record)),
        Err(e) => eprintln!("  [Error] {e}"),
    }
}

/// Print what the extraction did. Returns whether the form changed.
fn report_merge(outcome: &TurnOutcome) -> bool {
    match outcome {
        TurnOutcome::Replied {
            merge: MergeOutcome::Applied { fields, .. },
            ..
        } => {
            let names: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
            println!("  [Form updated: {}]", names.join(", "));
            true
        }
        TurnOutcome::Replied {
            merge: MergeOutcome::Rejected(e),
            ..
        } => {
            println!("  [Form not updated: {e}]");
            false
        }
        TurnOutcome::Failed { error } => {
            eprintln!("  [Assistant error] {error}");
            false
        }
        _ => false,
    }
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

/// Non-empty stdin lines until EOF.
fn stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        let mut lines = BufReader::new(io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    if tx.send(line).await.is_err() {
                        break; // Receiver dropped
                    }
                }
                Ok(None) => break, // EOF (Ctrl+D)
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read stdin");
                    break;
                }
            }
        }
    });

    rx
}
