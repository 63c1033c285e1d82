//! Shared test helpers for controller and registry tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use hcplog_core::assistant::{Assistant, AssistantRequest, AssistantResponse};
use hcplog_core::error::CollaboratorError;
use hcplog_core::event::EventBus;
use hcplog_core::extraction::ExtractionPayload;
use hcplog_core::message::ConversationId;
use hcplog_store::{ConversationState, RecordStore};
use tokio::sync::Notify;

/// One scripted assistant answer.
pub enum Step {
    Reply(AssistantResponse),
    Fail(CollaboratorError),
}

impl Step {
    pub fn reply(text: &str) -> Self {
        Step::Reply(AssistantResponse::text(text))
    }

    pub fn extract(text: &str, payload: ExtractionPayload) -> Self {
        Step::Reply(AssistantResponse::with_extraction(text, payload))
    }

    pub fn fail(error: CollaboratorError) -> Self {
        Step::Fail(error)
    }
}

/// An assistant that plays back a sequence of scripted steps.
///
/// Panics when called more often than it has steps. `hold()` makes calls
/// wait until `release()`.
pub struct ScriptedAssistant {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<AssistantRequest>>,
    held: AtomicBool,
    called: Notify,
    gate: Notify,
}

impl ScriptedAssistant {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
            held: AtomicBool::new(false),
            called: Notify::new(),
            gate: Notify::new(),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<AssistantRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.gate.notify_one();
    }

    pub async fn wait_until_called(&self) {
        self.called.notified().await;
    }
}

#[async_trait::async_trait]
impl Assistant for ScriptedAssistant {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn respond(
        &self,
        request: AssistantRequest,
    ) -> Result<AssistantResponse, CollaboratorError> {
        self.requests.lock().unwrap().push(request);
        self.called.notify_one();

        if self.held.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(response)) => Ok(response),
            Some(Step::Fail(error)) => Err(error),
            None => panic!("ScriptedAssistant: no more steps"),
        }
    }
}

/// A store dated 2024-03-14 with its own event bus.
pub fn store() -> RecordStore {
    let today = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
    RecordStore::with_state(
        ConversationId::new(),
        ConversationState::new(today, "Hi! Tell me about your visit."),
        Arc::new(EventBus::default()),
    )
}
