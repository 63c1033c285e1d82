//! The conversation controller — drives one chat turn at a time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use hcplog_core::assistant::{Assistant, AssistantRequest, AssistantResponse};
use hcplog_core::error::{CollaboratorError, Error, MessageError};
use hcplog_core::event::DomainEvent;
use hcplog_core::message::Sender;
use hcplog_store::{ConversationState, MergeOutcome, MergePolicy, RecordStore};
use tokio::task::JoinError;
use tracing::{debug, info, warn};

/// Default apology appended when the assistant cannot answer.
pub const DEFAULT_FAILURE_MESSAGE: &str =
    "Sorry, I couldn't reach the assistant. Please try again.";

/// How a turn ended.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// Blank input; nothing was sent and nothing changed
    Skipped,

    /// The assistant answered; its reply is in the transcript
    Replied { reply: String, merge: MergeOutcome },

    /// The assistant failed; the apology is in the transcript, the record is untouched
    Failed { error: CollaboratorError },
}

/// The only component that talks to the assistant for a conversation.
///
/// A turn goes `Idle → AwaitingReply → Idle`. While a request is pending,
/// further sends are refused with [`Error::TurnInProgress`].
pub struct ConversationController {
    store: RecordStore,
    assistant: Arc<dyn Assistant>,
    policy: MergePolicy,
    failure_message: String,
    timeout: Option<Duration>,
}

impl ConversationController {
    pub fn new(store: RecordStore, assistant: Arc<dyn Assistant>) -> Self {
        Self {
            store,
            assistant,
            policy: MergePolicy::new(),
            failure_message: DEFAULT_FAILURE_MESSAGE.into(),
            timeout: None,
        }
    }

    /// Set the extraction merge policy.
    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the apology appended on assistant failure.
    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = message.into();
        self
    }

    /// Give up on the assistant after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Read-only snapshot for views.
    pub async fn snapshot(&self) -> ConversationState {
        self.store.read().await
    }

    /// Run one turn for `text`.
    ///
    /// Once the request is issued the turn runs on its own task, so dropping
    /// this future does not leave the conversation stuck half-way: the reply
    /// (or apology) is still appended and the pending flag still cleared.
    pub async fn send(&self, text: &str) -> Result<TurnOutcome, Error> {
        let request = match self.store.begin_turn(text).await {
            Ok(request) => request,
            Err(Error::Message(MessageError::EmptyMessage)) => {
                debug!(conversation_id = %self.store.id(), "Ignoring blank message");
                return Ok(TurnOutcome::Skipped);
            }
            Err(e) => return Err(e),
        };

        info!(
            conversation_id = %self.store.id(),
            assistant = self.assistant.name(),
            messages = request.transcript.len(),
            "Starting turn"
        );
        self.store.events().publish(DomainEvent::TurnStarted {
            conversation_id: self.store.id().to_string(),
            timestamp: Utc::now(),
        });

        let turn = Turn {
            store: self.store.clone(),
            assistant: self.assistant.clone(),
            policy: self.policy,
            failure_message: self.failure_message.clone(),
            timeout: self.timeout,
        };

        tokio::spawn(turn.run(request))
            .await
            .map_err(|e| Error::Internal(format!("turn task failed: {e}")))
    }
}

/// Everything a detached turn needs.
struct Turn {
    store: RecordStore,
    assistant: Arc<dyn Assistant>,
    policy: MergePolicy,
    failure_message: String,
    timeout: Option<Duration>,
}

impl Turn {
    async fn run(self, request: AssistantRequest) -> TurnOutcome {
        let started = Instant::now();
        let result = self.call(request).await;

        let outcome = match result {
            Ok(response) => self.settle_reply(response).await,
            Err(error) => {
                warn!(
                    conversation_id = %self.store.id(),
                    error = %error,
                    "Assistant failed, appending apology"
                );
                self.append_assistant(self.failure_message.clone()).await;
                TurnOutcome::Failed { error }
            }
        };

        self.store.end_turn().await;

        let success = matches!(outcome, TurnOutcome::Replied { .. });
        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            conversation_id = %self.store.id(),
            success,
            duration_ms,
            "Turn settled"
        );
        self.store.events().publish(DomainEvent::TurnSettled {
            conversation_id: self.store.id().to_string(),
            success,
            duration_ms,
            timestamp: Utc::now(),
        });

        outcome
    }

    /// Call the assistant on its own task so a panic surfaces as a failure.
    async fn call(&self, request: AssistantRequest) -> Result<AssistantResponse, CollaboratorError> {
        let assistant = self.assistant.clone();
        let mut call = tokio::spawn(async move { assistant.respond(request).await });

        let Some(limit) = self.timeout else {
            return flatten(call.await);
        };

        match tokio::time::timeout(limit, &mut call).await {
            Ok(joined) => flatten(joined),
            Err(_) => {
                call.abort();
                Err(CollaboratorError::Timeout { timeout: limit })
            }
        }
    }

    async fn settle_reply(&self, response: AssistantResponse) -> TurnOutcome {
        self.append_assistant(response.reply.clone()).await;

        let merge = match &response.extraction {
            Some(payload) => self.policy.apply(&self.store, payload).await,
            None => MergeOutcome::NoChange,
        };

        TurnOutcome::Replied {
            reply: response.reply,
            merge,
        }
    }

    async fn append_assistant(&self, text: String) {
        // Assistant messages are never refused, empty ones included
        if let Err(e) = self.store.append_message(Sender::Assistant, text).await {
            warn!(conversation_id = %self.store.id(), error = %e, "Could not append assistant message");
        }
    }
}

fn flatten(
    joined: Result<Result<AssistantResponse, CollaboratorError>, JoinError>,
) -> Result<AssistantResponse, CollaboratorError> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(CollaboratorError::Panicked(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedAssistant, Step, store};
    use hcplog_core::error::RecordError;
    use hcplog_core::extraction::{ExtractionPayload, FillKind, FillSource};
    use hcplog_core::record::{FieldName, Sentiment};

    fn controller(steps: Vec<Step>) -> (ConversationController, Arc<ScriptedAssistant>) {
        let assistant = Arc::new(ScriptedAssistant::new(steps));
        (ConversationController::new(store(), assistant.clone()), assistant)
    }

    #[tokio::test]
    async fn blank_input_is_a_no_op() {
        let (controller, assistant) = controller(vec![]);
        let before = controller.snapshot().await;

        let outcome = controller.send("   \t").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Skipped));
        assert_eq!(controller.snapshot().await, before);
        assert_eq!(assistant.calls(), 0);
    }

    #[tokio::test]
    async fn successful_turn_appends_user_then_reply() {
        let (controller, assistant) = controller(vec![Step::reply("Noted!")]);
        let before = controller.snapshot().await.transcript.len();

        let outcome = controller.send("  Had a quick call  ").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Replied { ref reply, merge: MergeOutcome::NoChange } if reply == "Noted!"));

        let state = controller.snapshot().await;
        assert_eq!(state.transcript.len(), before + 2);
        let last_two = &state.transcript.messages()[before..];
        assert_eq!(last_two[0].sender, Sender::User);
        assert_eq!(last_two[0].text, "Had a quick call");
        assert_eq!(last_two[1].sender, Sender::Assistant);
        assert_eq!(last_two[1].text, "Noted!");
        assert!(!state.pending_request);

        // The assistant saw the user's message as the last transcript entry
        let seen = assistant.requests();
        assert_eq!(seen[0].latest_message, "Had a quick call");
        assert_eq!(seen[0].transcript.last().unwrap().text, "Had a quick call");
    }

    #[tokio::test]
    async fn failed_turn_appends_apology_and_keeps_record() {
        let (controller, _) = controller(vec![Step::fail(CollaboratorError::Network(
            "connection refused".into(),
        ))]);
        let controller = controller.with_failure_message("Assistant unavailable.");
        let before = controller.snapshot().await;

        let outcome = controller.send("Met Dr. Smith").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Failed { error: CollaboratorError::Network(_) }));

        let state = controller.snapshot().await;
        assert_eq!(state.transcript.len(), before.transcript.len() + 2);
        assert_eq!(state.transcript.last().unwrap().text, "Assistant unavailable.");
        assert_eq!(state.transcript.last().unwrap().sender, Sender::Assistant);
        assert_eq!(state.record, before.record);
        assert!(!state.pending_request);
    }

    #[tokio::test]
    async fn extraction_fills_the_form() {
        let payload = ExtractionPayload::new()
            .with("hcpName", "Dr. Smith")
            .with("topics", "CardioFix")
            .with("sentiment", "Positive");
        let (controller, _) = controller(vec![Step::extract("Logged your meeting.", payload)]);

        let outcome = controller.send("I met Dr. Smith about CardioFix, went well").await.unwrap();
        assert!(matches!(
            outcome,
            TurnOutcome::Replied { merge: MergeOutcome::Applied { kind: FillKind::Full, .. }, .. }
        ));

        let state = controller.snapshot().await;
        assert_eq!(state.record.hcp_name.as_deref(), Some("Dr. Smith"));
        assert_eq!(state.record.sentiment, Sentiment::Positive);
        assert_eq!(state.last_fill_source, FillSource::Full);
    }

    #[tokio::test]
    async fn correction_patches_one_field() {
        let (controller, _) = controller(vec![
            Step::extract(
                "Logged.",
                ExtractionPayload::new()
                    .with("hcpName", "Dr. Smith")
                    .with("outcomes", "Samples requested"),
            ),
            Step::extract(
                "Changed the date.",
                ExtractionPayload::new().with("date", "2024-03-15"),
            ),
        ]);

        controller.send("Met Dr. Smith, she wants samples").await.unwrap();
        let after_fill = controller.snapshot().await.record;

        let outcome = controller.send("change the date to Friday").await.unwrap();
        assert!(matches!(
            outcome,
            TurnOutcome::Replied { merge: MergeOutcome::Applied { kind: FillKind::Patch, ref fields }, .. }
                if fields == &vec![FieldName::Date]
        ));

        let state = controller.snapshot().await;
        assert_eq!(state.record.date, chrono::NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(state.record.hcp_name, after_fill.hcp_name);
        assert_eq!(state.record.outcomes, after_fill.outcomes);
        assert_eq!(state.last_fill_source, FillSource::Patch);
    }

    #[tokio::test]
    async fn invalid_extraction_still_shows_reply() {
        let payload = ExtractionPayload::new()
            .with("hcpName", "Dr. Smith")
            .with("budget", "high");
        let (controller, _) = controller(vec![Step::extract("Got it!", payload)]);
        let before = controller.snapshot().await;

        let outcome = controller.send("Met Dr. Smith").await.unwrap();
        assert!(matches!(
            outcome,
            TurnOutcome::Replied { merge: MergeOutcome::Rejected(RecordError::InvalidField(_)), .. }
        ));

        let state = controller.snapshot().await;
        assert_eq!(state.record, before.record);
        assert_eq!(state.transcript.last().unwrap().text, "Got it!");
        assert_eq!(state.transcript.len(), before.transcript.len() + 2);
    }

    #[tokio::test]
    async fn overlapping_send_is_refused() {
        let (controller, assistant) = controller(vec![Step::reply("first")]);
        let controller = Arc::new(controller);
        assistant.hold();

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.send("first").await })
        };
        assistant.wait_until_called().await;

        let err = controller.send("second").await.unwrap_err();
        assert!(matches!(err, Error::TurnInProgress { .. }));
        // Only the first user message made it into the transcript
        let state = controller.snapshot().await;
        assert!(state.pending_request);
        assert!(state.transcript.iter().all(|m| m.text != "second"));

        assistant.release();
        first.await.unwrap().unwrap();
        assert!(!controller.snapshot().await.pending_request);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_counts_as_failure() {
        let (controller, assistant) = controller(vec![Step::reply("too late")]);
        let controller = controller.with_timeout(Duration::from_secs(5));
        assistant.hold();

        let outcome = controller.send("hello?").await.unwrap();
        assert!(matches!(
            outcome,
            TurnOutcome::Failed { error: CollaboratorError::Timeout { timeout } }
                if timeout == Duration::from_secs(5)
        ));
        let state = controller.snapshot().await;
        assert!(!state.pending_request);
        assert_eq!(state.transcript.last().unwrap().text, DEFAULT_FAILURE_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn sub_second_timeout_keeps_its_length() {
        let (controller, assistant) = controller(vec![Step::reply("too late")]);
        let controller = controller.with_timeout(Duration::from_millis(300));
        assistant.hold();

        let outcome = controller.send("hello?").await.unwrap();
        let TurnOutcome::Failed { error } = &outcome else {
            panic!("expected a failed turn, got {outcome:?}");
        };
        assert!(matches!(error, CollaboratorError::Timeout { timeout } if timeout.as_millis() == 300));
        assert!(error.to_string().contains("300ms"));
    }

    #[tokio::test]
    async fn panicking_assistant_counts_as_failure() {
        let (controller, _) = controller(vec![]);

        // No scripted steps left: the assistant panics
        let outcome = controller.send("hello").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Failed { error: CollaboratorError::Panicked(_) }));
        assert!(!controller.snapshot().await.pending_request);
    }

    #[tokio::test]
    async fn dropped_send_still_completes_the_turn() {
        let (controller, assistant) = controller(vec![Step::reply("still here")]);
        let controller = Arc::new(controller);
        assistant.hold();

        let pending = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.send("are you there?").await })
        };
        assistant.wait_until_called().await;
        pending.abort();

        let mut events = controller.store().events().subscribe();
        assistant.release();
        // Wait for the detached turn to settle
        while controller.snapshot().await.pending_request {
            let _ = events.recv().await;
        }

        let state = controller.snapshot().await;
        assert_eq!(state.transcript.last().unwrap().text, "still here");
    }

    #[tokio::test]
    async fn turn_events_are_published() {
        let (controller, _) = controller(vec![Step::reply("ok")]);
        let mut rx = controller.store().events().subscribe();

        controller.send("hi").await.unwrap();

        let mut saw_started = false;
        let mut saw_settled = false;
        while let Ok(event) = rx.try_recv() {
            match event.as_ref() {
                DomainEvent::TurnStarted { .. } => saw_started = true,
                DomainEvent::TurnSettled { success, .. } => saw_settled = *success,
                _ => {}
            }
        }
        assert!(saw_started && saw_settled);
    }
}
