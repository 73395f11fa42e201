//! One request/response cycle per user submission.
//!
//! `submit` walks `Idle → Sending → {Completed | DegradedCompleted | Failed} → Idle`.
//! Every branch appends exactly one assistant message, so the transcript always
//! advances by a user/assistant pair.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::message::Message;
use crate::session::ConversationStore;
use crate::transport::{ChatRequest, Transport, TransportError};

/// Reply used when the backend answered but gave no usable `answer` field
pub const PARSE_FALLBACK: &str = "I had trouble parsing that response, but I'm here to help!";

/// Reply used when the backend could not be reached
pub const OFFLINE_FALLBACK: &str =
    "I'm offline right now, but you can still explore investment questions!";

/// Session error shown after a transport failure
pub const UNREACHABLE_ERROR: &str = "Unable to reach the backend. Showing an offline response.";

/// What the transport produced, classified for merging into the transcript
#[derive(Debug)]
pub enum ExchangeOutcome {
    /// Backend replied with a string `answer`
    Answered(String),
    /// Backend replied, but without a usable `answer`
    Malformed,
    /// No reply body at all
    TransportError(TransportError),
}

impl ExchangeOutcome {
    pub fn classify(result: Result<serde_json::Value, TransportError>) -> Self {
        match result {
            Ok(body) => match body.get("answer").and_then(|a| a.as_str()) {
                Some(answer) => ExchangeOutcome::Answered(answer.to_string()),
                None => ExchangeOutcome::Malformed,
            },
            Err(e) => ExchangeOutcome::TransportError(e),
        }
    }
}

/// Terminal state of one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStatus {
    Completed,
    DegradedCompleted,
    Failed,
}

/// Result of `submit`: which branch was taken and the assistant message it appended
#[derive(Debug, Clone)]
pub struct ExchangeReport {
    pub status: ExchangeStatus,
    pub reply: Message,
}

/// Drives exchanges against a shared transcript.
///
/// The controller does not serialize callers. Overlapping `submit`s each send
/// their own snapshot; replies land in completion order. `is_busy` stays true
/// until the last in-flight exchange finishes.
pub struct ExchangeController<T: Transport> {
    store: Arc<ConversationStore>,
    transport: T,
    in_flight: AtomicUsize,
    error: Mutex<Option<String>>,
}

impl<T: Transport> ExchangeController<T> {
    pub fn new(store: Arc<ConversationStore>, transport: T) -> Self {
        Self {
            store,
            transport,
            in_flight: AtomicUsize::new(0),
            error: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Session-level error from the most recent failed exchange
    pub fn error(&self) -> Option<String> {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Start a fresh session: seeded transcript, no error
    pub fn reset(&self) {
        let discarded = self.store.len();
        self.store.reset();
        self.set_error(None);
        tracing::info!(discarded, "session reset");
    }

    /// Run one exchange for `text`. The caller is expected to have trimmed and
    /// rejected empty input already.
    pub async fn submit(&self, text: impl Into<String>) -> ExchangeReport {
        let text = text.into();

        let user = Message::user(text.clone());
        let user_id = user.id().to_string();
        self.store.append(user);
        let history = self.store.snapshot();

        let _busy = BusyGuard::enter(&self.in_flight);
        self.set_error(None);

        tracing::info!(%user_id, chars = text.len(), history = history.len(), "sending exchange");
        let request = ChatRequest {
            message: text,
            history,
        };
        let outcome = ExchangeOutcome::classify(self.transport.send(&request).await);

        let (status, content) = match outcome {
            ExchangeOutcome::Answered(answer) => (ExchangeStatus::Completed, answer),
            ExchangeOutcome::Malformed => {
                tracing::debug!("response had no usable answer field");
                (ExchangeStatus::DegradedCompleted, PARSE_FALLBACK.to_string())
            }
            ExchangeOutcome::TransportError(e) => {
                tracing::warn!(error = %e, "exchange failed");
                self.set_error(Some(UNREACHABLE_ERROR.to_string()));
                (ExchangeStatus::Failed, OFFLINE_FALLBACK.to_string())
            }
        };

        let reply = Message::assistant(content);
        self.store.append(reply.clone());
        tracing::info!(%user_id, reply_id = reply.id(), ?status, "exchange finished");

        ExchangeReport { status, reply }
    }

    fn set_error(&self, error: Option<String>) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }
}

/// Counts an exchange as in flight for as long as it is held
struct BusyGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> BusyGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
