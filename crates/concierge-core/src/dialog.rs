//! Dialog session against the external dialog-management service.
//!
//! The session greets the user, then alternates between **Listening** (waiting for a
//! filtered utterance) and **Responding** (one request to the service, then speaking the
//! generated reply) until either side says goodbye or the robot says thank you.

use crate::actions::ActionPrimitives;
use crate::error::{ConciergeError, ConciergeResult};
use crate::perception::{Slot, Utterance};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Width of the marker the service wraps around generated text, on each side.
pub const RESPONSE_MARKER_LEN: usize = 5;

fn no_venue() -> i64 {
    -1
}

fn empty_belief() -> Value {
    Value::Array(Vec::new())
}

/// State exchanged with the dialog service every turn.
///
/// The core only reads `generated` and writes `user_utt_t`; everything else, including
/// fields this struct does not name, is passed back to the service unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogState {
    pub generated: String,
    #[serde(default)]
    pub venue_offered: Map<String, Value>,
    #[serde(default = "no_venue")]
    pub selected_venue: i64,
    #[serde(default = "empty_belief")]
    pub belief_t: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_utt_t: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DialogState {
    /// Fresh state for a new session.
    pub fn initial() -> Self {
        Self {
            generated: String::new(),
            venue_offered: Map::new(),
            selected_venue: no_venue(),
            belief_t: empty_belief(),
            user_utt_t: None,
            extra: Map::new(),
        }
    }

    /// Generated text without its start/end markers.
    ///
    /// Positional strip of [`RESPONSE_MARKER_LEN`] characters on both ends; nothing checks
    /// that the markers are actually there. Ten characters or fewer yield an empty string.
    pub fn response_text(&self) -> String {
        let chars: Vec<char> = self.generated.chars().collect();
        if chars.len() <= 2 * RESPONSE_MARKER_LEN {
            return String::new();
        }
        chars[RESPONSE_MARKER_LEN..chars.len() - RESPONSE_MARKER_LEN]
            .iter()
            .collect()
    }
}

impl Default for DialogState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Case- and space-insensitive substring test.
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    let normalize = |s: &str| -> String {
        s.chars()
            .filter(|c| *c != ' ')
            .flat_map(char::to_lowercase)
            .collect()
    };
    normalize(text).contains(&normalize(phrase))
}

/// True when the exchange should end after a turn with these two utterances.
pub fn is_farewell(user_utterance: &str, robot_response: &str) -> bool {
    contains_phrase(user_utterance, "goodbye")
        || contains_phrase(robot_response, "goodbye")
        || contains_phrase(robot_response, "thank you")
}

/// Remote dialog manager. One call per user turn.
#[async_trait]
pub trait DialogService: Send + Sync {
    /// Send the full state (with `user_utt_t` set) and return the service's next state.
    async fn respond(&self, request: &DialogState) -> ConciergeResult<DialogState>;
}

/// JSON-over-HTTP dialog service client. No retry, no authentication.
#[derive(Debug, Clone)]
pub struct HttpDialogService {
    url: String,
    client: reqwest::Client,
}

impl HttpDialogService {
    /// `timeout` bounds one request; `None` waits as long as the service takes.
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> ConciergeResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DialogService for HttpDialogService {
    async fn respond(&self, request: &DialogState) -> ConciergeResult<DialogState> {
        info!(target: "concierge::dialog", url = %self.url, "requesting dialog service");
        let res = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(ConciergeError::DialogService(format!(
                "dialog service returned {}: {}",
                status, body
            )));
        }
        info!(target: "concierge::dialog", "received dialog service response");

        serde_json::from_str(&body).map_err(|e| ConciergeError::MalformedResponse(e.to_string()))
    }
}

/// Phase of a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogPhase {
    Listening,
    Responding,
}

impl DialogPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogPhase::Listening => "listening",
            DialogPhase::Responding => "responding",
        }
    }
}

/// Summary of a completed session.
#[derive(Debug, Clone)]
pub struct DialogOutcome {
    pub turns: usize,
    pub last_user_utterance: String,
    pub last_response: String,
    pub final_state: DialogState,
}

/// One multi-turn exchange. Created per interaction and consumed by [`DialogSession::run`].
pub struct DialogSession<'a> {
    actions: &'a ActionPrimitives,
    utterances: &'a Slot<Utterance>,
    service: &'a dyn DialogService,
    greeting: String,
    state: DialogState,
    phase: DialogPhase,
}

impl<'a> DialogSession<'a> {
    pub fn new(
        actions: &'a ActionPrimitives,
        utterances: &'a Slot<Utterance>,
        service: &'a dyn DialogService,
        greeting: impl Into<String>,
    ) -> Self {
        Self {
            actions,
            utterances,
            service,
            greeting: greeting.into(),
            state: DialogState::initial(),
            phase: DialogPhase::Listening,
        }
    }

    fn enter(&mut self, phase: DialogPhase) {
        debug!(target: "concierge::dialog", from = self.phase.as_str(), to = phase.as_str(), "dialog phase");
        self.phase = phase;
    }

    /// Run to completion. A failed or malformed service call ends the session with an error.
    pub async fn run(mut self) -> ConciergeResult<DialogOutcome> {
        info!(target: "concierge::dialog", "dialog begins");
        let greeting = std::mem::take(&mut self.greeting);
        self.actions.speak(&greeting).await?;
        self.enter(DialogPhase::Listening);

        let mut turns = 0;
        loop {
            let user_utterance = self.listen().await?;
            self.enter(DialogPhase::Responding);
            let response = self.respond(&user_utterance).await?;
            turns += 1;

            if is_farewell(&user_utterance, &response) {
                info!(target: "concierge::dialog", turns, "dialog is done");
                return Ok(DialogOutcome {
                    turns,
                    last_user_utterance: user_utterance,
                    last_response: response,
                    final_state: self.state,
                });
            }
            self.enter(DialogPhase::Listening);
        }
    }

    /// Wait for the next non-empty utterance.
    async fn listen(&self) -> ConciergeResult<String> {
        loop {
            let utterance = self.utterances.wait_for_change().await?;
            let text = utterance.text.trim();
            if text.is_empty() {
                debug!(target: "concierge::dialog", "empty utterance ignored");
                continue;
            }
            info!(target: "concierge::dialog", user = text, "user said");
            return Ok(text.to_string());
        }
    }

    /// One service round trip; returns the text that was spoken.
    async fn respond(&mut self, user_utterance: &str) -> ConciergeResult<String> {
        let mut request = std::mem::take(&mut self.state);
        request.user_utt_t = Some(user_utterance.to_string());

        self.state = self.service.respond(&request).await?;
        let response = self.state.response_text();
        self.actions.speak(&response).await?;
        Ok(response)
    }
}
