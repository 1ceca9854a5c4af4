use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::agent::{
    event::{Content, Event},
    runtime::AgentRuntime,
    session::Session,
};

/// Reply used when a turn ends without any text.
pub const NO_FINAL_RESPONSE: &str = "(no final response)";

const EVENT_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    AwaitingResponse,
    Done,
}

/// Feeds user utterances to a runtime one at a time and collects the
/// final reply of each turn.
pub struct ConversationDriver<R> {
    runtime: R,
    session: Session,
    state: DriverState,
    turn_timeout: Duration,
    cancel: CancellationToken,
}

impl<R: AgentRuntime> ConversationDriver<R> {
    pub fn new(runtime: R, session: Session, turn_timeout: Duration) -> Self {
        Self {
            runtime,
            session,
            state: DriverState::Idle,
            turn_timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned token, e.g. one cancelled on Ctrl-C.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Submit one utterance and wait for the runtime's final event.
    ///
    /// Returns the first text part of that event, or [`NO_FINAL_RESPONSE`].
    /// Timeouts, cancellation and runtime failures are returned as errors and
    /// leave the driver idle. The events of a failed turn are removed from the
    /// session so the next turn starts from a consistent history.
    pub async fn ask(&mut self, text: &str) -> Result<String> {
        self.state = DriverState::AwaitingResponse;
        let mark = self.session.events().len();
        tracing::info!(runtime = self.runtime.name(), session = %self.session.session_id, "submitting utterance");

        let outcome = tokio::select! {
            res = tokio::time::timeout(self.turn_timeout, Self::exchange(&self.runtime, &mut self.session, text)) => {
                res.map_err(|_| anyhow!("No final response within {:?}", self.turn_timeout))
                    .and_then(|inner| inner)
            }
            _ = self.cancel.cancelled() => Err(anyhow!("Conversation cancelled")),
        };

        match outcome {
            Ok(reply) => {
                self.state = DriverState::Done;
                Ok(reply)
            }
            Err(err) => {
                tracing::debug!(
                    discarded = self.session.events().len().saturating_sub(mark),
                    "dropping events of failed turn"
                );
                self.session.truncate(mark);
                self.state = DriverState::Idle;
                Err(err)
            }
        }
    }

    async fn exchange(runtime: &R, session: &mut Session, text: &str) -> Result<String> {
        let (tx, mut rx) = mpsc::channel::<Event>(EVENT_BUFFER);

        let turn = runtime.run_turn(session, Content::user(text), tx);
        // Dropping `rx` on the final event closes the channel for the runtime.
        let collect = async move {
            while let Some(event) = rx.recv().await {
                if event.is_final_response() {
                    return Some(event);
                }
                tracing::debug!(author = %event.author, "intermediate event");
            }
            None
        };

        let (turn_result, final_event) = tokio::join!(turn, collect);
        turn_result?;

        let Some(event) = final_event else {
            bail!("Runtime finished the turn without a final response");
        };

        Ok(event
            .content
            .as_ref()
            .and_then(Content::first_text)
            .map(str::to_string)
            .unwrap_or_else(|| NO_FINAL_RESPONSE.to_string()))
    }
}
