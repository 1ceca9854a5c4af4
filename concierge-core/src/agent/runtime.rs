use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::agent::{
    event::{Content, Event},
    session::Session,
};

/// The reasoning engine behind the agent.
///
/// A runtime receives one user message per call, decides which tools to
/// invoke, and reports every step through `events`. The last event of a
/// turn must satisfy [`Event::is_final_response`]. Tool failures are part of
/// the conversation and must not be returned as `Err`; only failures of the
/// runtime itself (e.g. the model endpoint) are.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    fn name(&self) -> &str;

    async fn run_turn(
        &self,
        session: &mut Session,
        message: Content,
        events: mpsc::Sender<Event>,
    ) -> Result<()>;
}

/// Record `event` in the session and forward it to the driver.
///
/// Content without parts is forwarded but not recorded: the model endpoint
/// rejects history entries with empty `parts`. A closed receiver means the
/// driver already has its final event.
pub(crate) async fn emit(session: &mut Session, events: &mpsc::Sender<Event>, event: Event) {
    if event.content.as_ref().is_some_and(|c| !c.parts.is_empty()) {
        session.append(event.clone());
    }
    if events.send(event).await.is_err() {
        tracing::debug!("event receiver closed; dropping event");
    }
}

#[async_trait]
impl<T: AgentRuntime + ?Sized> AgentRuntime for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn run_turn(
        &self,
        session: &mut Session,
        message: Content,
        events: mpsc::Sender<Event>,
    ) -> Result<()> {
        (**self).run_turn(session, message, events).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::event::Role;

    #[tokio::test]
    async fn empty_content_is_forwarded_but_not_recorded() {
        let mut session = Session::new("app", "user", "sess");
        let (tx, mut rx) = mpsc::channel(4);

        emit(&mut session, &tx, Event::new("agent", Content { role: Role::Model, parts: Vec::new() })).await;
        emit(&mut session, &tx, Event::new("agent", Content::model("hello"))).await;
        drop(tx);

        assert_eq!(session.history(), vec![Content::model("hello")]);
        assert!(rx.recv().await.unwrap().content.unwrap().parts.is_empty());
        assert_eq!(rx.recv().await.unwrap().content.unwrap().first_text(), Some("hello"));
    }
}
