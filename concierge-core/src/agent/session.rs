use chrono::{DateTime, Utc};

use crate::agent::event::{Content, Event};

/// Conversation state for one user, kept in memory for the process lifetime.
#[derive(Debug, Clone)]
pub struct Session {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    events: Vec<Event>,
}

impl Session {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        let session = Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            created_at: Utc::now(),
            events: Vec::new(),
        };
        tracing::debug!(
            app = %session.app_name,
            user = %session.user_id,
            session = %session.session_id,
            "session created"
        );
        session
    }

    pub fn append(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Drop every event after the first `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Every recorded message in order, as model conversation history.
    pub fn history(&self) -> Vec<Content> {
        self.events.iter().filter_map(|e| e.content.clone()).collect()
    }
}
