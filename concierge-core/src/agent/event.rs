//! Messages exchanged between the driver, a runtime and the model.
//!
//! The serialized form matches the Gemini `Content`/`Part` JSON so session
//! history can be sent to the model as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

/// One segment of a message. Exactly one field is expected to be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Default::default() }
    }

    pub fn function_call(name: impl Into<String>, args: Value) -> Self {
        Self {
            function_call: Some(FunctionCall { name: name.into(), args }),
            ..Default::default()
        }
    }

    pub fn function_response(name: impl Into<String>, response: Value) -> Self {
        Self {
            function_response: Some(FunctionResponse { name: name.into(), response }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, parts: vec![Part::text(text)] }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: Role::Model, parts: vec![Part::text(text)] }
    }

    pub fn function_calls(&self) -> impl Iterator<Item = &FunctionCall> {
        self.parts.iter().filter_map(|p| p.function_call.as_ref())
    }

    pub fn function_responses(&self) -> impl Iterator<Item = &FunctionResponse> {
        self.parts.iter().filter_map(|p| p.function_response.as_ref())
    }

    /// Text of the first part, if that part is text.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.first().and_then(|p| p.text.as_deref())
    }
}

/// A single step of a turn as seen by the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// `"user"` for the submitted message, otherwise the agent name.
    pub author: String,
    pub content: Option<Content>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(author: impl Into<String>, content: Content) -> Self {
        Self {
            author: author.into(),
            content: Some(content),
            timestamp: Utc::now(),
        }
    }

    /// An event is final when it neither requests nor answers a tool call.
    pub fn is_final_response(&self) -> bool {
        match &self.content {
            None => true,
            Some(content) => {
                content.function_calls().next().is_none()
                    && content.function_responses().next().is_none()
            }
        }
    }
}
