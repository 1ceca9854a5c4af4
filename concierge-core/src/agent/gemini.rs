//! Runtime backed by the Gemini `generateContent` API.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;

use crate::{
    agent::{
        Agent,
        event::{Content, Event, Part, Role},
        runtime::{AgentRuntime, emit},
        session::Session,
    },
    error::truncate_body,
    tool::FunctionDeclaration,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model round-trips allowed in one turn before giving up.
const MAX_MODEL_CALLS: usize = 8;

#[derive(Debug)]
pub struct GeminiRuntime {
    agent: Agent,
    api_key: String,
    base_url: String,
    http: Client,
}

impl GeminiRuntime {
    pub fn new(agent: Agent, api_key: String) -> Self {
        Self::with_base_url(agent, api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(agent: Agent, api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            agent,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    async fn generate(&self, history: Vec<Content>) -> Result<Content> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.agent.model);
        let request = GenerateContentRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part::text(self.agent.instruction.as_str())],
            },
            contents: history,
            tools: vec![GeminiTools {
                function_declarations: self.agent.tools.declarations(),
            }],
        };

        tracing::debug!(model = %self.agent.model, turns = request.contents.len(), "calling Gemini");

        let res = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Gemini")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read Gemini response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Gemini request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).context("Failed to parse Gemini response JSON")?;

        let content = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| {
                if let Some(reason) = &c.finish_reason {
                    tracing::debug!(%reason, "Gemini finish reason");
                }
                c.content
            })
            .unwrap_or(Content { role: Role::Model, parts: Vec::new() });

        Ok(content)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
    tools: Vec<GeminiTools>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTools {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[async_trait]
impl AgentRuntime for GeminiRuntime {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn run_turn(
        &self,
        session: &mut Session,
        message: Content,
        events: mpsc::Sender<Event>,
    ) -> Result<()> {
        session.append(Event::new("user", message));

        for _ in 0..MAX_MODEL_CALLS {
            let content = self.generate(session.history()).await?;
            let calls: Vec<_> = content.function_calls().cloned().collect();
            emit(session, &events, Event::new(&self.agent.name, content)).await;

            if calls.is_empty() {
                return Ok(());
            }

            let mut parts = Vec::with_capacity(calls.len());
            for call in calls {
                let response = match self.agent.tools.call(&call.name, &call.args).await {
                    Ok(value) => value,
                    Err(err) => json!({ "status": "error", "error_message": err.to_string() }),
                };
                parts.push(Part::function_response(call.name, response));
            }

            emit(session, &events, Event::new(&self.agent.name, Content { role: Role::User, parts }))
                .await;
        }

        bail!("Gemini requested tools {MAX_MODEL_CALLS} times without producing an answer")
    }
}
