use thiserror::Error;

/// Failure of a single tool invocation.
///
/// Tool errors are never retried. They are handed to the agent runtime,
/// which decides how to explain them to the user.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Failed to send request to {service}: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} request failed with status {status}: {body}")]
    Status {
        service: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to parse {service} response: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{service} API error: {payload}")]
    Api {
        service: &'static str,
        payload: String,
    },

    #[error("Currency '{0}' is not in the exchange rate table")]
    UnknownCurrency(String),

    #[error("Invalid arguments for '{tool}': {message}")]
    InvalidArguments { tool: &'static str, message: String },

    #[error("Unknown tool '{0}'. Available tools: get_weather, convert_currency, suggest_outfit.")]
    UnknownTool(String),
}

impl ToolError {
    /// HTTP status of the failed request, when the remote answered at all.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            ToolError::Status { status, .. } => Some(*status),
            ToolError::Transport { source, .. } => source.status(),
            _ => None,
        }
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_bodies() {
        assert_eq!(truncate_body("not found"), "not found");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let body = "天".repeat(100);
        let out = truncate_body(&body);
        assert!(out.ends_with("..."));
        assert!(out.len() <= 203);
    }

    #[test]
    fn unknown_currency_message_names_code() {
        let err = ToolError::UnknownCurrency("XYZ".into());
        assert!(err.to_string().contains("'XYZ'"));
        assert!(err.status().is_none());
    }
}
