use crate::{
    config::{Config, Credentials},
    tool::{ToolRegistry, registry_from_config},
};

pub mod driver;
pub mod event;
pub mod gemini;
pub mod instruction;
pub mod rules;
pub mod runtime;
pub mod session;

pub use driver::{ConversationDriver, DriverState, NO_FINAL_RESPONSE};
pub use event::{Content, Event, Part, Role};
pub use runtime::AgentRuntime;
pub use session::Session;

pub const AGENT_NAME: &str = "travel_concierge_v1";
pub const AGENT_DESCRIPTION: &str = "Multi-tool demo: weather, currency, outfits.";

/// An agent definition: identity, policy and the tools it may call.
///
/// Runtimes own an `Agent` and interpret it; the agent itself has no logic.
#[derive(Debug)]
pub struct Agent {
    pub name: String,
    pub model: String,
    pub description: String,
    pub instruction: String,
    pub tools: ToolRegistry,
}

impl Agent {
    pub fn new(model: impl Into<String>, tools: ToolRegistry) -> Self {
        Self {
            name: AGENT_NAME.to_string(),
            model: model.into(),
            description: AGENT_DESCRIPTION.to_string(),
            instruction: instruction::TRAVEL_INSTRUCTION.to_string(),
            tools,
        }
    }
}

/// Build the travel concierge from validated configuration.
pub fn agent_from_config(config: &Config, credentials: &Credentials) -> Agent {
    Agent::new(config.model(), registry_from_config(credentials))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_from_config_uses_configured_model() {
        let mut config = Config::default();
        config.agent.model = Some("gemini-1.5-flash".into());
        let creds = Credentials {
            gemini_api_key: "G".into(),
            weather_api_key: "W".into(),
            exchangerate_api_key: "X".into(),
        };

        let agent = agent_from_config(&config, &creds);
        assert_eq!(agent.name, AGENT_NAME);
        assert_eq!(agent.model, "gemini-1.5-flash");
        assert_eq!(agent.tools.len(), 3);
    }
}
