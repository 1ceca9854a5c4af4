use crate::{
    config::Credentials,
    error::ToolError,
    tool::{currency::ExchangeRateTool, outfit::OutfitTool, weather::WeatherApiTool},
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::{convert::TryFrom, fmt::Debug, time::Duration};

pub mod currency;
pub mod outfit;
pub mod weather;

/// Timeout applied to every outbound tool request.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolId {
    GetWeather,
    ConvertCurrency,
    SuggestOutfit,
}

impl ToolId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolId::GetWeather => "get_weather",
            ToolId::ConvertCurrency => "convert_currency",
            ToolId::SuggestOutfit => "suggest_outfit",
        }
    }

    pub const fn all() -> &'static [ToolId] {
        &[ToolId::GetWeather, ToolId::ConvertCurrency, ToolId::SuggestOutfit]
    }
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ToolId {
    type Error = ToolError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "get_weather" => Ok(ToolId::GetWeather),
            "convert_currency" => Ok(ToolId::ConvertCurrency),
            "suggest_outfit" => Ok(ToolId::SuggestOutfit),
            _ => Err(ToolError::UnknownTool(value.to_string())),
        }
    }
}

/// A callable exposed to the agent runtime.
#[async_trait]
pub trait Tool: Send + Sync + Debug {
    fn id(&self) -> ToolId;

    /// Natural-language description shown to the model.
    fn description(&self) -> &'static str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;

    async fn call(&self, args: &Value) -> Result<Value, ToolError>;
}

/// Function declaration in the shape model APIs expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// The set of tools an agent may call, in registration order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any earlier tool with the same id.
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.retain(|t| t.id() != tool.id());
        self.tools.push(Box::new(tool));
    }

    pub fn get(&self, id: ToolId) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.id() == id).map(|t| t.as_ref())
    }

    pub fn ids(&self) -> Vec<ToolId> {
        self.tools.iter().map(|t| t.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.tools
            .iter()
            .map(|t| FunctionDeclaration {
                name: t.id().as_str().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters(),
            })
            .collect()
    }

    /// Dispatch a call by tool name.
    pub async fn call(&self, name: &str, args: &Value) -> Result<Value, ToolError> {
        let id = ToolId::try_from(name)?;
        let tool = self.get(id).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        tracing::info!(tool = %id, %args, "calling tool");
        let result = tool.call(args).await;
        if let Err(err) = &result {
            tracing::warn!(tool = %id, error = %err, "tool call failed");
        }
        result
    }
}

/// Construct the full tool set from explicit credentials.
pub fn registry_from_config(credentials: &Credentials) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(WeatherApiTool::new(credentials.weather_api_key.clone()));
    registry.register(ExchangeRateTool::new(credentials.exchangerate_api_key.clone()));
    registry.register(OutfitTool);
    registry
}

pub(crate) fn required_str<'a>(
    tool: ToolId,
    args: &'a Value,
    field: &str,
) -> Result<&'a str, ToolError> {
    args.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments {
            tool: tool.as_str(),
            message: format!("missing string '{field}'"),
        })
}
