//! Core library for the `concierge` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The three tools (weather, currency, outfit) and their registry
//! - Agent runtimes (Gemini-backed and rule-based) and the conversation driver
//!
//! It is used by `concierge-cli`, but can also be reused by other binaries or services.

pub mod agent;
pub mod config;
pub mod error;
pub mod model;
pub mod tool;

pub use agent::{Agent, AgentRuntime, ConversationDriver, Session, agent_from_config};
pub use config::{Config, Credentials};
pub use error::ToolError;
pub use model::{ConversionResult, OutfitCategory, OutfitSuggestion, WeatherReport};
pub use tool::{Tool, ToolId, ToolRegistry, registry_from_config};
