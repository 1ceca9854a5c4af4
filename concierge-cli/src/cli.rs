use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use concierge_core::{
    AgentRuntime, Config, ConversationDriver, Session, agent_from_config,
    agent::{gemini::GeminiRuntime, rules::RuleRuntime},
    config::DEFAULT_MODEL,
};
use inquire::{Password, PasswordDisplayMode, Text};
use tokio_util::sync::CancellationToken;

const APP_NAME: &str = "multi_tool_demo";
const USER_ID: &str = "user_1";
const SESSION_ID: &str = "sess_001";

/// Scripted utterances for `concierge demo`, each steering toward a different tool mix.
const DEMO_UTTERANCES: &[&str] = &[
    "How's the weather in Taipei? I'd also like a suggestion for what to wear.",
    "How much is 10,000 yen in pesos? And the weather in Manila too.",
    "I'm going to Sydney, what should I wear?",
];

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "concierge", version, about = "Travel concierge: weather, currency and outfit tools behind one agent")]
pub struct Cli {
    /// Config file; defaults to ./config.toml, then the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Answer with the built-in rule engine instead of the Gemini model.
    #[arg(long, global = true)]
    pub offline: bool,

    /// More log output on stderr (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the three scripted example questions (default).
    Demo,

    /// Ask one or more questions in a single session.
    Ask {
        /// Questions, asked in order.
        #[arg(required = true)]
        utterances: Vec<String>,
    },

    /// Enter API keys and agent settings interactively.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Command::Configure) => configure(self.config),
            Some(Command::Ask { ref utterances }) => {
                let utterances: Vec<&str> = utterances.iter().map(String::as_str).collect();
                self.converse(&utterances).await
            }
            Some(Command::Demo) | None => self.converse(DEMO_UTTERANCES).await,
        }
    }

    fn load_config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    }

    async fn converse(&self, utterances: &[&str]) -> anyhow::Result<()> {
        let config = self.load_config()?;
        let credentials = config.credentials()?;
        let agent = agent_from_config(&config, &credentials);

        let runtime: Box<dyn AgentRuntime> = if self.offline {
            Box::new(RuleRuntime::new(agent))
        } else {
            Box::new(GeminiRuntime::new(agent, credentials.gemini_api_key.clone()))
        };

        tracing::info!(runtime = runtime.name(), model = config.model(), "starting conversation");

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        let session = Session::new(APP_NAME, USER_ID, SESSION_ID);
        let mut driver =
            ConversationDriver::new(runtime, session, config.turn_timeout()).with_cancellation(cancel);

        for utterance in utterances {
            println!("\n>>> {utterance}");
            let reply = driver.ask(utterance).await?;
            println!("<<< {reply}");
        }

        Ok(())
    }
}

fn configure(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = match path {
        Some(path) => path,
        None => Config::config_file_path()?,
    };

    let mut config = if path.exists() { Config::load_from(&path)? } else { Config::default() };

    prompt_secret("Gemini API key", &mut config.gemini_api_key)?;
    prompt_secret("WeatherAPI.com key", &mut config.weather_api_key)?;
    prompt_secret("ExchangeRate-API key", &mut config.exchangerate_api_key)?;

    let model = Text::new("Model:")
        .with_default(config.agent.model.as_deref().unwrap_or(DEFAULT_MODEL))
        .prompt()
        .context("Failed to read model name")?;
    config.agent.model = Some(model);

    config.save_to(&path)?;
    config.credentials()?;

    println!("Saved configuration to {}", path.display());
    Ok(())
}

/// Ask for a secret; an empty answer keeps the current value.
fn prompt_secret(label: &str, slot: &mut Option<String>) -> anyhow::Result<()> {
    let hint = if slot.is_some() { "press Enter to keep the current key" } else { "required" };

    let value = Password::new(&format!("{label}:"))
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message(hint)
        .prompt()
        .with_context(|| format!("Failed to read {label}"))?;

    let value = value.trim();
    if !value.is_empty() {
        *slot = Some(value.to_string());
    }
    Ok(())
}
