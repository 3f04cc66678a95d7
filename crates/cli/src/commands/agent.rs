//! `anvil agent` — single-task or interactive mode.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anvil_agent::{Agent, TurnEvent, TurnObserver};
use anvil_config::AppConfig;
use anvil_core::error::ToolError;
use anvil_core::tool::UserPrompter;
use anvil_providers::{MinIntervalWaiter, OpenAiCompatProvider, WikipediaClient};
use anvil_tools::{Collaborators, build_registry};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// The terminal's line reader, shared by the task prompt and `ASK_USER`.
pub struct Console {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    /// Print `label` and read one line. `None` at end of input.
    pub async fn prompt(&self, label: &str) -> std::io::Result<Option<String>> {
        print!("{label}");
        std::io::stdout().flush()?;
        self.lines.lock().await.next_line().await
    }
}

#[async_trait]
impl UserPrompter for Console {
    async fn ask(&self, question: &str) -> Result<String, ToolError> {
        let answer = self
            .prompt(&format!("❓ {question} "))
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "ASK_USER".into(),
                reason: e.to_string(),
            })?;
        answer.ok_or_else(|| ToolError::ExecutionFailed {
            tool_name: "ASK_USER".into(),
            reason: "standard input is closed".into(),
        })
    }
}

/// Prints turn progress, honoring the `[agent]` display flags.
pub struct TerminalObserver {
    tool_outputs: bool,
    thoughts_in_terminal: bool,
}

impl TerminalObserver {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            tool_outputs: config.agent.tool_outputs,
            thoughts_in_terminal: config.agent.thoughts_in_terminal,
        }
    }
}

impl TurnObserver for TerminalObserver {
    fn on_event(&self, event: &TurnEvent) {
        match event {
            TurnEvent::TurnStarted { turn, max_turns } => {
                println!("\n--- Turn {turn}/{max_turns} ---");
                println!("🤖 Agent is thinking...");
            }
            TurnEvent::ModelResponded {
                response,
                invocations,
                ..
            } => {
                println!("▶️ Agent Action:");
                if self.thoughts_in_terminal {
                    println!("{response}");
                } else {
                    for raw in invocations {
                        println!("⚙️ {raw}");
                    }
                }
            }
            TurnEvent::ToolOutput { output, .. } => {
                if self.tool_outputs {
                    println!("\n🛠️ Tool Output:\n{output}");
                }
            }
            TurnEvent::ModelError { message, .. } => {
                println!("⚠️ Model call failed: {message}");
            }
            TurnEvent::Finished { result, .. } => {
                println!("\n✅ Task Finished!");
                println!("===========================");
                println!("🏁 Final Result:\n→ {result}");
                println!("===========================\n");
            }
            TurnEvent::Exhausted { .. } => {
                println!("\n🚫 Task incomplete: Maximum turns reached.");
            }
        }
    }
}

pub async fn run(
    config_path: Option<&PathBuf>,
    message: Option<String>,
    max_turns: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = crate::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    // Fail early with setup instructions when no key is configured
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    ANVIL_API_KEY  = 'sk-...'   (generic)");
        eprintln!("    OPENAI_API_KEY = 'sk-...'   (for OpenAI direct)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let max_turns = max_turns.unwrap_or(config.agent.max_turns);
    let console = Arc::new(Console::new());
    let provider = Arc::new(OpenAiCompatProvider::from_config(&config)?);

    let registry = build_registry(
        &config,
        Collaborators {
            prompter: Some(console.clone()),
            wiki: Some(Arc::new(WikipediaClient::new(&config.wiki.api_url)?)),
            vision: Some(provider.clone()),
        },
    )?;

    let mut agent = Agent::new(provider, Arc::new(registry), &config.agent.base_dir)
        .with_waiter(Arc::new(MinIntervalWaiter::new(config.model.requests_per_minute)))
        .with_model(&config.model.llm_model)
        .with_observer(Arc::new(TerminalObserver::from_config(&config)));

    if let Some(task) = message {
        println!("======= Starting Task =======");
        agent.run(&task, max_turns).await?;
        return Ok(());
    }

    println!();
    println!("  Anvil Agent — Interactive Mode");
    println!();
    println!("  Model:     {}", config.model.llm_model);
    println!("  Workspace: {}", config.agent.base_dir.display());
    println!("  Max turns: {max_turns}");
    println!();
    println!("  Type 'reset' to clear the conversation, 'exit' to quit.");
    println!();

    while let Some(line) = console.prompt("Enter your task for the agent: ").await? {
        let task = line.trim();
        match task.to_lowercase().as_str() {
            "" => continue,
            "exit" => break,
            "reset" => {
                agent.reset_context();
                println!("  Context cleared.");
            }
            _ => {
                println!("======= Starting Task =======");
                if let Err(e) = agent.run(task, max_turns).await {
                    eprintln!("  [Error] {e}");
                }
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}
