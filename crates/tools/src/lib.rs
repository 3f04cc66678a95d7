//! Built-in tool implementations for Anvil.
//!
//! Tools give the agent the ability to act inside its sandbox: read and
//! write files, keep write-once records, run shell commands, and (through
//! collaborators) ask the user, look things up, and look at images.

pub mod ask_user;
pub mod database;
pub mod escape;
pub mod file_editor;
pub mod file_store;
pub mod image;
pub mod kv_store;
pub mod listing;
pub mod shell;
pub mod wiki;

use std::sync::Arc;
use std::time::Duration;

use anvil_config::AppConfig;
use anvil_core::provider::{VisionClient, WikiClient};
use anvil_core::tool::{ToolRegistry, UserPrompter};
use anvil_security::{DenyList, Sandbox};
use tracing::debug;

pub use file_store::{FileStore, FileStoreError};
pub use kv_store::{KvStore, StoreError, StoreNode};
pub use shell::{ProcessExecutor, ShellError, ShellOutput};

/// Outside services some tools delegate to.
///
/// A tool whose collaborator is missing is not registered at all.
pub struct Collaborators {
    pub prompter: Option<Arc<dyn UserPrompter>>,
    pub wiki: Option<Arc<dyn WikiClient>>,
    pub vision: Option<Arc<dyn VisionClient>>,
}

/// Build the tool registry described by `config`.
///
/// Every tool is registered with its activation flag, so a deactivated tool
/// answers exactly like an unknown one. Fails only when the database
/// document exists but is not a valid store.
pub fn build_registry(
    config: &AppConfig,
    collaborators: Collaborators,
) -> Result<ToolRegistry, StoreError> {
    let flags = &config.tools;
    let sandbox = Sandbox::new(&config.agent.base_dir);
    let mut registry = ToolRegistry::new();

    registry.register_with(
        Box::new(file_editor::FileTool::new(FileStore::new(sandbox.clone()))),
        flags.file_editor,
    );

    let executor = ProcessExecutor::new(
        sandbox.base(),
        DenyList::new(config.shell.forbidden_commands.iter().cloned()),
        Duration::from_secs(config.shell.timeout_secs),
    );
    registry.register_with(Box::new(shell::ShellTool::new(executor)), flags.shell_executor);

    let store = KvStore::open(&config.database.path)?;
    registry.register_with(
        Box::new(database::DataTool::new(Arc::new(store))),
        flags.database,
    );

    if let Some(prompter) = collaborators.prompter {
        registry.register_with(Box::new(ask_user::AskUserTool::new(prompter)), flags.ask_user);
    }
    if let Some(wiki) = collaborators.wiki {
        registry.register_with(Box::new(wiki::WikiTool::new(wiki)), flags.wiki);
    }
    if let Some(vision) = collaborators.vision {
        registry.register_with(
            Box::new(image::ImageTool::new(vision, sandbox)),
            flags.image_analyzer,
        );
    }

    debug!(enabled = ?registry.tags(), "Tool registry built");
    Ok(registry)
}
