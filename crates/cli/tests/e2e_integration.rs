//! End-to-end integration tests for the Anvil agent.
//!
//! These tests exercise the full pipeline from model reply to tool effect:
//! parsing, dispatch, the real file/data/shell backends built from config,
//! and the turn loop feeding tool output back as the next prompt.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anvil_agent::{Agent, RunOutcome};
use anvil_config::AppConfig;
use anvil_core::error::ProviderError;
use anvil_core::invocation::ARG_SEPARATOR as SEP;
use anvil_core::message::{Conversation, Message};
use anvil_core::provider::Communicator;
use anvil_tools::{Collaborators, StoreError, build_registry};

// ── Mock Communicator ────────────────────────────────────────────────────

/// A communicator that replays scripted replies in sequence.
///
/// Once the script runs out it keeps replying with plain text, which never
/// contains an invocation.
struct ScriptedCommunicator {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCommunicator {
    fn new(replies: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// The prompt sent on turn `n` (1-based).
    fn prompt(&self, n: usize) -> String {
        self.prompts.lock().unwrap()[n - 1].clone()
    }
}

#[async_trait::async_trait]
impl Communicator for ScriptedCommunicator {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn chat(
        &self,
        prompt: &str,
        mut context: Conversation,
    ) -> Result<(String, Conversation), ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "Still thinking about it.".into());
        context.push(Message::user(prompt));
        context.push(Message::assistant(reply.clone()));
        Ok((reply, context))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn test_config(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.agent.base_dir = dir.join("workspace");
    config.database.path = dir.join("database.json");
    config.shell.timeout_secs = 10;
    config
}

fn agent_for(config: &AppConfig, comm: Arc<ScriptedCommunicator>) -> Agent {
    let registry = build_registry(
        config,
        Collaborators {
            prompter: None,
            wiki: None,
            vision: None,
        },
    )
    .unwrap();
    Agent::new(comm, Arc::new(registry), &config.agent.base_dir)
}

fn call(tag: &str, args: &[&str]) -> String {
    let quoted: Vec<String> = args.iter().map(|a| format!("'{a}'")).collect();
    format!("<<<{tag}:{}>>>", quoted.join(SEP))
}

// ── Turn loop ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_finish_on_first_turn() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let comm = ScriptedCommunicator::new(vec![format!("Easy. {}", call("FINISH", &["4"]))]);
    let mut agent = agent_for(&config, comm.clone());

    let outcome = agent.run("What is 2 + 2?", 10).await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Finished {
            result: "4".into(),
            turns: 1
        }
    );
    assert_eq!(comm.calls(), 1);
    let last = agent.context().messages.last().unwrap();
    assert_eq!(last.content, "Easy. <<<FINISH:'4'>>>");
    assert!(comm.prompt(1).ends_with("What is 2 + 2?"));
    assert!(comm.prompt(1).contains("FILE:"));
    assert!(config.agent.base_dir.is_dir());
}

#[tokio::test]
async fn e2e_no_invocation_exhausts_budget() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let comm = ScriptedCommunicator::new(vec![]);
    let mut agent = agent_for(&config, comm.clone());

    let outcome = agent.run("never finishes", 4).await.unwrap();

    assert_eq!(outcome, RunOutcome::Exhausted { turns: 4 });
    assert_eq!(comm.calls(), 4);
}

#[tokio::test]
async fn e2e_multiple_invocations_never_execute() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let comm = ScriptedCommunicator::new(vec![
        format!(
            "{} {}",
            call("FILE", &["write", "a.txt", "one"]),
            call("FILE", &["write", "b.txt", "two"])
        ),
        call("FINISH", &["gave up"]),
    ]);
    let mut agent = agent_for(&config, comm.clone());

    agent.run("write two files", 5).await.unwrap();

    assert!(!config.agent.base_dir.join("a.txt").exists());
    assert!(!config.agent.base_dir.join("b.txt").exists());
    assert!(comm.prompt(2).contains("2 tool invocations found"));
}

// ── File store ───────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_file_write_read_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let comm = ScriptedCommunicator::new(vec![
        call("FILE", &["write", "notes/todo.txt", r"buy milk\nfix bike"]),
        call("FILE", &["read", "notes/todo.txt"]),
        call("FILE", &["list", "notes", "lsc", "[True, True, False, 0]"]),
        call("FILE", &["append", "notes/todo.txt", r"\ncall mom"]),
        call("FINISH", &["done"]),
    ]);
    let mut agent = agent_for(&config, comm.clone());

    let outcome = agent.run("keep a todo list", 10).await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Finished {
            result: "done".into(),
            turns: 5
        }
    );

    assert_eq!(comm.prompt(2), "Successfully wrote to 'notes/todo.txt'.");
    assert_eq!(
        comm.prompt(3),
        "Content of file at notes/todo.txt is:\nbuy milk\nfix bike"
    );

    let listing: serde_json::Value = serde_json::from_str(&comm.prompt(4)).unwrap();
    assert_eq!(listing["listed_path"], "notes");
    assert_eq!(listing["size"], 17);
    assert_eq!(listing["children"]["todo.txt"]["type"], "file");
    assert!(listing["children"]["todo.txt"].get("content").is_none());

    assert_eq!(comm.prompt(5), "Successfully appended to 'notes/todo.txt'.");
    let on_disk = std::fs::read_to_string(config.agent.base_dir.join("notes/todo.txt")).unwrap();
    assert_eq!(on_disk, "buy milk\nfix bike\ncall mom");
}

#[tokio::test]
async fn e2e_paths_confined_to_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let comm = ScriptedCommunicator::new(vec![
        call("FILE", &["write", "../../../outside.txt", "x"]),
        call("FINISH", &["ok"]),
    ]);
    let mut agent = agent_for(&config, comm);

    agent.run("escape", 3).await.unwrap();

    assert!(config.agent.base_dir.join("outside.txt").is_file());
    assert!(!dir.path().join("outside.txt").exists());
}

// ── Key-value store ──────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_data_is_write_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let comm = ScriptedCommunicator::new(vec![
        call("DATA", &["write", "dark", "prefs/theme"]),
        call("DATA", &["write", "light", "prefs/theme"]),
        call("DATA", &["read", "prefs/theme"]),
        call("DATA", &["list", ""]),
        call("FINISH", &["remembered"]),
    ]);
    let mut agent = agent_for(&config, comm.clone());

    agent.run("remember my theme", 10).await.unwrap();

    assert_eq!(comm.prompt(2), "Data successfully written.");
    assert_eq!(
        comm.prompt(3),
        "Error: DATA: Path already exists. Cannot overwrite."
    );
    assert_eq!(comm.prompt(4), "dark");
    assert_eq!(comm.prompt(5), r#"["prefs"]"#);

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&config.database.path).unwrap()).unwrap();
    assert_eq!(doc, serde_json::json!({"prefs": {"theme": "dark"}}));
}

#[tokio::test]
async fn e2e_corrupt_database_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::write(&config.database.path, "{ this is not json").unwrap();

    let result = build_registry(
        &config,
        Collaborators {
            prompter: None,
            wiki: None,
            vision: None,
        },
    );
    assert!(matches!(result, Err(StoreError::Corrupt { .. })));
}

// ── Shell ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_forbidden_command_reported_not_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let comm = ScriptedCommunicator::new(vec![
        call("SHELL", &["sudo touch pwned"]),
        call("FINISH", &["blocked"]),
    ]);
    let mut agent = agent_for(&config, comm.clone());

    agent.run("try sudo", 3).await.unwrap();

    assert!(comm.prompt(2).contains("Forbidden shell command detected."));
    assert!(!config.agent.base_dir.join("pwned").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn e2e_shell_runs_in_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let comm = ScriptedCommunicator::new(vec![
        call("SHELL", &["echo hi > made.txt && cat made.txt"]),
        call("FINISH", &["ok"]),
    ]);
    let mut agent = agent_for(&config, comm.clone());

    agent.run("make a file", 3).await.unwrap();

    assert_eq!(comm.prompt(2), "STDOUT:\nhi\nSTDERR: [empty]");
    assert!(config.agent.base_dir.join("made.txt").is_file());
}

// ── Registry ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_disabled_tool_looks_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.tools.shell_executor = false;
    let comm = ScriptedCommunicator::new(vec![
        call("SHELL", &["ls"]),
        call("BOGUS", &["ls"]),
        call("FINISH", &["ok"]),
    ]);
    let mut agent = agent_for(&config, comm.clone());

    agent.run("list", 5).await.unwrap();

    assert_eq!(
        comm.prompt(2).replace("SHELL", "BOGUS"),
        comm.prompt(3)
    );
    assert!(comm.prompt(2).starts_with("Error: Unknown tool 'SHELL'"));
}
