//! Shell tool: run commands in the sandbox directory.
//!
//! Commands go through a prefix deny-list first, then run under `sh -c`
//! (`cmd /C` on Windows) with the sandbox base as working directory and a
//! hard timeout. On unix every command gets its own process group; the
//! groups are remembered so `killall <name>` only reaches processes this
//! executor started. A group is forgotten once it has no members left, so a
//! recycled group id never points `killall` at someone else's processes.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use anvil_core::error::ToolError;
use anvil_core::tool::{Arity, Tool};
use anvil_security::{CommandCheck, DenyList};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Process groups remembered for `killall`.
const MAX_TRACKED_GROUPS: usize = 256;

const NO_MATCH: &str = "No matching processes found in sandbox.";

const USAGE: &str = "\
SHELL: run a shell command in your workspace directory.
  <<<SHELL:'command_to_execute'>>>
  Example: <<<SHELL:'python3 -c \"print(42)\"'>>>. Don't add extra quotes.
  'killall <name>' only stops processes you started.";

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Forbidden shell command detected.")]
    Forbidden { prefix: String },

    #[error("Command timed out after {secs} seconds.")]
    Timeout { secs: u64 },

    #[error("Error executing shell command: {0}")]
    Spawn(String),
}

/// Captured output of a finished command.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl std::fmt::Display for ShellOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn section(f: &mut std::fmt::Formatter<'_>, name: &str, text: &str) -> std::fmt::Result {
            if text.is_empty() {
                write!(f, "{name}: [empty]")
            } else {
                write!(f, "{name}:\n{}", text.trim())
            }
        }
        section(f, "STDOUT", &self.stdout)?;
        writeln!(f)?;
        section(f, "STDERR", &self.stderr)
    }
}

/// Runs commands inside the sandbox base directory.
pub struct ProcessExecutor {
    base: PathBuf,
    deny: DenyList,
    timeout: Duration,
    groups: Mutex<Vec<u32>>,
}

impl ProcessExecutor {
    pub fn new(base: impl Into<PathBuf>, deny: DenyList, timeout: Duration) -> Self {
        Self {
            base: base.into(),
            deny,
            timeout,
            groups: Mutex::new(Vec::new()),
        }
    }

    /// Run `command` with the configured timeout.
    pub async fn execute(&self, command: &str) -> Result<ShellOutput, ShellError> {
        self.execute_with_timeout(command, self.timeout).await
    }

    pub async fn execute_with_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<ShellOutput, ShellError> {
        if let CommandCheck::Denied { prefix } = self.deny.check(command) {
            warn!(command = %command, prefix = %prefix, "Forbidden shell command");
            return Err(ShellError::Forbidden { prefix });
        }

        let script = match killall_target(command) {
            Some(name) => scoped_kill_script(name, &self.live_groups().await),
            None => command.to_string(),
        };

        debug!(command = %script, cwd = %self.base.display(), "Executing shell command");
        let started = Instant::now();

        let mut cmd = shell_command(&script);
        cmd.current_dir(&self.base)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|e| ShellError::Spawn(e.to_string()))?;
        let pid = child.id();
        if let Some(pid) = pid {
            self.track(pid).await;
        }

        let result = tokio::time::timeout(timeout, child.wait_with_output()).await;
        if let Some(pid) = pid {
            if result.is_err() {
                // The dropped future already killed the shell; take its group too.
                kill_group(pid).await;
            }
            self.forget_if_finished(pid).await;
        }

        match result {
            Ok(Ok(output)) => {
                let exit_code = output.status.code();
                if !output.status.success() {
                    warn!(command = %command, exit_code = ?exit_code, "Command failed");
                }
                debug!(
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Shell command finished"
                );
                Ok(ShellOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code,
                })
            }
            Ok(Err(e)) => Err(ShellError::Spawn(e.to_string())),
            Err(_) => {
                warn!(command = %command, secs = timeout.as_secs(), "Command timed out");
                Err(ShellError::Timeout {
                    secs: timeout.as_secs(),
                })
            }
        }
    }

    async fn track(&self, pgid: u32) {
        if !cfg!(unix) {
            return;
        }
        let mut groups = self.groups.lock().await;
        if groups.len() >= MAX_TRACKED_GROUPS {
            groups.remove(0);
        }
        groups.push(pgid);
    }

    /// Stop tracking `pgid` when nothing in its group is running any more.
    async fn forget_if_finished(&self, pgid: u32) {
        if group_alive(pgid).await {
            debug!(pgid, "Process group still has members");
            return;
        }
        self.groups.lock().await.retain(|&g| g != pgid);
    }

    /// Prune finished groups and return the ones still alive.
    async fn live_groups(&self) -> Vec<u32> {
        let mut groups = self.groups.lock().await;
        let mut live = Vec::with_capacity(groups.len());
        for &pgid in groups.iter() {
            if group_alive(pgid).await {
                live.push(pgid);
            } else {
                debug!(pgid, "Forgetting finished process group");
            }
        }
        *groups = live.clone();
        live
    }

    #[cfg(test)]
    async fn tracked_groups(&self) -> Vec<u32> {
        self.groups.lock().await.clone()
    }
}

fn shell_command(script: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", script]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", script]);
        cmd
    }
}

#[cfg(unix)]
async fn kill_group(pgid: u32) {
    match signal_group("-KILL", pgid).await {
        Ok(status) if status.success() => {}
        Ok(status) => debug!(pgid, ?status, "Group kill reported failure; the group may survive"),
        Err(e) => debug!(pgid, error = %e, "Could not run kill for timed-out group"),
    }
}

#[cfg(not(unix))]
async fn kill_group(_pgid: u32) {}

/// Whether any process is left in group `pgid`.
#[cfg(unix)]
async fn group_alive(pgid: u32) -> bool {
    signal_group("-0", pgid)
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(not(unix))]
async fn group_alive(_pgid: u32) -> bool {
    false
}

#[cfg(unix)]
async fn signal_group(signal: &str, pgid: u32) -> std::io::Result<std::process::ExitStatus> {
    Command::new("kill")
        .args([signal, "--", &format!("-{pgid}")])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
}

/// The process name of a `killall <name>` command.
fn killall_target(command: &str) -> Option<&str> {
    let rest = command.trim().strip_prefix("killall")?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let name = rest.trim();
    (!name.is_empty()).then_some(name)
}

/// A script that kills `name` only inside the given process groups.
fn scoped_kill_script(name: &str, groups: &[u32]) -> String {
    if groups.is_empty() {
        return format!("echo \"{NO_MATCH}\"");
    }
    let groups = groups
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let pattern = format!("'{}'", name.replace('\'', r"'\''"));
    format!(
        "pids=$(pgrep -g {groups} -f {pattern}); \
         if [ -n \"$pids\" ]; then kill $pids; echo \"Killed processes with PIDs: $pids\"; \
         else echo \"{NO_MATCH}\"; fi"
    )
}

/// The SHELL tool.
pub struct ShellTool {
    executor: ProcessExecutor,
}

impl ShellTool {
    pub fn new(executor: ProcessExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn tag(&self) -> &str {
        "SHELL"
    }

    fn usage(&self) -> &str {
        USAGE
    }

    fn arity(&self, _arguments: &[String]) -> Option<Arity> {
        Some(Arity::exactly(1))
    }

    async fn invoke(&self, arguments: &[String]) -> Result<String, ToolError> {
        match self.executor.execute(&arguments[0]).await {
            Ok(output) => Ok(output.to_string()),
            Err(e @ ShellError::Forbidden { .. }) => Err(ToolError::PermissionDenied {
                tool_name: "SHELL".into(),
                reason: e.to_string(),
            }),
            Err(ShellError::Timeout { secs }) => Err(ToolError::Timeout {
                tool_name: "SHELL".into(),
                timeout_secs: secs,
            }),
            Err(e) => Err(ToolError::ExecutionFailed {
                tool_name: "SHELL".into(),
                reason: e.to_string(),
            }),
        }
    }
}
