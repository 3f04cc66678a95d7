//! The turn loop implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anvil_core::error::ProviderError;
use anvil_core::invocation::TurnOutcome;
use anvil_core::message::Conversation;
use anvil_core::provider::{Communicator, NoWait, RateLimiter};
use anvil_core::tool::ToolRegistry;
use anvil_security::{PathError, Sandbox};
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::parser::parse;
use crate::prompt::build_initial_prompt;
use crate::turn_event::{SilentObserver, TurnEvent, TurnObserver};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The model signalled completion.
    Finished { result: String, turns: u32 },
    /// The turn budget ran out first.
    Exhausted { turns: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Turn budget must be at least 1")]
    InvalidTurnBudget,

    #[error(transparent)]
    Workspace(#[from] PathError),

    #[error("Model call failed: {0}")]
    Provider(#[from] ProviderError),
}

/// The agent: drives the model turn by turn until it finishes.
pub struct Agent {
    communicator: Arc<dyn Communicator>,
    waiter: Arc<dyn RateLimiter>,
    dispatcher: Dispatcher,
    sandbox: Sandbox,
    model: String,
    initial_prompt: String,
    context: Conversation,
    observer: Arc<dyn TurnObserver>,
}

impl Agent {
    /// Create an agent whose tools work below `base_dir`.
    pub fn new(
        communicator: Arc<dyn Communicator>,
        tools: Arc<ToolRegistry>,
        base_dir: impl Into<PathBuf>,
    ) -> Self {
        let initial_prompt = build_initial_prompt(&tools);
        Self {
            model: communicator.name().to_string(),
            communicator,
            waiter: Arc::new(NoWait),
            dispatcher: Dispatcher::new(tools),
            sandbox: Sandbox::new(base_dir),
            initial_prompt,
            context: Conversation::new(),
            observer: Arc::new(SilentObserver),
        }
    }

    /// Set the rate limiter awaited before each task.
    pub fn with_waiter(mut self, waiter: Arc<dyn RateLimiter>) -> Self {
        self.waiter = waiter;
        self
    }

    /// Set the model name handed to the rate limiter.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Report progress to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn TurnObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn initial_prompt(&self) -> &str {
        &self.initial_prompt
    }

    /// The conversation accumulated so far.
    pub fn context(&self) -> &Conversation {
        &self.context
    }

    /// Forget the accumulated conversation.
    pub fn reset_context(&mut self) {
        debug!(messages = self.context.len(), "Resetting agent context");
        self.context = Conversation::new();
    }

    /// Run `task` for at most `max_turns` turns.
    ///
    /// Only unrecoverable problems are errors: a zero budget, a sandbox that
    /// cannot be created, or a model that rejects our credentials. Running
    /// out of turns is a normal outcome.
    pub async fn run(&mut self, task: &str, max_turns: u32) -> Result<RunOutcome, AgentError> {
        if max_turns == 0 {
            return Err(AgentError::InvalidTurnBudget);
        }

        self.waiter.wait_if_needed(&self.model).await;
        self.sandbox.ensure_base()?;
        info!(max_turns, base = %self.sandbox.base().display(), "Starting task");

        let mut prompt = format!("{}{task}", self.initial_prompt);

        for turn in 1..=max_turns {
            self.emit(TurnEvent::TurnStarted { turn, max_turns });
            debug!(turn, prompt_len = prompt.len(), "Agent turn");

            let response = match self.communicator.chat(&prompt, self.context.clone()).await {
                Ok((response, context)) => {
                    self.context = context;
                    response
                }
                Err(e) if e.is_transient() => {
                    warn!(turn, error = %e, "Model call failed, retrying next turn");
                    self.emit(TurnEvent::ModelError {
                        turn,
                        message: e.to_string(),
                    });
                    continue;
                }
                Err(e) => {
                    warn!(turn, error = %e, "Model call failed permanently");
                    return Err(AgentError::Provider(e));
                }
            };

            let parsed = parse(&response);
            self.emit(TurnEvent::ModelResponded {
                turn,
                response: response.clone(),
                invocations: parsed
                    .invocation_markers()
                    .into_iter()
                    .map(String::from)
                    .collect(),
            });

            match self.dispatcher.dispatch(&parsed).await {
                TurnOutcome::Finished(result) => {
                    info!(turns = turn, "Task finished");
                    self.emit(TurnEvent::Finished {
                        turns: turn,
                        result: result.clone(),
                    });
                    return Ok(RunOutcome::Finished {
                        result,
                        turns: turn,
                    });
                }
                TurnOutcome::Continue(output) => {
                    self.emit(TurnEvent::ToolOutput {
                        turn,
                        output: output.clone(),
                    });
                    prompt = output;
                }
            }
        }

        info!(turns = max_turns, "Turn budget exhausted");
        self.emit(TurnEvent::Exhausted { turns: max_turns });
        Ok(RunOutcome::Exhausted { turns: max_turns })
    }

    fn emit(&self, event: TurnEvent) {
        tracing::trace!(event = event.event_type(), "Turn event");
        self.observer.on_event(&event);
    }
}
