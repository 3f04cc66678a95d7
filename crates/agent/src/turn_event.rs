//! Turn events: what the loop reports while a task runs.
//!
//! The loop itself prints nothing. Front-ends implement [`TurnObserver`] to
//! render progress (the CLI prints to the terminal, tests record events).

use serde::{Deserialize, Serialize};

/// Events emitted by the turn loop, in order of occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// A turn is about to call the model. `turn` counts from 1.
    TurnStarted { turn: u32, max_turns: u32 },

    /// The model replied. `invocations` holds the raw invocation texts.
    ModelResponded {
        turn: u32,
        response: String,
        invocations: Vec<String>,
    },

    /// The dispatcher produced text for the next prompt.
    ToolOutput { turn: u32, output: String },

    /// The model call failed with a transient error; the turn is spent.
    ModelError { turn: u32, message: String },

    /// The task completed.
    Finished { turns: u32, result: String },

    /// The turn budget ran out.
    Exhausted { turns: u32 },
}

impl TurnEvent {
    /// Short event name, for logs.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TurnStarted { .. } => "turn_started",
            Self::ModelResponded { .. } => "model_responded",
            Self::ToolOutput { .. } => "tool_output",
            Self::ModelError { .. } => "model_error",
            Self::Finished { .. } => "finished",
            Self::Exhausted { .. } => "exhausted",
        }
    }
}

/// Receives turn events.
pub trait TurnObserver: Send + Sync {
    fn on_event(&self, event: &TurnEvent);
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl TurnObserver for SilentObserver {
    fn on_event(&self, _event: &TurnEvent) {}
}
