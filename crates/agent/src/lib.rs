//! The turn loop — the heart of Anvil.
//!
//! Each turn follows the same fixed path:
//!
//! 1. **Send** the current prompt to the model communicator
//! 2. **Parse** the reply for `<<<TAG:'arg'...>>>` invocations
//! 3. **Dispatch** at most one invocation to its tool
//! 4. **Feed** the tool's text back as the next prompt
//!
//! The loop ends when the model calls `FINISH` or the turn budget runs out.

pub mod dispatcher;
pub mod loop_runner;
pub mod parser;
pub mod prompt;
pub mod turn_event;

pub use dispatcher::Dispatcher;
pub use loop_runner::{Agent, AgentError, RunOutcome};
pub use parser::parse;
pub use prompt::build_initial_prompt;
pub use turn_event::{SilentObserver, TurnEvent, TurnObserver};
