//! Dispatcher — turns one parsed model response into one turn outcome.
//!
//! At most one tool runs per turn. Every problem (no invocation, several
//! invocations, unknown tag, wrong argument count, tool failure) becomes
//! text for the model to read; nothing here returns an error.

use std::sync::Arc;
use std::time::Instant;

use anvil_core::invocation::{ARG_SEPARATOR, FINISH_TAG, Invocation, ParseResult, TurnOutcome};
use anvil_core::tool::ToolRegistry;
use tracing::{debug, warn};

pub struct Dispatcher {
    tools: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }

    /// Decide the outcome of a turn.
    pub async fn dispatch(&self, parsed: &ParseResult) -> TurnOutcome {
        match parsed.invocations.as_slice() {
            [] => {
                debug!("Model response contained no invocation");
                TurnOutcome::Continue(no_invocation_message())
            }
            [single] => self.dispatch_one(single).await,
            many => {
                warn!(count = many.len(), "Model attempted several invocations in one turn");
                TurnOutcome::Continue(several_invocations_message(parsed))
            }
        }
    }

    async fn dispatch_one(&self, invocation: &Invocation) -> TurnOutcome {
        let tag = invocation.normalized_tag();
        let arguments = &invocation.arguments;

        if tag == FINISH_TAG {
            return match arguments.as_slice() {
                [result] => TurnOutcome::Finished(result.clone()),
                _ => TurnOutcome::Continue(format!(
                    "Usage error for {FINISH_TAG}: expected 1 argument, got {}.\n\
                     Usage: <<<{FINISH_TAG}:'final result'>>>",
                    arguments.len()
                )),
            };
        }

        let Some(tool) = self.tools.get(&tag) else {
            debug!(tag = %invocation.tag, "Unknown tool tag");
            return TurnOutcome::Continue(format!(
                "Error: Unknown tool '{}'. Available tools: {}.",
                invocation.tag,
                self.available()
            ));
        };

        let Some(arity) = tool.arity(arguments) else {
            let operation = arguments.first().map(String::as_str).unwrap_or_default();
            return TurnOutcome::Continue(format!(
                "Usage error for {tag}: unknown operation '{operation}'.\n{}",
                tool.usage()
            ));
        };
        if !arity.accepts(arguments.len()) {
            return TurnOutcome::Continue(format!(
                "Usage error for {tag}: expected {arity} argument(s), got {}.\n{}",
                arguments.len(),
                tool.usage()
            ));
        }

        let start = Instant::now();
        let result = tool.invoke(arguments).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(text) => {
                debug!(tag = %tag, arity = arguments.len(), duration_ms, success = true, "Tool executed");
                TurnOutcome::Continue(text)
            }
            Err(e) => {
                warn!(tag = %tag, arity = arguments.len(), duration_ms, error = %e, "Tool execution failed");
                TurnOutcome::Continue(format!("Error: {e}"))
            }
        }
    }

    fn available(&self) -> String {
        let mut tags: Vec<&str> = self.tools.tags();
        tags.push(FINISH_TAG);
        tags.join(", ")
    }
}

fn no_invocation_message() -> String {
    format!(
        "No tool invocation found in your response. Call exactly one tool per turn using \
         <<<TAG:'argument'{ARG_SEPARATOR}'argument'>>>, or finish the task with \
         <<<{FINISH_TAG}:'final result'>>>."
    )
}

fn several_invocations_message(parsed: &ParseResult) -> String {
    let attempted = parsed
        .invocation_markers()
        .iter()
        .map(|raw| format!("  {raw}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Error: {} tool invocations found, but only one is allowed per turn. \
         None of them were executed:\n{attempted}\nSend them one at a time.",
        parsed.invocations.len()
    )
}
