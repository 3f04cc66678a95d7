//! Invocation types: what a single model turn asks the agent to do.
//!
//! The wire grammar is `<<<TAG:'ARG1'<SEP>'ARG2'...>>>`. The markers and the
//! argument separator are defined here so the parser, the tool usage texts
//! and the initial prompt all agree on them.

use serde::{Deserialize, Serialize};

/// Opens an invocation.
pub const OPEN_MARKER: &str = "<<<";

/// Closes an invocation.
pub const CLOSE_MARKER: &str = ">>>";

/// Separates arguments inside an invocation.
pub const ARG_SEPARATOR: &str = "<nex!-pr-amtre?gr+>";

/// Tag that ends the task instead of invoking a backend.
pub const FINISH_TAG: &str = "FINISH";

/// One parsed tool command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Tag naming the target tool, as written by the model.
    pub tag: String,

    /// Positional arguments with their outer quotes removed.
    pub arguments: Vec<String>,

    /// The exact source text, markers included.
    pub raw: String,
}

impl Invocation {
    /// Tag normalized for registry lookups.
    pub fn normalized_tag(&self) -> String {
        self.tag.to_ascii_uppercase()
    }
}

/// The result of scanning one model response.
///
/// `plain_segments` always holds one more element than `invocations`:
/// segment `i` is the text before invocation `i`, and the last segment is the
/// text after the final invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParseResult {
    pub invocations: Vec<Invocation>,
    pub plain_segments: Vec<String>,
}

impl ParseResult {
    /// Rebuild the source text by interleaving segments and invocations.
    pub fn reconstruct(&self) -> String {
        let mut text = String::new();
        for (i, segment) in self.plain_segments.iter().enumerate() {
            text.push_str(segment);
            if let Some(inv) = self.invocations.get(i) {
                text.push_str(&inv.raw);
            }
        }
        text
    }

    /// The raw text of every invocation, in order of appearance.
    pub fn invocation_markers(&self) -> Vec<&str> {
        self.invocations.iter().map(|i| i.raw.as_str()).collect()
    }
}

/// What the dispatcher decided for a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Feed this text back to the model as the next prompt.
    Continue(String),
    /// The task is complete with this result.
    Finished(String),
}
