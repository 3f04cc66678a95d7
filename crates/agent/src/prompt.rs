//! Initial prompt: the instructions sent ahead of the first task.

use anvil_core::invocation::{ARG_SEPARATOR, CLOSE_MARKER, FINISH_TAG, OPEN_MARKER};
use anvil_core::tool::ToolRegistry;

const PREAMBLE: &str = "\
You are an autonomous agent working inside a private workspace directory. \
You complete the task below by calling tools, one call per turn, and reading \
their output in the next message.";

/// Build the initial prompt from the enabled tools in `tools`.
///
/// The task text is appended by the caller.
pub fn build_initial_prompt(tools: &ToolRegistry) -> String {
    let mut prompt = String::from(PREAMBLE);
    prompt.push_str("\n\n## How to call a tool\n");
    prompt.push_str(&format!(
        "Write {OPEN_MARKER}TAG:'first argument'{ARG_SEPARATOR}'second argument'{CLOSE_MARKER}\n\
         - Wrap every argument in single quotes.\n\
         - Separate arguments with {ARG_SEPARATOR}\n\
         - Call exactly ONE tool per response. If a response contains several calls, none of them run.\n\
         - Everything outside the markers is treated as your private thinking.\n\
         - When the task is complete, reply with {OPEN_MARKER}{FINISH_TAG}:'final result'{CLOSE_MARKER}\n"
    ));

    let enabled = tools.enabled();
    prompt.push_str("\n## Tools\n");
    if enabled.is_empty() {
        prompt.push_str(&format!(
            "No tools are available. Answer from your own knowledge and reply with \
             {OPEN_MARKER}{FINISH_TAG}:'answer'{CLOSE_MARKER}.\n"
        ));
    }
    for tool in enabled {
        prompt.push_str(tool.usage());
        prompt.push_str("\n\n");
    }

    prompt.push_str("## Task\n");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_core::error::ToolError;
    use anvil_core::tool::{Arity, Tool};
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl Tool for Named {
        fn tag(&self) -> &str {
            self.0
        }
        fn usage(&self) -> &str {
            self.0
        }
        fn arity(&self, _arguments: &[String]) -> Option<Arity> {
            Some(Arity::exactly(1))
        }
        async fn invoke(&self, _arguments: &[String]) -> Result<String, ToolError> {
            Ok(String::new())
        }
    }

    #[test]
    fn only_enabled_tools_described() {
        let mut registry = ToolRegistry::new();
        registry.register_with(Box::new(Named("ALPHA_USAGE")), true);
        registry.register_with(Box::new(Named("BETA_USAGE")), false);

        let prompt = build_initial_prompt(&registry);
        assert!(prompt.contains("ALPHA_USAGE"));
        assert!(!prompt.contains("BETA_USAGE"));
        assert!(prompt.contains(ARG_SEPARATOR));
        assert!(prompt.contains("<<<FINISH:'final result'>>>"));
        assert!(prompt.ends_with("## Task\n"));
    }

    #[test]
    fn no_tools_note() {
        let prompt = build_initial_prompt(&ToolRegistry::new());
        assert!(prompt.contains("No tools are available"));
    }
}
