//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act in the world: run shell
//! commands, read and write files in the sandbox, store data, ask the user.
//! Every tool is addressed by the tag the model writes in an invocation and
//! receives that invocation's positional string arguments.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::ToolError;

/// Accepted argument count for one tool operation (inclusive bounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: usize,
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: n }
    }

    pub const fn between(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn accepts(&self, count: usize) -> bool {
        (self.min..=self.max).contains(&count)
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{} to {}", self.min, self.max)
        }
    }
}

/// The core Tool trait.
///
/// Each backend adapter (FILE, SHELL, DATA, ...) implements this trait. Tools
/// are registered in the [`ToolRegistry`] and looked up by the dispatcher.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tag the model uses to address this tool (e.g., "FILE").
    fn tag(&self) -> &str;

    /// Usage text shown to the model in the initial prompt and in usage errors.
    fn usage(&self) -> &str;

    /// Accepted argument count for the operation these arguments select.
    ///
    /// Returns `None` when the arguments name an operation the tool does
    /// not have.
    fn arity(&self, arguments: &[String]) -> Option<Arity>;

    /// Run the tool. Only called after [`Tool::arity`] accepted the arguments.
    async fn invoke(&self, arguments: &[String]) -> std::result::Result<String, ToolError>;
}

/// Source of answers for questions the agent asks the user.
#[async_trait]
pub trait UserPrompter: Send + Sync {
    async fn ask(&self, question: &str) -> std::result::Result<String, ToolError>;
}

struct Registered {
    tool: Box<dyn Tool>,
    enabled: bool,
}

/// A registry of tools, keyed by upper-cased tag.
///
/// Disabled tools stay registered but are invisible to lookups, so a
/// disabled tag is indistinguishable from one that never existed.
pub struct ToolRegistry {
    tools: HashMap<String, Registered>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool with an explicit enablement flag. Replaces any
    /// existing tool with the same tag.
    pub fn register_with(&mut self, tool: Box<dyn Tool>, enabled: bool) {
        let tag = tool.tag().to_ascii_uppercase();
        self.tools.insert(tag, Registered { tool, enabled });
    }

    /// Get an enabled tool by tag (case-insensitive).
    pub fn get(&self, tag: &str) -> Option<&dyn Tool> {
        self.tools
            .get(&tag.to_ascii_uppercase())
            .filter(|entry| entry.enabled)
            .map(|entry| entry.tool.as_ref())
    }

    /// Enabled tools, sorted by tag.
    pub fn enabled(&self) -> Vec<&dyn Tool> {
        let mut tools: Vec<(&String, &dyn Tool)> = self
            .tools
            .iter()
            .filter(|(_, entry)| entry.enabled)
            .map(|(tag, entry)| (tag, entry.tool.as_ref()))
            .collect();
        tools.sort_by(|a, b| a.0.cmp(b.0));
        tools.into_iter().map(|(_, tool)| tool).collect()
    }

    /// Tags of all enabled tools, sorted.
    pub fn tags(&self) -> Vec<&str> {
        self.enabled().into_iter().map(|t| t.tag()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn tag(&self) -> &str {
            "ECHO"
        }
        fn usage(&self) -> &str {
            "<<<ECHO:'text'>>>"
        }
        fn arity(&self, _arguments: &[String]) -> Option<Arity> {
            Some(Arity::exactly(1))
        }
        async fn invoke(&self, arguments: &[String]) -> Result<String, ToolError> {
            Ok(arguments[0].clone())
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register_with(Box::new(EchoTool), true);
        assert!(registry.get("ECHO").is_some());
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn disabled_tool_is_invisible() {
        let mut registry = ToolRegistry::new();
        registry.register_with(Box::new(EchoTool), false);
        assert!(registry.get("ECHO").is_none());
        assert!(registry.tags().is_empty());

        // Re-registering the same tag replaces the entry
        registry.register_with(Box::new(EchoTool), true);
        assert!(registry.get("ECHO").is_some());
        assert_eq!(registry.tags(), vec!["ECHO"]);
    }

    #[test]
    fn arity_bounds() {
        let arity = Arity::between(2, 4);
        assert!(!arity.accepts(1));
        assert!(arity.accepts(2));
        assert!(arity.accepts(4));
        assert!(!arity.accepts(5));
        assert_eq!(arity.to_string(), "2 to 4");
        assert_eq!(Arity::exactly(1).to_string(), "1");
    }

    #[tokio::test]
    async fn registry_invoke_tool() {
        let mut registry = ToolRegistry::new();
        registry.register_with(Box::new(EchoTool), true);
        let tool = registry.get("echo").unwrap();
        let out = tool.invoke(&["hello world".to_string()]).await.unwrap();
        assert_eq!(out, "hello world");
    }
}
