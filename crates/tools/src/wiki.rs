//! WIKI tool: encyclopedia lookups through a [`WikiClient`].

use std::sync::Arc;

use async_trait::async_trait;
use anvil_core::error::ToolError;
use anvil_core::provider::WikiClient;
use anvil_core::tool::{Arity, Tool};

const USAGE: &str = "\
WIKI: look up a topic in the encyclopedia.
  <<<WIKI:'search query'>>>";

pub struct WikiTool {
    client: Arc<dyn WikiClient>,
}

impl WikiTool {
    pub fn new(client: Arc<dyn WikiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WikiTool {
    fn tag(&self) -> &str {
        "WIKI"
    }

    fn usage(&self) -> &str {
        USAGE
    }

    fn arity(&self, _arguments: &[String]) -> Option<Arity> {
        Some(Arity::exactly(1))
    }

    async fn invoke(&self, arguments: &[String]) -> Result<String, ToolError> {
        let text = self
            .client
            .search(&arguments[0])
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "WIKI".into(),
                reason: e.to_string(),
            })?;
        Ok(format!("Wiki result: {text}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_core::error::ProviderError;

    struct Fixed(Result<String, ProviderError>);

    #[async_trait]
    impl WikiClient for Fixed {
        async fn search(&self, _query: &str) -> Result<String, ProviderError> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn result_is_prefixed() {
        let tool = WikiTool::new(Arc::new(Fixed(Ok("Rust is a language.".into()))));
        let out = tool.invoke(&["rust".to_string()]).await.unwrap();
        assert_eq!(out, "Wiki result: Rust is a language.");
    }

    #[tokio::test]
    async fn client_failure_becomes_tool_error() {
        let tool = WikiTool::new(Arc::new(Fixed(Err(ProviderError::Network("down".into())))));
        let err = tool.invoke(&["rust".to_string()]).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }
}
