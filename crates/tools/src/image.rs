//! IMAGE tool: ask a vision model about an image in the sandbox.

use std::sync::Arc;

use async_trait::async_trait;
use anvil_core::error::ToolError;
use anvil_core::provider::VisionClient;
use anvil_core::tool::{Arity, Tool};
use anvil_security::Sandbox;
use tracing::debug;

const USAGE: &str = "\
IMAGE: analyze an image file in your workspace.
  <<<IMAGE:'path_to_image'<nex!-pr-amtre?gr+>'message'>>>
  Example: <<<IMAGE:'test.jpg'<nex!-pr-amtre?gr+>'What is this image about?'>>>";

pub struct ImageTool {
    client: Arc<dyn VisionClient>,
    sandbox: Sandbox,
}

impl ImageTool {
    pub fn new(client: Arc<dyn VisionClient>, sandbox: Sandbox) -> Self {
        Self { client, sandbox }
    }
}

#[async_trait]
impl Tool for ImageTool {
    fn tag(&self) -> &str {
        "IMAGE"
    }

    fn usage(&self) -> &str {
        USAGE
    }

    fn arity(&self, _arguments: &[String]) -> Option<Arity> {
        Some(Arity::exactly(2))
    }

    async fn invoke(&self, arguments: &[String]) -> Result<String, ToolError> {
        let path = self
            .sandbox
            .resolve_file(&arguments[0])
            .map_err(|e| ToolError::Resource {
                tool_name: "IMAGE".into(),
                reason: e.to_string(),
            })?;
        if !path.is_file() {
            return Err(ToolError::Resource {
                tool_name: "IMAGE".into(),
                reason: format!("Image not found at '{}'.", arguments[0]),
            });
        }
        debug!(path = %path.display(), "Analyzing image");

        let text = self
            .client
            .analyze(&arguments[1], &path)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "IMAGE".into(),
                reason: e.to_string(),
            })?;
        Ok(format!("Analysis result: {text}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_core::error::ProviderError;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Option<(String, PathBuf)>>,
    }

    #[async_trait]
    impl VisionClient for Recorder {
        async fn analyze(&self, message: &str, image_path: &Path) -> Result<String, ProviderError> {
            *self.seen.lock().unwrap() = Some((message.to_string(), image_path.to_path_buf()));
            Ok("a cat".into())
        }
    }

    #[tokio::test]
    async fn path_is_confined_and_result_prefixed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("etc")).unwrap();
        std::fs::write(dir.path().join("etc/pic.png"), b"png").unwrap();

        let client = Arc::new(Recorder::default());
        let tool = ImageTool::new(client.clone(), Sandbox::new(dir.path()));
        let out = tool
            .invoke(&["../../etc/pic.png".to_string(), "what is it?".to_string()])
            .await
            .unwrap();
        assert_eq!(out, "Analysis result: a cat");

        let (message, path) = client.seen.lock().unwrap().clone().unwrap();
        assert_eq!(message, "what is it?");
        assert_eq!(path, dir.path().join("etc/pic.png"));
    }

    #[tokio::test]
    async fn missing_image_never_reaches_client() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(Recorder::default());
        let tool = ImageTool::new(client.clone(), Sandbox::new(dir.path()));
        let err = tool
            .invoke(&["nope.png".to_string(), "hi".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Image not found at 'nope.png'."));
        assert!(client.seen.lock().unwrap().is_none());
    }
}
