//! FILE tool — the model's view of the sandboxed file store.

use async_trait::async_trait;
use anvil_core::error::ToolError;
use anvil_core::tool::{Arity, Tool};
use tracing::warn;

use crate::file_store::{FileStore, FileStoreError};

const USAGE: &str = "\
FILE: read, write, append and list files inside your workspace.
  <<<FILE:'read'<nex!-pr-amtre?gr+>'path'>>>
  <<<FILE:'write'<nex!-pr-amtre?gr+>'path'<nex!-pr-amtre?gr+>'content'>>>
  <<<FILE:'append'<nex!-pr-amtre?gr+>'path'<nex!-pr-amtre?gr+>'content'>>>
  <<<FILE:'list'<nex!-pr-amtre?gr+>'path'<nex!-pr-amtre?gr+>'ls|lsc'<nex!-pr-amtre?gr+>'[size, type, content, max_len]'>>>
  In content, write \\n for a newline, \\t for a tab, \\' and \\\" for quotes and <bs> for a backslash.
  'ls' lists one level, 'lsc' the whole tree; fields are True/False flags and a length limit (0 = none).";

pub struct FileTool {
    store: FileStore,
}

impl FileTool {
    pub fn new(store: FileStore) -> Self {
        Self { store }
    }

    async fn list(&self, arguments: &[String]) -> String {
        let path = &arguments[1];
        let result = self
            .store
            .list(
                path,
                arguments.get(2).map(String::as_str),
                arguments.get(3).map(String::as_str),
            )
            .await
            .map_err(|e| e.to_string())
            .and_then(|listing| serde_json::to_string_pretty(&listing).map_err(|e| e.to_string()));

        match result {
            Ok(json) => json,
            Err(message) => {
                warn!(path = %path, error = %message, "Listing failed");
                let doc = serde_json::json!({ "error": message });
                serde_json::to_string_pretty(&doc).unwrap_or_else(|_| doc.to_string())
            }
        }
    }
}

fn resource(err: FileStoreError) -> ToolError {
    ToolError::Resource {
        tool_name: "FILE".into(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl Tool for FileTool {
    fn tag(&self) -> &str {
        "FILE"
    }

    fn usage(&self) -> &str {
        USAGE
    }

    fn arity(&self, arguments: &[String]) -> Option<Arity> {
        match arguments.first()?.as_str() {
            "read" => Some(Arity::exactly(2)),
            "write" | "append" => Some(Arity::exactly(3)),
            "list" => Some(Arity::between(2, 4)),
            _ => None,
        }
    }

    async fn invoke(&self, arguments: &[String]) -> Result<String, ToolError> {
        match arguments[0].as_str() {
            "read" => self.store.read(&arguments[1]).await.map_err(resource),
            "write" => self
                .store
                .write(&arguments[1], &arguments[2])
                .await
                .map_err(resource),
            "append" => self
                .store
                .append(&arguments[1], &arguments[2])
                .await
                .map_err(resource),
            "list" => Ok(self.list(arguments).await),
            other => Err(ToolError::InvalidArguments(format!(
                "unknown FILE operation '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_security::Sandbox;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn tool() -> (tempfile::TempDir, FileTool) {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileTool::new(FileStore::new(Sandbox::new(dir.path())));
        (dir, tool)
    }

    #[test]
    fn arity_by_operation() {
        let (_dir, tool) = tool();
        assert_eq!(tool.arity(&args(&["read", "a"])), Some(Arity::exactly(2)));
        assert_eq!(tool.arity(&args(&["write"])), Some(Arity::exactly(3)));
        assert_eq!(tool.arity(&args(&["list", "."])), Some(Arity::between(2, 4)));
        assert_eq!(tool.arity(&args(&["delete", "a"])), None);
        assert_eq!(tool.arity(&[]), None);
    }

    #[tokio::test]
    async fn write_and_read() {
        let (_dir, tool) = tool();
        tool.invoke(&args(&["write", "a.txt", "hi"])).await.unwrap();
        let out = tool.invoke(&args(&["read", "a.txt"])).await.unwrap();
        assert_eq!(out, "Content of file at a.txt is:\nhi");
    }

    #[tokio::test]
    async fn read_missing_is_resource_error() {
        let (_dir, tool) = tool();
        let err = tool.invoke(&args(&["read", "gone.txt"])).await.unwrap_err();
        assert!(matches!(err, ToolError::Resource { .. }));
        assert!(err.to_string().contains("File not found at 'gone.txt'."));
    }

    #[tokio::test]
    async fn list_renders_json() {
        let (_dir, tool) = tool();
        tool.invoke(&args(&["write", "d/f.txt", "12345"])).await.unwrap();
        let out = tool
            .invoke(&args(&["list", ".", "lsc", "[True, True, False, 0]"]))
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["listed_path"], ".");
        assert_eq!(json["size"], 5);
        assert_eq!(json["children"]["d"]["type"], "directory");
        assert_eq!(json["children"]["d"]["children"]["f.txt"]["size"], 5);
    }

    #[tokio::test]
    async fn list_errors_render_as_error_documents() {
        let (_dir, tool) = tool();
        let out = tool.invoke(&args(&["list", "missing"])).await.unwrap();
        // Same pretty layout as a successful listing
        assert_eq!(
            out,
            "{\n  \"error\": \"Directory not found or is not a directory at 'missing'.\"\n}"
        );

        let out = tool.invoke(&args(&["list", ".", "dir"])).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(json["error"].as_str().unwrap().contains("Invalid mode"));
    }
}
