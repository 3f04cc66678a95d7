//! DATA tool — persistent write-once storage for the model.

use std::sync::Arc;

use async_trait::async_trait;
use anvil_core::error::ToolError;
use anvil_core::tool::{Arity, Tool};

use crate::kv_store::{KvStore, StoreError};

const USAGE: &str = "\
DATA: store and retrieve information that must outlive this task.
  <<<DATA:'write'<nex!-pr-amtre?gr+>'content'<nex!-pr-amtre?gr+>'path/with/name'>>>
  <<<DATA:'read'<nex!-pr-amtre?gr+>'path/with/name'>>>
  <<<DATA:'list'<nex!-pr-amtre?gr+>'path/to/container'>>>
  Existing entries are never overwritten. Use '' to list the root level.";

pub struct DataTool {
    store: Arc<KvStore>,
}

impl DataTool {
    pub fn new(store: Arc<KvStore>) -> Self {
        Self { store }
    }
}

fn resource(err: StoreError) -> ToolError {
    ToolError::Resource {
        tool_name: "DATA".into(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl Tool for DataTool {
    fn tag(&self) -> &str {
        "DATA"
    }

    fn usage(&self) -> &str {
        USAGE
    }

    fn arity(&self, arguments: &[String]) -> Option<Arity> {
        match arguments.first()?.as_str() {
            "write" => Some(Arity::exactly(3)),
            "read" | "list" => Some(Arity::exactly(2)),
            _ => None,
        }
    }

    async fn invoke(&self, arguments: &[String]) -> Result<String, ToolError> {
        match arguments[0].as_str() {
            // content comes before path on the wire
            "write" => self
                .store
                .write(&arguments[2], &arguments[1])
                .await
                .map_err(resource),
            "read" => self.store.read(&arguments[1]).await.map_err(resource),
            "list" => self.store.list(&arguments[1]).await.map_err(resource),
            other => Err(ToolError::InvalidArguments(format!(
                "unknown DATA operation '{other}'"
            ))),
        }
    }
}
