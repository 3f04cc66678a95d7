//! ASK_USER tool: put a question to the human at the terminal.

use std::sync::Arc;

use async_trait::async_trait;
use anvil_core::error::ToolError;
use anvil_core::tool::{Arity, Tool, UserPrompter};

const USAGE: &str = "\
ASK_USER: ask the user for information or confirmation you cannot get otherwise.
  <<<ASK_USER:'question_to_ask'>>>";

pub struct AskUserTool {
    prompter: Arc<dyn UserPrompter>,
}

impl AskUserTool {
    pub fn new(prompter: Arc<dyn UserPrompter>) -> Self {
        Self { prompter }
    }
}

#[async_trait]
impl Tool for AskUserTool {
    fn tag(&self) -> &str {
        "ASK_USER"
    }

    fn usage(&self) -> &str {
        USAGE
    }

    fn arity(&self, _arguments: &[String]) -> Option<Arity> {
        Some(Arity::exactly(1))
    }

    async fn invoke(&self, arguments: &[String]) -> Result<String, ToolError> {
        let answer = self.prompter.ask(&arguments[0]).await?;
        Ok(format!("User Input: {answer}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Canned {
        asked: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl UserPrompter for Canned {
        async fn ask(&self, question: &str) -> Result<String, ToolError> {
            self.asked.lock().unwrap().push(question.to_string());
            Ok("Ada".into())
        }
    }

    #[tokio::test]
    async fn answer_is_prefixed() {
        let prompter = Arc::new(Canned {
            asked: Mutex::new(Vec::new()),
        });
        let tool = AskUserTool::new(prompter.clone());
        let out = tool.invoke(&["What is your name?".to_string()]).await.unwrap();
        assert_eq!(out, "User Input: Ada");
        assert_eq!(*prompter.asked.lock().unwrap(), vec!["What is your name?"]);
    }
}
