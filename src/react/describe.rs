//! 参数生成：按工具的参数模板与使用说明，让 LLM 生成本次调用的参数对象

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::{AgentError, ConversationState};
use crate::llm::{complete_json, CompletionOptions, LlmClient, ModelHint};
use crate::memory::Message;
use crate::react::stages::Describe;
use crate::tools::ToolDescriptor;

const STAGE: &str = "describe";

/// describe 阶段输出：一个 JSON 对象，具体字段由工具决定
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParameterResult(pub Map<String, Value>);

impl ParameterResult {
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for ParameterResult {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

pub struct Describer {
    llm: Arc<dyn LlmClient>,
}

impl Describer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub fn system_prompt(tool: &ToolDescriptor, query: &str, state: &ConversationState) -> String {
        let last_message = state.last_message().map(|m| m.content.as_str()).unwrap_or("");
        let previous = state
            .actions()
            .iter()
            .map(|a| format!("{}: {}", a.name, a.parameters))
            .collect::<Vec<_>>()
            .join(", ");
        let examples = state
            .tools()
            .iter()
            .map(|t| format!("Example for {}: {}", t.name, t.parameters))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            r#"Prepare the parameters for a call to the "{name}" tool.

<context>
Current date: {now}
Tool description: {description}
Parameter template: {template}
Query: {query}
Last message: "{last_message}"
Previous actions: {previous}
</context>

<tool_instruction>
{instruction}
</tool_instruction>

Reply with a single JSON object that follows the parameter template of the tool.
{examples}"#,
            name = tool.name,
            now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            description = tool.description,
            template = tool.parameters,
            instruction = tool.instruction,
        )
    }
}

#[async_trait]
impl Describe for Describer {
    async fn describe(
        &self,
        tool: &str,
        query: &str,
        state: &ConversationState,
    ) -> Result<ParameterResult, AgentError> {
        let descriptor = state
            .registry()
            .find(tool)
            .ok_or_else(|| AgentError::ToolNotFound(tool.to_string()))?;
        let messages = vec![Message::system(Self::system_prompt(descriptor, query, state))];
        let parameters = complete_json(
            self.llm.as_ref(),
            STAGE,
            &messages,
            &CompletionOptions::json(ModelHint::Default),
        )
        .await?;
        let value = Value::Object(parameters.clone());
        tracing::info!(tool = %tool, parameters = %value, "describe");
        Ok(parameters.into())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::MockLlmClient;
    use crate::tools::{ToolKind, ToolRegistry};

    fn state(registry: ToolRegistry) -> ConversationState {
        ConversationState::new("c", Arc::new(registry), 5).with_messages(vec![Message::user("list the data dir")])
    }

    #[tokio::test]
    async fn test_missing_tool_is_not_found() {
        let registry = ToolRegistry::new(
            ToolRegistry::default_catalog()
                .list_tools()
                .iter()
                .filter(|t| t.name != ToolKind::DownloadFiles.name())
                .cloned()
                .collect(),
        );
        let llm = Arc::new(MockLlmClient::default());
        let err = Describer::new(llm.clone())
            .describe("download_files", "get it", &state(registry))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Tool download_files not found");
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_returns_object() {
        let llm = Arc::new(MockLlmClient::scripted(vec![r#"{"operation": "list", "path": "data"}"#]));
        let s = state(ToolRegistry::default_catalog());
        let params = Describer::new(llm.clone())
            .describe("file_operations", "list data", &s)
            .await
            .unwrap();
        assert_eq!(params.to_value(), json!({ "operation": "list", "path": "data" }));

        let prompt = &llm.calls()[0].messages[0].content;
        assert!(prompt.contains("Query: list data"));
        assert!(prompt.contains("Example for database_search"));
    }

    #[tokio::test]
    async fn test_array_reply_is_invalid() {
        let llm = Arc::new(MockLlmClient::scripted(vec![r#"["data"]"#]));
        let err = Describer::new(llm)
            .describe("file_operations", "list", &state(ToolRegistry::default_catalog()))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidLlmReply { stage: "describe", .. }));
    }
}
