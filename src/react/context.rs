//! 上下文筛选：从已收集的文档中挑出本次工具调用需要的部分
//!
//! 使用轻量模型；回复必须包含 uuids 列表，结果按文档集合原有顺序返回。

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::core::{AgentError, ConversationState};
use crate::llm::{complete_json, CompletionOptions, LlmClient, ModelHint};
use crate::memory::{Document, Message};
use crate::react::schema::context_schema_json;
use crate::react::stages::SelectContext;
use crate::react::ParameterResult;

const STAGE: &str = "context";

/// 上下文筛选结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextResult {
    pub reasoning: String,
    pub uuids: Vec<String>,
}

impl ContextResult {
    /// uuids 缺失或不是列表时返回 MissingUuids；列表中的非字符串项忽略
    pub fn parse(reply: &serde_json::Map<String, Value>) -> Result<Self, AgentError> {
        let uuids = reply
            .get("uuids")
            .and_then(Value::as_array)
            .ok_or(AgentError::MissingUuids)?
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect();
        let reasoning = ["_reasoning", "reasoning"]
            .iter()
            .find_map(|k| reply.get(*k).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();
        Ok(Self { reasoning, uuids })
    }

    /// 按文档集合顺序取出被选中的文档
    pub fn select(&self, documents: &[Document]) -> Vec<Document> {
        let wanted: HashSet<&str> = self.uuids.iter().map(String::as_str).collect();
        documents
            .iter()
            .filter(|d| wanted.contains(d.uuid().to_string().as_str()))
            .cloned()
            .collect()
    }
}

const SYSTEM_PROMPT: &str = r#"You pick the documents a tool needs for its next call.
<rules>
- read the conversation, the tool details and the planned parameters
- choose only documents whose content the tool actually needs, the list may be empty
- error documents are only useful when the tool has to react to that error
- use the exact uuid values from the document list
- reply with JSON only
</rules>"#;

#[derive(Serialize)]
struct DocumentView<'a> {
    uuid: String,
    name: &'a str,
    description: Option<&'a str>,
    source: &'a str,
    content_type: &'a str,
    text: &'a str,
}

pub struct ContextSelector {
    llm: Arc<dyn LlmClient>,
}

impl ContextSelector {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub fn user_prompt(tool: &str, query: &str, parameters: &ParameterResult, state: &ConversationState) -> String {
        let history = state
            .messages()
            .iter()
            .map(|m| format!("[{}] {}", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n");
        let descriptor = state.registry().find(tool);
        let documents: Vec<DocumentView<'_>> = state
            .documents()
            .iter()
            .map(|d| DocumentView {
                uuid: d.uuid().to_string(),
                name: &d.metadata.name,
                description: d.metadata.description.as_deref(),
                source: &d.metadata.source,
                content_type: d.metadata.content_type.as_str(),
                text: &d.text,
            })
            .collect();
        format!(
            r#"<messages_history>
{history}
</messages_history>

<tool>
name: {tool}
description: {description}
parameters: {template}
query: {query}
planned_parameters: {parameters}
</tool>

<documents_to_choose>
{documents}
</documents_to_choose>"#,
            description = descriptor.map(|t| t.description.as_str()).unwrap_or(""),
            template = descriptor.map(|t| t.parameters.as_str()).unwrap_or(""),
            parameters = serde_json::to_string_pretty(parameters).unwrap_or_default(),
            documents = serde_json::to_string_pretty(&documents).unwrap_or_default(),
        )
    }
}

#[async_trait]
impl SelectContext for ContextSelector {
    async fn select_context(
        &self,
        tool: &str,
        query: &str,
        parameters: &ParameterResult,
        state: &ConversationState,
    ) -> Result<Vec<Document>, AgentError> {
        // 无可选文档时不调用模型；此时缺少 uuids 的回复也就不会出现
        if state.documents().is_empty() {
            return Ok(Vec::new());
        }
        let messages = vec![
            Message::system(format!(
                "{}\n\nReply with a JSON object matching this schema:\n{}",
                SYSTEM_PROMPT,
                context_schema_json()
            )),
            Message::user(Self::user_prompt(tool, query, parameters, state)),
        ];
        let reply = complete_json(
            self.llm.as_ref(),
            STAGE,
            &messages,
            &CompletionOptions::json(ModelHint::Mini).with_temperature(0.0),
        )
        .await?;
        let selection = ContextResult::parse(&reply)?;
        tracing::info!(tool = %tool, uuids = ?selection.uuids, "context selected");
        Ok(selection.select(state.documents()))
    }
}
