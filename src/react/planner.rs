//! Planner：决定下一步调用哪个工具（或结束并生成答案）
//!
//! Prompt 包含当前时间、最后一条消息、可用工具名与完整的 Action 历史；回复在边界处解析为 PlanResult。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{AgentError, ConversationState};
use crate::llm::{complete_json, CompletionOptions, LlmClient, ModelHint};
use crate::memory::Message;
use crate::react::schema::plan_schema_json;
use crate::react::stages::Plan;
use crate::tools::FINAL_ANSWER;

const STAGE: &str = "plan";

/// Planner 输出
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    #[serde(default, rename = "_reasoning", alias = "_thinking", alias = "reasoning")]
    pub reasoning: String,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub query: String,
}

impl PlanResult {
    /// 下一步要执行的工具；缺省、空串或 final_answer 表示进入答案生成
    pub fn next_tool(&self) -> Option<&str> {
        self.tool
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != FINAL_ANSWER)
    }

    pub fn parse(output: Value) -> Result<Self, AgentError> {
        serde_json::from_value(output).map_err(|e| AgentError::invalid_reply(STAGE, e.to_string()))
    }
}

pub struct Planner {
    llm: Arc<dyn LlmClient>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub fn system_prompt(state: &ConversationState) -> String {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let last_message = state
            .last_message()
            .map(|m| m.content.as_str())
            .unwrap_or("No messages yet");
        let tools = state
            .tools()
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            r#"Decide the single next step that moves the conversation towards its goal.

<rules>
- pick exactly one tool, and only from the available tools
- treat results of earlier actions as known, do not invent results for actions that were not taken
- if repeating an action brought nothing new, try a different approach
- use "{final_answer}" once the gathered information is enough or the user has to respond
- reply with JSON only
</rules>

<context>
<current_date>{now}</current_date>
<last_message>{last_message}</last_message>
<available_tools>{tools}</available_tools>
<actions_taken>
{actions}
</actions_taken>
</context>

Reply with a JSON object matching this schema:
{schema}"#,
            final_answer = FINAL_ANSWER,
            tools = if tools.is_empty() { "No tools available".to_string() } else { tools },
            actions = render_actions(state),
            schema = plan_schema_json(),
        )
    }
}

fn render_actions(state: &ConversationState) -> String {
    if state.actions().is_empty() {
        return "No actions taken".to_string();
    }
    state
        .actions()
        .iter()
        .map(|a| {
            let results = if a.results.is_empty() {
                "No results for this action".to_string()
            } else {
                a.results
                    .iter()
                    .map(|r| {
                        format!(
                            "<result name=\"{}\" source=\"{}\">\n{}\n</result>",
                            r.metadata.name, r.metadata.source, r.text
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            format!(
                "<action name=\"{}\" params=\"{}\" description=\"{}\">\n{}\n</action>",
                a.name, a.parameters, a.description, results
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Plan for Planner {
    async fn plan(&self, state: &ConversationState) -> Result<PlanResult, AgentError> {
        let messages = vec![Message::system(Self::system_prompt(state))];
        let reply = complete_json(
            self.llm.as_ref(),
            STAGE,
            &messages,
            &CompletionOptions::json(ModelHint::Default),
        )
        .await?;
        let plan = PlanResult::parse(Value::Object(reply))?;
        tracing::info!(tool = ?plan.tool, query = %plan.query, "plan");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::MockLlmClient;
    use crate::memory::{Action, Document};
    use crate::tools::ToolRegistry;

    fn state() -> ConversationState {
        ConversationState::new("c", Arc::new(ToolRegistry::default_catalog()), 5)
            .with_messages(vec![Message::user("Pobierz notatki z centrali")])
    }

    #[test]
    fn test_parse_reasoning_aliases() {
        let plan = PlanResult::parse(json!({ "_thinking": "t", "tool": "download_files", "query": "q" })).unwrap();
        assert_eq!(plan.reasoning, "t");
        assert_eq!(plan.next_tool(), Some("download_files"));

        let plan = PlanResult::parse(json!({ "reasoning": "done", "tool": "final_answer" })).unwrap();
        assert_eq!(plan.reasoning, "done");
        assert_eq!(plan.next_tool(), None);

        assert_eq!(PlanResult::parse(json!({ "tool": null })).unwrap().next_tool(), None);
        assert!(PlanResult::parse(json!({ "tool": 7 })).is_err());
    }

    #[test]
    fn test_prompt_includes_history() {
        let mut s = state();
        let doc = Document::new("[\"q1\"]", "c").name("notes.json").source("https://c.example/notes.json").build();
        s.record_action(Action::new("download_files", &json!({ "url": ["x"] }), "get notes", vec![], vec![doc]));
        let prompt = Planner::system_prompt(&s);
        assert!(prompt.contains("Pobierz notatki z centrali"));
        assert!(prompt.contains("download_files, send_answer_to_centrala"));
        assert!(prompt.contains("<result name=\"notes.json\" source=\"https://c.example/notes.json\">"));
        assert!(prompt.contains("[\"q1\"]"));
    }

    #[tokio::test]
    async fn test_non_json_reply_is_invalid() {
        let llm = Arc::new(MockLlmClient::scripted(vec!["I think we should download it"]));
        let err = Planner::new(llm).plan(&state()).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidLlmReply { stage: "plan", .. }));
    }

    #[tokio::test]
    async fn test_plan_requests_json_mode() {
        let llm = Arc::new(MockLlmClient::scripted(vec![
            r#"{"_reasoning": "need data", "tool": "download_files", "query": "download notes"}"#,
        ]));
        let plan = Planner::new(llm.clone()).plan(&state()).await.unwrap();
        assert_eq!(plan.query, "download notes");
        assert!(llm.calls()[0].json_mode);
    }
}
