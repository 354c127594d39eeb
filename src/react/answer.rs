//! 答案生成：以全部工具结果为上下文，结合当前步骤的查询与对话历史生成最终回复

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{AgentError, ConversationState};
use crate::llm::{CompletionOptions, LlmClient, ModelHint};
use crate::memory::{Document, Message};
use crate::react::stages::Answer;

pub struct AnswerSynthesizer {
    llm: Arc<dyn LlmClient>,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub fn system_prompt(state: &ConversationState) -> String {
        let results: Vec<&Document> = state.action_results().collect();
        let query = state
            .config
            .active_step
            .as_ref()
            .map(|s| s.query.as_str())
            .unwrap_or("");
        let unavailable = results.iter().all(|d| d.is_error());
        let context = if results.is_empty() {
            "No documents were collected.".to_string()
        } else {
            results
                .iter()
                .map(|d| {
                    format!(
                        "<document name=\"{}\" source=\"{}\" content_type=\"{}\">\n{}\n</document>",
                        d.metadata.name,
                        d.metadata.source,
                        d.metadata.content_type.as_str(),
                        d.text
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };
        let availability = if unavailable {
            "\n- none of the tools returned usable information: say plainly that the information was unavailable and, if errors are listed, mention what failed"
        } else {
            ""
        };
        format!(
            r#"Answer the user using the information gathered so far.

<rules>
- base the answer on the documents below and the conversation
- quote exact values (names, numbers, flags) as they appear in the documents
- answer in the language of the user's last message
- do not invent facts that are missing from the documents{availability}
</rules>

<current_step>{query}</current_step>

<documents>
{context}
</documents>"#
        )
    }
}

#[async_trait]
impl Answer for AnswerSynthesizer {
    async fn answer(&self, state: &ConversationState) -> Result<String, AgentError> {
        let mut messages = vec![Message::system(Self::system_prompt(state))];
        messages.extend(state.messages().iter().cloned());
        let answer = self
            .llm
            .complete(&messages, &CompletionOptions::text(ModelHint::Default))
            .await?;
        tracing::info!(chars = answer.chars().count(), "answer generated");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::core::ActiveStep;
    use crate::llm::{LlmError, MockLlmClient};
    use crate::memory::Action;
    use crate::tools::ToolRegistry;

    fn state() -> ConversationState {
        ConversationState::new("c", Arc::new(ToolRegistry::default_catalog()), 5)
            .with_messages(vec![Message::user("What is the flag?")])
    }

    #[test]
    fn test_prompt_marks_unavailable_information() {
        let mut s = state();
        assert!(AnswerSynthesizer::system_prompt(&s).contains("information was unavailable"));

        s.record_action(Action::new(
            "download_files",
            &json!({}),
            "get",
            vec![],
            vec![Document::error("HTTP 404", "c").build()],
        ));
        let prompt = AnswerSynthesizer::system_prompt(&s);
        assert!(prompt.contains("information was unavailable"));
        assert!(prompt.contains("HTTP 404"));

        s.config.active_step = Some(ActiveStep {
            name: "final_answer".into(),
            query: "report the flag".into(),
        });
        s.record_action(Action::new(
            "send_answer_to_centrala",
            &json!({}),
            "send",
            vec![],
            vec![Document::new("{FLG:BANAN}", "c").build()],
        ));
        let prompt = AnswerSynthesizer::system_prompt(&s);
        assert!(!prompt.contains("information was unavailable"));
        assert!(prompt.contains("<current_step>report the flag</current_step>"));
    }

    #[tokio::test]
    async fn test_answer_sends_history() {
        let llm = Arc::new(MockLlmClient::scripted(vec!["The flag is unknown."]));
        let answer = AnswerSynthesizer::new(llm.clone()).answer(&state()).await.unwrap();
        assert_eq!(answer, "The flag is unknown.");
        let call = &llm.calls()[0];
        assert!(!call.json_mode);
        assert_eq!(call.messages.len(), 2);
        assert_eq!(call.messages[1].content, "What is the flag?");
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let llm = Arc::new(MockLlmClient::default().then_fail(LlmError::Request("503".into())));
        let err = AnswerSynthesizer::new(llm).answer(&state()).await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(_)));
    }
}
