//! send_answer_to_centrala 工具：把答案提交给任务服务器，应答（含 4xx 的错误说明）作为观察结果返回

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::integrations::centrala::{last_segment, CentralaApi};
use crate::memory::Document;
use crate::tools::{Tool, ToolInput, ToolKind};

pub struct SendAnswerTool {
    api: Arc<dyn CentralaApi>,
}

impl SendAnswerTool {
    pub fn new(api: Arc<dyn CentralaApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for SendAnswerTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SendAnswer
    }

    async fn execute(&self, input: ToolInput<'_>) -> Vec<Document> {
        let conversation_id = input.conversation_id;
        let task = input.str_param("task").unwrap_or("");
        let param_name = input.str_param("paramName").unwrap_or("answer");
        let suffix = input
            .str_param("url")
            .and_then(last_segment)
            .unwrap_or("verify");
        let Some(response) = input.parameters.get("response").filter(|v| !v.is_null()).cloned() else {
            return vec![Document::error(
                format!("Missing required parameter: response, current parameters: {}", input.parameters),
                conversation_id,
            )
            .source("SendAnswerTool")
            .description("Parameter validation error")
            .build()];
        };
        tracing::info!(task = %task, param = %param_name, suffix = %suffix, "send_answer_to_centrala tool execute");

        let doc = match self.api.submit(task, param_name, response, suffix).await {
            Ok(reply) => {
                let text = serde_json::to_string(&reply).unwrap_or_else(|_| reply.message.to_string());
                Document::new(text, conversation_id)
                    .name(format!("centrala_response_{}", task))
                    .source("centrala")
                    .mime_type("application/json")
                    .description(format!("Task server response for task {}", task))
                    .build()
            }
            Err(e) => Document::error(format!("Error sending answer to centrala: {}", e), conversation_id)
                .name(format!("centrala_response_{}", task))
                .source("centrala")
                .description("Task server error")
                .build(),
        };
        vec![doc]
    }
}
