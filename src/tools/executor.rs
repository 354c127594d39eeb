//! 工具执行器
//!
//! 按 ToolKind 持有各工具实例与统一超时。resolve 对未知或不可执行的工具名直接报错；
//! execute 在超时内调用工具，超时转成 error Document，空结果补一条说明文档；每次调用输出结构化审计日志（JSON）。
//! use_tool 在此基础上把结果写入 ConversationState（先文档、后 Action）。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::time::timeout;

use crate::core::{AgentError, ConversationState};
use crate::memory::{Action, Document};
use crate::tools::{Tool, ToolInput, ToolKind};

pub struct ToolExecutor {
    tools: HashMap<ToolKind, Arc<dyn Tool>>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            tools: HashMap::new(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.kind(), Arc::new(tool));
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    /// 名称 -> 已注册的可执行工具；其余情况一律 UnknownTool
    pub fn resolve(&self, tool_name: &str) -> Result<Arc<dyn Tool>, AgentError> {
        ToolKind::from_name(tool_name)
            .filter(ToolKind::is_executable)
            .and_then(|kind| self.tools.get(&kind).cloned())
            .ok_or_else(|| AgentError::UnknownTool(tool_name.to_string()))
    }

    pub fn can_execute(&self, tool_name: &str) -> bool {
        self.resolve(tool_name).is_ok()
    }

    /// 执行指定工具；只有工具名无法解析时返回 Err
    pub async fn execute(&self, tool_name: &str, input: ToolInput<'_>) -> Result<Vec<Document>, AgentError> {
        let tool = self.resolve(tool_name)?;
        let start = Instant::now();
        let result = timeout(self.timeout, tool.execute(input)).await;

        let timed_out = result.is_err();
        let mut docs = match result {
            Ok(docs) => docs,
            Err(_) => vec![Document::error(
                format!("Tool {} timed out after {}s", tool_name, self.timeout.as_secs()),
                input.conversation_id,
            )
            .source(tool_name)
            .description("Tool timeout")
            .build()],
        };
        if docs.is_empty() {
            docs.push(
                Document::new(format!("Tool {} returned no results", tool_name), input.conversation_id)
                    .name(format!("{}_empty", tool_name))
                    .source(tool_name)
                    .description("Empty tool result")
                    .build(),
            );
        }

        let errors = docs.iter().filter(|d| d.is_error()).count();
        let outcome = if timed_out {
            "timeout"
        } else if errors == docs.len() {
            "error"
        } else {
            "ok"
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "conversation": input.conversation_id,
            "outcome": outcome,
            "documents": docs.len(),
            "error_documents": errors,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(input.parameters),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        Ok(docs)
    }

    /// 执行工具并记录到会话状态：产出文档追加到文档集合，再追加一条 Action
    pub async fn use_tool(
        &self,
        state: &mut ConversationState,
        tool_name: &str,
        parameters: &Value,
        context: &[Document],
    ) -> Result<(), AgentError> {
        let conversation_id = state.conversation_id.clone();
        let docs = self
            .execute(
                tool_name,
                ToolInput {
                    parameters,
                    context,
                    conversation_id: &conversation_id,
                },
            )
            .await?;
        let description = state
            .config
            .active_step
            .as_ref()
            .map(|s| s.query.clone())
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| format!("{} call", tool_name));
        let context_uuids = context.iter().map(Document::uuid).collect();
        state.record_action(Action::new(tool_name, parameters, description, context_uuids, docs));
        Ok(())
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::tools::ToolRegistry;

    struct StaticTool {
        kind: ToolKind,
        docs: usize,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl Tool for StaticTool {
        fn kind(&self) -> ToolKind {
            self.kind
        }

        async fn execute(&self, input: ToolInput<'_>) -> Vec<Document> {
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            (0..self.docs)
                .map(|i| Document::new(format!("doc {i}"), input.conversation_id).build())
                .collect()
        }
    }

    fn state() -> ConversationState {
        ConversationState::new("conv-1", Arc::new(ToolRegistry::default_catalog()), 5)
    }

    #[test]
    fn test_resolve_fails_closed() {
        let executor = ToolExecutor::new(5).with_tool(StaticTool {
            kind: ToolKind::FileOperations,
            docs: 1,
            delay: None,
        });
        assert!(executor.can_execute("file_operations"));
        assert!(matches!(executor.resolve("web_search"), Err(AgentError::UnknownTool(_))));
        assert!(matches!(executor.resolve("final_answer"), Err(AgentError::UnknownTool(_))));
        // 名称合法但没有注册实例
        assert!(matches!(executor.resolve("download_files"), Err(AgentError::UnknownTool(_))));
    }

    #[tokio::test]
    async fn test_use_tool_appends_one_action() {
        let executor = ToolExecutor::new(5).with_tool(StaticTool {
            kind: ToolKind::FileOperations,
            docs: 2,
            delay: None,
        });
        let mut state = state();
        let params = json!({ "operation": "list", "path": "." });
        executor.use_tool(&mut state, "file_operations", &params, &[]).await.unwrap();
        assert_eq!(state.actions().len(), 1);
        assert_eq!(state.actions()[0].results.len(), 2);
        assert_eq!(state.actions()[0].parameters, params.to_string());
        assert_eq!(state.documents().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_result_is_normalized() {
        let executor = ToolExecutor::new(5).with_tool(StaticTool {
            kind: ToolKind::DatabaseSearch,
            docs: 0,
            delay: None,
        });
        let mut state = state();
        executor
            .use_tool(&mut state, "database_search", &json!({ "keywords": ["x"] }), &[])
            .await
            .unwrap();
        let results = &state.actions()[0].results;
        assert_eq!(results.len(), 1);
        assert!(!results[0].is_error());
    }

    #[tokio::test]
    async fn test_timeout_becomes_error_document() {
        let executor = ToolExecutor {
            tools: HashMap::new(),
            timeout: Duration::from_millis(20),
        }
        .with_tool(StaticTool {
            kind: ToolKind::DownloadFiles,
            docs: 1,
            delay: Some(Duration::from_secs(5)),
        });
        let params = json!({});
        let docs = executor
            .execute("download_files", ToolInput { parameters: &params, context: &[], conversation_id: "c" })
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].is_error());
        assert!(docs[0].text.contains("timed out"));
    }
}
