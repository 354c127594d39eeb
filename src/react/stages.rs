//! 循环各阶段的抽象
//!
//! AgentLoop 只依赖这些 trait，生产实现由 LLM 驱动，测试可注入假实现。

use async_trait::async_trait;
use serde_json::Value;

use crate::core::{AgentError, ConversationState};
use crate::memory::Document;
use crate::react::{ParameterResult, PlanResult};
use crate::tools::ToolExecutor;

#[async_trait]
pub trait Plan: Send + Sync {
    async fn plan(&self, state: &ConversationState) -> Result<PlanResult, AgentError>;
}

#[async_trait]
pub trait Describe: Send + Sync {
    async fn describe(
        &self,
        tool: &str,
        query: &str,
        state: &ConversationState,
    ) -> Result<ParameterResult, AgentError>;
}

#[async_trait]
pub trait SelectContext: Send + Sync {
    async fn select_context(
        &self,
        tool: &str,
        query: &str,
        parameters: &ParameterResult,
        state: &ConversationState,
    ) -> Result<Vec<Document>, AgentError>;
}

#[async_trait]
pub trait UseTool: Send + Sync {
    async fn use_tool(
        &self,
        state: &mut ConversationState,
        tool: &str,
        parameters: &Value,
        context: &[Document],
    ) -> Result<(), AgentError>;
}

#[async_trait]
pub trait Answer: Send + Sync {
    async fn answer(&self, state: &ConversationState) -> Result<String, AgentError>;
}

#[async_trait]
impl UseTool for ToolExecutor {
    async fn use_tool(
        &self,
        state: &mut ConversationState,
        tool: &str,
        parameters: &Value,
        context: &[Document],
    ) -> Result<(), AgentError> {
        ToolExecutor::use_tool(self, state, tool, parameters, context).await
    }
}
