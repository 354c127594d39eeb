//! Agent 错误类型
//!
//! 协作方格式错误（LLM 未按约定返回 JSON）与校验错误（未知工具、缺少 uuids）对本次运行是致命的；
//! 工具执行失败不走这里，而是在工具边界转成 content_type=error 的 Document。

use thiserror::Error;

use crate::llm::LlmError;

/// 编排循环中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM 调用本身失败（网络、鉴权、限流等）
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// LLM 回复不是约定的 JSON 结构
    #[error("Invalid LLM reply in {stage}: {detail}")]
    InvalidLlmReply { stage: &'static str, detail: String },

    /// describe 阶段请求了注册表中不存在的工具
    #[error("Tool {0} not found")]
    ToolNotFound(String),

    /// Planner 选择了注册表外的工具（或不可执行的工具）
    #[error("Hallucinated tool: {0}")]
    UnknownTool(String),

    #[error("LLM did not return uuids array")]
    MissingUuids,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Path escape attempt: {0}")]
    PathEscape(String),

    #[error("Path does not exist: {0}")]
    PathNotFound(String),
}

impl AgentError {
    pub(crate) fn invalid_reply(stage: &'static str, detail: impl Into<String>) -> Self {
        AgentError::InvalidLlmReply {
            stage,
            detail: detail.into(),
        }
    }
}
