//! LLM 客户端抽象
//!
//! 编排核心把语言模型当作黑盒：complete(messages, options) -> text。
//! json_mode 打开时调用方期望得到单个可解析的 JSON 对象，违反约定由上层转成 AgentError。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Message;

/// 模型档位：Default 对应主模型（规划、参数、答案），Mini 对应轻量模型（上下文筛选）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelHint {
    #[default]
    Default,
    Mini,
}

/// 单次调用选项
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub model: ModelHint,
    /// 未设置时使用客户端配置的温度
    pub temperature: Option<f32>,
    pub json_mode: bool,
}

impl CompletionOptions {
    pub fn text(model: ModelHint) -> Self {
        Self {
            model,
            ..Default::default()
        }
    }

    pub fn json(model: ModelHint) -> Self {
        Self {
            model,
            json_mode: true,
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("empty response")]
    EmptyResponse,
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
