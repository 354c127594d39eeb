//! 编排过程事件：供 CLI / HTTP 前端展示规划、参数、上下文与观察结果

use serde::Serialize;

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// 进入第几步
    StepUpdate { step: usize, max_steps: usize },
    /// Planner 的决定
    Plan {
        reasoning: String,
        tool: Option<String>,
        query: String,
    },
    /// describe 阶段生成的参数
    Parameters {
        tool: String,
        parameters: serde_json::Value,
    },
    /// 交给工具的上下文文档
    ContextSelected { tool: String, uuids: Vec<String> },
    /// 工具返回（预览）
    Observation {
        tool: String,
        documents: usize,
        errors: usize,
        preview: String,
    },
    /// 最终答案
    Answer { text: String },
    Error { text: String },
}
