//! Drone - plan → describe → act → observe 任务型智能体
//!
//! 模块划分：
//! - **agent**: 无头运行时（会话状态工厂 + 一次完整运行）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、会话状态、组件构建
//! - **integrations**: 任务服务器（Centrala）客户端
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）与 JSON 回复解析
//! - **memory**: Message / Document / Action 数据模型
//! - **react**: Planner、参数生成、上下文筛选、答案生成与状态机主循环
//! - **tools**: 工具目录、执行器与各工具实现

pub mod agent;
pub mod config;
pub mod core;
pub mod integrations;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod tools;

pub use crate::agent::{new_conversation, process_message, run_agent, AgentRun};
pub use crate::core::{AgentBuilder, AgentComponents, AgentError, ConversationState};
