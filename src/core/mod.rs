//! 核心层：错误类型、会话状态与组件构建

pub mod builder;
pub mod error;
pub mod state;

pub use builder::{create_llm_from_config, AgentBuilder, AgentComponents};
pub use error::AgentError;
pub use state::{ActiveStep, ConversationState, StateConfig};
