//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）与 JSON 回复解析

pub mod json;
pub mod mock;
pub mod openai;
pub mod traits;

pub use json::{complete_json, parse_json_object};
pub use mock::{MockLlmClient, RecordedCall};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{CompletionOptions, LlmClient, LlmError, ModelHint};
