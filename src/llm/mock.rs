//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 两种模式：按顺序返回脚本化回复，或由闭包根据消息决定回复；所有调用都会被记录，便于断言。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{CompletionOptions, LlmClient, LlmError};
use crate::memory::Message;

type Responder = Box<dyn Fn(&[Message], &CompletionOptions) -> Result<String, LlmError> + Send + Sync>;

/// 一次被记录的调用
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub json_mode: bool,
    pub temperature: Option<f32>,
}

/// 脚本耗尽后的默认回复：直接给出 final_answer
const FALLBACK_REPLY: &str = r#"{"_reasoning": "mock", "tool": "final_answer", "query": ""}"#;

pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    responder: Option<Responder>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::scripted(Vec::<String>::new())
    }
}

impl MockLlmClient {
    /// 按顺序返回给定回复
    pub fn scripted<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            responder: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 由闭包决定每次回复
    pub fn from_fn(
        f: impl Fn(&[Message], &CompletionOptions) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            responder: Some(Box::new(f)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 在脚本末尾追加一次失败
    pub fn then_fail(self, err: LlmError) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(err));
        }
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                messages: messages.to_vec(),
                json_mode: options.json_mode,
                temperature: options.temperature,
            });
        }
        if let Some(f) = &self.responder {
            return f(messages, options);
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or_else(|| Ok(FALLBACK_REPLY.to_string()))
    }
}
