//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；ModelHint 映射到主模型 / 轻量模型，
//! json_mode 时使用 response_format=json_object，带图片的 user 消息转为多段 content。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestMessageContentPartImageArgs, ChatCompletionRequestMessageContentPartTextArgs,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
    ImageUrlArgs, ResponseFormat,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::{CompletionOptions, LlmClient, LlmError, ModelHint};
use crate::memory::{Message, Role};

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// OpenAI 兼容客户端：持有 Client 与两档模型名
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    mini_model: String,
    /// 未在 CompletionOptions 指定时使用的温度
    temperature: Option<f32>,
    request_timeout: Duration,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, mini_model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            mini_model: mini_model.to_string(),
            temperature: None,
            request_timeout: Duration::from_secs(60),
            usage: TokenUsage::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.request_timeout = Duration::from_secs(secs);
        self
    }

    fn model_for(&self, hint: ModelHint) -> &str {
        match hint {
            ModelHint::Default => &self.model,
            ModelHint::Mini => &self.mini_model,
        }
    }

    fn to_openai_message(m: &Message) -> Result<ChatCompletionRequestMessage, LlmError> {
        let invalid = |e: async_openai::error::OpenAIError| LlmError::InvalidRequest(e.to_string());
        let msg = match m.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(m.content.clone())
                .build()
                .map_err(invalid)?
                .into(),
            Role::User if !m.images.is_empty() => {
                let mut parts: Vec<ChatCompletionRequestUserMessageContentPart> = Vec::new();
                for url in &m.images {
                    let image_url = ImageUrlArgs::default()
                        .url(url.clone())
                        .detail(ImageDetail::High)
                        .build()
                        .map_err(invalid)?;
                    parts.push(
                        ChatCompletionRequestMessageContentPartImageArgs::default()
                            .image_url(image_url)
                            .build()
                            .map_err(invalid)?
                            .into(),
                    );
                }
                parts.push(
                    ChatCompletionRequestMessageContentPartTextArgs::default()
                        .text(m.content.clone())
                        .build()
                        .map_err(invalid)?
                        .into(),
                );
                ChatCompletionRequestUserMessageArgs::default()
                    .content(parts)
                    .build()
                    .map_err(invalid)?
                    .into()
            }
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(m.content.clone())
                .build()
                .map_err(invalid)?
                .into(),
            Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(m.content.clone())
                .build()
                .map_err(invalid)?
                .into(),
        };
        Ok(msg)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let messages = messages
            .iter()
            .map(Self::to_openai_message)
            .collect::<Result<Vec<_>, _>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model_for(options.model)).messages(messages);
        if let Some(t) = options.temperature.or(self.temperature) {
            args.temperature(t);
        }
        if options.json_mode {
            args.response_format(ResponseFormat::JsonObject);
        }
        let request = args
            .build()
            .map_err(|e| LlmError::InvalidRequest(e.to_string()))?;

        let response = tokio::time::timeout(self.request_timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                LlmError::Request(format!("timed out after {}s", self.request_timeout.as_secs()))
            })?
            .map_err(|e| LlmError::Request(e.to_string()))?;

        // 提取 token 使用统计
        if let Some(usage) = &response.usage {
            self.usage.add(
                usage.prompt_tokens as u64,
                usage.completion_tokens as u64,
            );
        }

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}
