//! JSON 回复解析
//!
//! 从 LLM 文本中提取 JSON 对象（兼容 ```json 代码块与前后多余文字），解析失败统一转为 InvalidLlmReply。

use serde_json::{Map, Value};

use crate::core::AgentError;
use crate::llm::{CompletionOptions, LlmClient};
use crate::memory::Message;

/// 取出回复中的 JSON 片段
fn extract_json(output: &str) -> &str {
    let trimmed = output.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim());
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// 解析为 JSON 对象；非 JSON 或非对象都视为协作方格式错误
pub fn parse_json_object(stage: &'static str, output: &str) -> Result<Map<String, Value>, AgentError> {
    let json_str = extract_json(output);
    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| AgentError::invalid_reply(stage, format!("{}: {}", e, json_str)))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(AgentError::invalid_reply(
            stage,
            format!("expected a JSON object, got: {}", other),
        )),
    }
}

/// 以 json_mode 调用 LLM 并解析为对象
pub async fn complete_json(
    llm: &dyn LlmClient,
    stage: &'static str,
    messages: &[Message],
    options: &CompletionOptions,
) -> Result<Map<String, Value>, AgentError> {
    let options = CompletionOptions {
        json_mode: true,
        ..options.clone()
    };
    let output = llm.complete(messages, &options).await?;
    tracing::debug!(stage, output = %output, "llm json reply");
    parse_json_object(stage, &output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_object() {
        let map = parse_json_object("plan", r#"{"tool": "final_answer"}"#).unwrap();
        assert_eq!(map["tool"], "final_answer");
    }

    #[test]
    fn test_fenced_and_chatty() {
        let out = "Sure!\n```json\n{\"uuids\": []}\n```\nthanks";
        assert!(parse_json_object("context", out).unwrap()["uuids"].is_array());
        let out = "Here you go: {\"a\": 1} done";
        assert_eq!(parse_json_object("describe", out).unwrap()["a"], 1);
    }

    #[test]
    fn test_not_json_is_error() {
        let err = parse_json_object("plan", "I think we should download").unwrap_err();
        assert!(matches!(err, AgentError::InvalidLlmReply { stage: "plan", .. }));
    }

    #[test]
    fn test_array_is_error() {
        assert!(parse_json_object("describe", "[1, 2]").is_err());
    }
}
