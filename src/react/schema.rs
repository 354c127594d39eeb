//! 阶段回复的 JSON Schema（schemars 自动生成）
//!
//! 拼入 system prompt，约束 LLM 的输出结构；解析端仍由各阶段在调用后立即校验。

use schemars::{schema_for, JsonSchema};

/// Planner 回复格式（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct PlanFormat {
    /// 为什么这是最合适的下一步
    _reasoning: String,
    /// 可用工具之一，或 final_answer
    tool: String,
    /// 这一步要做什么，包含执行所需的全部上下文
    query: String,
}

/// 上下文筛选回复格式
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ContextFormat {
    /// 选择这些文档的理由
    _reasoning: String,
    /// 选中文档的 uuid，可以为空列表
    uuids: Vec<String>,
}

fn to_json<T: JsonSchema>() -> String {
    let schema = schema_for!(T);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

pub fn plan_schema_json() -> String {
    to_json::<PlanFormat>()
}

pub fn context_schema_json() -> String {
    to_json::<ContextFormat>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemas_name_required_fields() {
        let plan: serde_json::Value = serde_json::from_str(&plan_schema_json()).unwrap();
        let required = plan["required"].as_array().unwrap();
        assert!(required.iter().any(|f| f == "tool"));
        assert!(required.iter().any(|f| f == "query"));

        let ctx: serde_json::Value = serde_json::from_str(&context_schema_json()).unwrap();
        assert_eq!(ctx["properties"]["uuids"]["type"], "array");
    }
}
