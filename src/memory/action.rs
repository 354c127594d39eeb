//! Action：一次已完成的工具调用记录

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::memory::Document;

/// 工具调用记录；追加进 action log 后不再修改，顺序即 Planner 看到的历史顺序
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Action {
    pub uuid: Uuid,
    pub name: String,
    /// describe 阶段产出的参数（JSON 字符串）
    pub parameters: String,
    pub description: String,
    pub tool_uuid: String,
    /// 交给工具的上下文文档 uuid
    #[serde(default)]
    pub context_uuids: Vec<Uuid>,
    pub results: Vec<Document>,
}

impl Action {
    pub fn new(
        name: impl Into<String>,
        parameters: &serde_json::Value,
        description: impl Into<String>,
        context_uuids: Vec<Uuid>,
        results: Vec<Document>,
    ) -> Self {
        let name = name.into();
        Self {
            uuid: Uuid::new_v4(),
            tool_uuid: name.clone(),
            name,
            parameters: parameters.to_string(),
            description: description.into(),
            context_uuids,
            results,
        }
    }
}
