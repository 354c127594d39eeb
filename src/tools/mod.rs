//! 工具层：静态注册表、工具种类（sum type）与统一执行入口
//!
//! 所有可执行工具实现 Tool trait；ToolExecutor 按 ToolKind 分发，未知名称直接报错（fail closed）。
//! 工具自身从不返回 Err：失败被编码为 content_type=error 的 Document。

pub mod database;
pub mod describe_image;
pub mod downloader;
pub mod executor;
pub mod filesystem;
pub mod registry;
pub mod send_answer;

use async_trait::async_trait;
use serde_json::Value;

use crate::memory::Document;

pub use database::{DatabaseSearchTool, KeywordStore};
pub use describe_image::DescribeImageTool;
pub use downloader::DownloadTool;
pub use executor::ToolExecutor;
pub use filesystem::{FileOperationsTool, SafeFs};
pub use registry::{ToolDescriptor, ToolRegistry};
pub use send_answer::SendAnswerTool;

/// Planner 用来表示「结束，生成答案」的工具名
pub const FINAL_ANSWER: &str = "final_answer";

/// 工具种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    DownloadFiles,
    SendAnswer,
    DescribeImage,
    FileOperations,
    DatabaseSearch,
    /// 终止标记，由编排循环处理，从不派发给执行器
    FinalAnswer,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::DownloadFiles,
        ToolKind::SendAnswer,
        ToolKind::DescribeImage,
        ToolKind::FileOperations,
        ToolKind::DatabaseSearch,
        ToolKind::FinalAnswer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::DownloadFiles => "download_files",
            ToolKind::SendAnswer => "send_answer_to_centrala",
            ToolKind::DescribeImage => "describe_image",
            ToolKind::FileOperations => "file_operations",
            ToolKind::DatabaseSearch => "database_search",
            ToolKind::FinalAnswer => FINAL_ANSWER,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn is_executable(&self) -> bool {
        !matches!(self, ToolKind::FinalAnswer)
    }
}

/// 单次工具调用的输入
#[derive(Debug, Clone, Copy)]
pub struct ToolInput<'a> {
    pub parameters: &'a Value,
    /// 上下文筛选阶段选出的文档
    pub context: &'a [Document],
    pub conversation_id: &'a str,
}

impl ToolInput<'_> {
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// 取字符串列表参数；单个字符串视为只有一项的列表
    pub fn list_param(&self, key: &str) -> Vec<String> {
        match self.parameters.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// 上下文文档拼成一段文本，供工具内部的 LLM 调用使用
    pub fn context_text(&self) -> String {
        self.context
            .iter()
            .map(|d| format!("<document name=\"{}\">\n{}\n</document>", d.metadata.name, d.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// 工具 trait：种类 + 异步执行（失败编码为 error Document，不返回 Err）
#[async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    async fn execute(&self, input: ToolInput<'_>) -> Vec<Document>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_round_trip_names() {
        assert_eq!(ToolKind::from_name("download_files"), Some(ToolKind::DownloadFiles));
        assert_eq!(ToolKind::from_name("final_answer"), Some(ToolKind::FinalAnswer));
        assert_eq!(ToolKind::from_name("web_search"), None);
        assert!(!ToolKind::FinalAnswer.is_executable());
    }

    fn input(parameters: &Value) -> ToolInput<'_> {
        ToolInput { parameters, context: &[], conversation_id: "c" }
    }

    #[test]
    fn test_list_param_accepts_string_or_array() {
        let single = json!({ "path": "data" });
        let many = json!({ "path": ["a.txt", " ", "b.txt", 3] });
        assert_eq!(input(&single).list_param("path"), vec!["data"]);
        assert_eq!(input(&many).list_param("path"), vec!["a.txt", "b.txt"]);
        assert!(input(&single).list_param("missing").is_empty());
    }
}
