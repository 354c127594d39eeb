//! 工具注册表
//!
//! 静态目录：每个工具的名称、描述（供 Planner 理解）、参数模板（JSON）与使用说明（供 describe 阶段生成参数）。
//! 进程启动时固定，之后只读；ConversationState 通过 Arc 共享同一份。

use serde::Serialize;
use serde_json::json;

use crate::tools::ToolKind;

/// 工具描述符
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// 参数模板（JSON 字符串），describe 阶段要求 LLM 按此结构输出
    pub parameters: String,
    pub instruction: String,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: parameters.to_string(),
            instruction: instruction.into(),
        }
    }
}

/// 工具目录
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self { tools }
    }

    /// 默认目录：下载、提交答案、图片描述、文件操作、关键词检索，以及 final_answer 终止标记
    pub fn default_catalog() -> Self {
        Self::new(vec![
            ToolDescriptor::new(
                ToolKind::DownloadFiles.name(),
                "Use this tool to download files from the task server by url",
                json!({ "url": ["url of the file to download"] }),
                DOWNLOAD_FILES_INSTRUCTION,
            ),
            ToolDescriptor::new(
                ToolKind::SendAnswer.name(),
                "Use this tool to send an answer to the task server (centrala) only when you need to contact it",
                json!({
                    "task": "name of a task",
                    "paramName": "answer",
                    "response": "value sent under the paramName key",
                    "url": "verify"
                }),
                SEND_ANSWER_INSTRUCTION,
            ),
            ToolDescriptor::new(
                ToolKind::DescribeImage.name(),
                "Use this tool to read text from an image or describe it when there is no text",
                json!({
                    "filePath": "path to the image",
                    "context": "hints that help reading the image: what to look for, expected content"
                }),
                DESCRIBE_IMAGE_INSTRUCTION,
            ),
            ToolDescriptor::new(
                ToolKind::FileOperations.name(),
                "Use this tool to list directories or read file contents from the workspace",
                json!({ "operation": "list or read", "path": "relative path from workspace root" }),
                FILE_OPERATIONS_INSTRUCTION,
            ),
            ToolDescriptor::new(
                ToolKind::DatabaseSearch.name(),
                "Use this tool to search the local knowledge database by keywords",
                json!({ "keywords": ["keyword"] }),
                DATABASE_INSTRUCTION,
            ),
            ToolDescriptor::new(
                ToolKind::FinalAnswer.name(),
                "Use this tool to write a message to the user",
                json!({ "answer": "detailed response" }),
                "Use when the collected information is sufficient or user input is needed.",
            ),
        ])
    }

    pub fn list_tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }
}

const DOWNLOAD_FILES_INSTRUCTION: &str = r#"Extract every URL of a file to download from the query and the conversation.
<rules>
- keep each URL exactly as written, including query parameters
- return http and https URLs, skip malformed ones
- always return a list, even for a single URL
</rules>
Example: {"url": ["https://example.com/data/notes.json"]}"#;

const SEND_ANSWER_INSTRUCTION: &str = r#"Prepare a submission for the task server.
<rules>
- use the task name exactly as given in the task description
- paramName is "answer" unless the task says otherwise
- response holds the complete answer; it may be a string, list or object
- url is the endpoint suffix, usually "verify" or "report"
</rules>
Example: {"task": "CENZURA", "paramName": "answer", "response": "text", "url": "verify"}"#;

const DESCRIBE_IMAGE_INSTRUCTION: &str = r#"Point the vision tool at an image file.
<rules>
- filePath is the image path as mentioned by the user or returned by earlier tools
- context says what to focus on: text to extract, objects, expected format
</rules>
Example: {"filePath": "data/agent/page19.png", "context": "extract all visible text"}"#;

const FILE_OPERATIONS_INSTRUCTION: &str = r#"List a directory or read files relative to the workspace root.
<rules>
- operation is "list" or "read"
- path is a single relative path or a list of them
- read a file only after you know it exists
</rules>
Examples: {"operation": "list", "path": "data"}
{"operation": "read", "path": ["data/agent/notes.txt"]}"#;

const DATABASE_INSTRUCTION: &str = r#"Search the database with a short list of keywords.
<rules>
- return 3-9 keywords describing the search intent
- no SQL, no full sentences
</rules>
Example: {"keywords": ["sales", "total", "March 2024"]}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_resolves() {
        let registry = ToolRegistry::default_catalog();
        for tool in registry.list_tools() {
            let kind = ToolKind::from_name(&tool.name);
            assert!(kind.is_some(), "{} has no tool kind", tool.name);
            assert!(serde_json::from_str::<serde_json::Value>(&tool.parameters).is_ok());
        }
        assert!(registry.contains("final_answer"));
        assert!(registry.find("web_search").is_none());
    }
}
