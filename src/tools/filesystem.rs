//! 沙箱文件系统与 file_operations 工具
//!
//! SafeFs 绑定 root_dir，所有路径经 resolve 校验必须在 root 下（禁止 ../ 逃逸）；
//! FileOperationsTool 基于 SafeFs 提供 list / read，每个路径独立产出一个 Document（失败为 error 文档）。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::AgentError;
use crate::memory::Document;
use crate::tools::{Tool, ToolInput, ToolKind};

/// 沙箱文件系统：绑定根目录，resolve 校验路径在根下，防止路径逃逸
#[derive(Debug, Clone)]
pub struct SafeFs {
    root_dir: PathBuf,
}

/// 目录项（list 的输出）
#[derive(Debug, Clone, Serialize)]
pub struct DirEntryInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub size: Option<u64>,
    pub modified: Option<String>,
}

impl SafeFs {
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        let root = root_dir.as_ref().to_path_buf();
        let root_dir = root.canonicalize().unwrap_or(root);
        Self { root_dir }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// 检查路径是否在沙箱内
    pub fn resolve(&self, path: &str) -> Result<PathBuf, AgentError> {
        let path = path.trim_start_matches("./").trim_start_matches('/');
        if path.is_empty() || path == "." {
            return Ok(self.root_dir.clone());
        }
        let full = self.root_dir.join(path);
        let canonical = full
            .canonicalize()
            .map_err(|_| AgentError::PathNotFound(path.to_string()))?;
        let root_canon = self
            .root_dir
            .canonicalize()
            .unwrap_or_else(|_| self.root_dir.clone());
        if canonical.starts_with(root_canon) {
            Ok(canonical)
        } else {
            Err(AgentError::PathEscape(path.to_string())) // 如 ../../etc/passwd
        }
    }

    pub fn read_file(&self, path: &str) -> Result<String, String> {
        let resolved = self.resolve(path).map_err(|e| e.to_string())?;
        if !resolved.is_file() {
            return Err(format!("Path is not a file: {}", path));
        }
        std::fs::read_to_string(&resolved).map_err(|e| format!("Error reading file: {}", e))
    }

    pub fn list_dir(&self, path: &str) -> Result<Vec<DirEntryInfo>, String> {
        let base = self.resolve(path).map_err(|e| e.to_string())?;
        let mut entries = Vec::new();
        for e in std::fs::read_dir(&base).map_err(|e| format!("Error listing directory: {}", e))? {
            let e = e.map_err(|e| e.to_string())?;
            let name = e.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let meta = e.metadata().ok();
            let is_dir = meta.as_ref().map(|m| m.is_dir()).unwrap_or(false);
            entries.push(DirEntryInfo {
                name,
                kind: if is_dir { "directory" } else { "file" },
                size: meta.as_ref().filter(|m| m.is_file()).map(|m| m.len()),
                modified: meta
                    .and_then(|m| m.modified().ok())
                    .map(|t| DateTime::<Utc>::from(t).to_rfc3339()),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

/// file_operations 工具：{"operation": "list" | "read", "path": string | string[]}
pub struct FileOperationsTool {
    fs: SafeFs,
}

impl FileOperationsTool {
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        Self {
            fs: SafeFs::new(root_dir),
        }
    }

    fn list(&self, path: &str, conversation_id: &str) -> Document {
        match self.fs.list_dir(path) {
            Ok(entries) => {
                let text = serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string());
                Document::new(text, conversation_id)
                    .name(path)
                    .source(self.fs.root().join(path).display().to_string())
                    .mime_type("application/json")
                    .description(format!("Directory listing for: {}", path))
                    .build()
            }
            Err(e) => Document::error(e, conversation_id)
                .name(path)
                .source("FileOperationsTool")
                .description("Directory listing error")
                .build(),
        }
    }

    fn read(&self, path: &str, conversation_id: &str) -> Document {
        match self.fs.read_file(path) {
            Ok(content) => Document::new(content, conversation_id)
                .name(path)
                .source(self.fs.root().join(path).display().to_string())
                .mime_type(mime_guess::from_path(path).first_or_text_plain().to_string())
                .description(format!("File content for: {}", path))
                .build(),
            Err(e) => Document::error(e, conversation_id)
                .name(path)
                .source("FileOperationsTool")
                .description("File reading error")
                .build(),
        }
    }
}

#[async_trait]
impl Tool for FileOperationsTool {
    fn kind(&self) -> ToolKind {
        ToolKind::FileOperations
    }

    async fn execute(&self, input: ToolInput<'_>) -> Vec<Document> {
        let conversation_id = input.conversation_id;
        let operation = input.str_param("operation").unwrap_or("");
        let paths = input.list_param("path");
        tracing::info!(operation = %operation, paths = ?paths, "file_operations tool execute");

        if operation.is_empty() || paths.is_empty() {
            return vec![Document::error(
                format!(
                    "Missing required parameters: operation and path are required, current parameters: {}",
                    input.parameters
                ),
                conversation_id,
            )
            .source("FileOperationsTool")
            .description("Parameter validation error")
            .build()];
        }

        match operation {
            "list" => paths.iter().map(|p| self.list(p, conversation_id)).collect(),
            "read" => paths.iter().map(|p| self.read(p, conversation_id)).collect(),
            other => vec![Document::error(
                format!("Invalid operation: {}. Supported operations: list, read", other),
                conversation_id,
            )
            .name(other)
            .source("FileOperationsTool")
            .description("Invalid operation error")
            .build()],
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::memory::ContentType;

    async fn run(tool: &FileOperationsTool, params: serde_json::Value) -> Vec<Document> {
        tool.execute(ToolInput {
            parameters: &params,
            context: &[],
            conversation_id: "conv-1",
        })
        .await
    }

    #[test]
    fn test_resolve_rejects_escape() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("inner")).unwrap();
        let fs = SafeFs::new(dir.path().join("inner"));
        assert!(matches!(fs.resolve("../"), Err(AgentError::PathEscape(_))));
        assert!(matches!(fs.resolve("nope.txt"), Err(AgentError::PathNotFound(_))));
        assert!(fs.resolve(".").is_ok());
    }

    #[tokio::test]
    async fn test_read_and_list() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/notes.txt"), "hello").unwrap();
        let tool = FileOperationsTool::new(dir.path());

        let docs = run(&tool, json!({ "operation": "read", "path": "data/notes.txt" })).await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "hello");
        assert_eq!(docs[0].metadata.content_type, ContentType::Complete);

        let docs = run(&tool, json!({ "operation": "list", "path": ["data"] })).await;
        let entries: serde_json::Value = serde_json::from_str(&docs[0].text).unwrap();
        assert_eq!(entries[0]["name"], "notes.txt");
        assert_eq!(entries[0]["type"], "file");
        assert_eq!(entries[0]["size"], 5);
    }

    #[tokio::test]
    async fn test_errors_are_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        let tool = FileOperationsTool::new(dir.path());

        let docs = run(&tool, json!({ "operation": "read", "path": ["missing.txt", "data"] })).await;
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d.is_error() && !d.text.is_empty()));
        assert!(docs[1].text.contains("not a file"));

        let docs = run(&tool, json!({ "operation": "delete", "path": "data" })).await;
        assert!(docs[0].is_error());
        assert!(docs[0].text.contains("Invalid operation"));

        let docs = run(&tool, json!({})).await;
        assert!(docs[0].is_error());
    }
}
