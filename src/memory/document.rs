//! Document：工具产出的最小信息单元
//!
//! 每次工具调用（包括失败路径）都会产生 Document；创建后不可变，由 ConversationState 持有直到会话结束。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 内容完整性标记；error 表示该文档承载的是工具失败信息
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Complete,
    Chunk,
    Error,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Complete => "complete",
            ContentType::Chunk => "chunk",
            ContentType::Error => "error",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub uuid: Uuid,
    pub source_uuid: Uuid,
    pub conversation_uuid: String,
    /// 来源标记：产生它的工具 / 协作方，或 URL、文件路径
    pub source: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub content_type: ContentType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// 构建一个 complete 文档，默认 text/plain
    pub fn new(text: impl Into<String>, conversation_uuid: &str) -> DocumentBuilder {
        DocumentBuilder {
            text: text.into(),
            conversation_uuid: conversation_uuid.to_string(),
            source: "generated".to_string(),
            name: "Generated Document".to_string(),
            mime_type: "text/plain".to_string(),
            description: None,
            content_type: ContentType::Complete,
        }
    }

    /// 错误文档：text 为可读的错误信息，保证非空
    pub fn error(message: impl Into<String>, conversation_uuid: &str) -> DocumentBuilder {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "Unknown tool error".to_string();
        }
        Document::new(message, conversation_uuid)
            .name("error")
            .content_type(ContentType::Error)
    }

    pub fn uuid(&self) -> Uuid {
        self.metadata.uuid
    }

    pub fn is_error(&self) -> bool {
        self.metadata.content_type == ContentType::Error
    }
}

/// Document 构建器：uuid / source_uuid 在 build 时生成
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    text: String,
    conversation_uuid: String,
    source: String,
    name: String,
    mime_type: String,
    description: Option<String>,
    content_type: ContentType,
}

impl DocumentBuilder {
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn build(self) -> Document {
        Document {
            text: self.text,
            metadata: DocumentMetadata {
                uuid: Uuid::new_v4(),
                source_uuid: Uuid::new_v4(),
                conversation_uuid: self.conversation_uuid,
                source: self.source,
                name: self.name,
                mime_type: self.mime_type,
                description: self.description,
                content_type: self.content_type,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_document_never_empty() {
        let doc = Document::error("   ", "conv-1").source("FileOperationsTool").build();
        assert!(doc.is_error());
        assert!(!doc.text.trim().is_empty());
        assert_eq!(doc.metadata.source, "FileOperationsTool");
    }

    #[test]
    fn test_metadata_wire_format() {
        let doc = Document::new("payload", "conv-1")
            .name("notes.txt")
            .description("File content for: notes.txt")
            .build();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["metadata"]["content_type"], "complete");
        assert_eq!(json["metadata"]["conversation_uuid"], "conv-1");
        assert_eq!(json["metadata"]["mime_type"], "text/plain");
        assert_ne!(json["metadata"]["uuid"], json["metadata"]["source_uuid"]);
    }
}
