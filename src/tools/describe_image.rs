//! describe_image 工具：读图并交给视觉模型识别文字或描述内容
//!
//! 图片按文件名从数据目录（SafeFs 沙箱）读取，filePath 中的目录部分被忽略，
//! 因此 `data/agent/page19.png` 与 `page19.png` 指向同一文件。
//! base64 编码后以 data URL 发送；结果缓存为同目录下的 `<file>.txt`，再次调用直接返回缓存。

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::llm::{CompletionOptions, LlmClient, ModelHint};
use crate::memory::{Document, Message};
use crate::tools::{SafeFs, Tool, ToolInput, ToolKind};

const DESCRIBE_SYSTEM_PROMPT: &str = r#"You read images for an assistant that solves tasks.
<rules>
- if the image contains text, transcribe it exactly, keeping line breaks
- if there is no text, describe what the image shows, focusing on details named in the context
- do not add commentary or guesses that are not visible in the image
</rules>"#;

pub struct DescribeImageTool {
    fs: SafeFs,
    llm: Arc<dyn LlmClient>,
}

impl DescribeImageTool {
    pub fn new(data_dir: impl Into<PathBuf>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            fs: SafeFs::new(data_dir.into()),
            llm,
        }
    }

    fn error(&self, message: String, file: &str, conversation_id: &str) -> Document {
        Document::error(message, conversation_id)
            .name(file)
            .source("DescribeImageTool")
            .description("Image description error")
            .build()
    }

    async fn describe(&self, file: &str, hint: &str, input: &ToolInput<'_>) -> Result<String, String> {
        let path = self.fs.resolve(file).map_err(|e| e.to_string())?;
        if path == self.fs.root() {
            return Err(format!("Path is not a file: {}", file));
        }
        if !path.is_file() {
            return Err(format!("Path is not a file: {}", file));
        }
        let mut cache_path = path.clone().into_os_string();
        cache_path.push(".txt");
        let cache_path = PathBuf::from(cache_path);
        if let Ok(cached) = tokio::fs::read_to_string(&cache_path).await {
            tracing::info!(file = %file, "using cached image description");
            return Ok(cached);
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| format!("Error reading image: {}", e))?;
        let mime = mime_guess::from_path(&path).first_or_octet_stream();
        if mime.type_() != mime_guess::mime::IMAGE {
            return Err(format!("Not an image file: {} ({})", file, mime));
        }
        let data_url = format!("data:{};base64,{}", mime, STANDARD.encode(&bytes));

        let system = format!(
            "{}\n<context>\n{}\n</context>",
            DESCRIBE_SYSTEM_PROMPT,
            input.context_text()
        );
        let messages = vec![Message::system(system), Message::user_with_image(hint, data_url)];
        let description = self
            .llm
            .complete(&messages, &CompletionOptions::text(ModelHint::Default))
            .await
            .map_err(|e| e.to_string())?;

        if let Err(e) = tokio::fs::write(&cache_path, &description).await {
            tracing::warn!(file = %file, error = %e, "failed to cache image description");
        }
        Ok(description)
    }
}

/// filePath 的最后一段
fn file_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

#[async_trait]
impl Tool for DescribeImageTool {
    fn kind(&self) -> ToolKind {
        ToolKind::DescribeImage
    }

    async fn execute(&self, input: ToolInput<'_>) -> Vec<Document> {
        let conversation_id = input.conversation_id;
        let (Some(file), Some(hint)) = (input.str_param("filePath"), input.str_param("context")) else {
            return vec![Document::error(
                format!(
                    "Missing required parameters: filePath and context are required, current parameters: {}",
                    input.parameters
                ),
                conversation_id,
            )
            .source("DescribeImageTool")
            .description("Parameter validation error")
            .build()];
        };
        let file = file_name(file);
        tracing::info!(file = %file, "describe_image tool execute");

        let doc = match self.describe(file, hint, &input).await {
            Ok(text) => Document::new(text, conversation_id)
                .name(format!("{}.txt", file))
                .source(self.fs.root().join(file).display().to_string())
                .description(format!("Description of the image: {}", file))
                .build(),
            Err(e) => self.error(e, file, conversation_id),
        };
        vec![doc]
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::MockLlmClient;

    #[tokio::test]
    async fn test_describes_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("map.png"), [0x89, b'P', b'N', b'G']).unwrap();
        let llm = Arc::new(MockLlmClient::scripted(vec!["A street map of Grudziadz".to_string()]));
        let tool = DescribeImageTool::new(dir.path(), llm.clone());
        let params = json!({ "filePath": "map.png", "context": "which city is shown" });

        let docs = tool
            .execute(ToolInput { parameters: &params, context: &[], conversation_id: "c" })
            .await;
        assert_eq!(docs[0].text, "A street map of Grudziadz");
        assert!(dir.path().join("map.png.txt").exists());

        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].messages[1].images[0].starts_with("data:image/png;base64,"));

        // 第二次命中缓存，不再调用模型
        let docs = tool
            .execute(ToolInput { parameters: &params, context: &[], conversation_id: "c" })
            .await;
        assert_eq!(docs[0].text, "A street map of Grudziadz");
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_resolves_file_name_under_data_dir() {
        let root = tempfile::tempdir().unwrap();
        let data_dir = root.path().join("data").join("agent");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::write(data_dir.join("page19.png"), [0x89, b'P', b'N', b'G']).unwrap();
        let llm = Arc::new(MockLlmClient::scripted(vec!["Page nineteen".to_string()]));
        let tool = DescribeImageTool::new(&data_dir, llm.clone());

        for file in ["data/agent/page19.png", "/data/agent/page19.png", "./page19.png", "page19.png"] {
            let params = json!({ "filePath": file, "context": "extract all visible text" });
            let docs = tool
                .execute(ToolInput { parameters: &params, context: &[], conversation_id: "c" })
                .await;
            assert!(!docs[0].is_error(), "unexpected error for {}: {}", file, docs[0].text);
            assert_eq!(docs[0].text, "Page nineteen");
            assert_eq!(docs[0].metadata.name, "page19.png.txt");
        }
        assert!(data_dir.join("page19.png.txt").exists());
        assert_eq!(llm.call_count(), 1);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("data/agent/page19.png"), "page19.png");
        assert_eq!(file_name("page19.png"), "page19.png");
        assert_eq!(file_name("data/"), "data");
    }

    #[tokio::test]
    async fn test_errors_are_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "text").unwrap();
        let tool = DescribeImageTool::new(dir.path(), Arc::new(MockLlmClient::default()));

        for params in [
            json!({ "filePath": "map.png" }),
            json!({ "filePath": "missing.png", "context": "x" }),
            json!({ "filePath": "notes.txt", "context": "x" }),
            json!({ "filePath": "../etc/passwd", "context": "x" }),
        ] {
            let docs = tool
                .execute(ToolInput { parameters: &params, context: &[], conversation_id: "c" })
                .await;
            assert_eq!(docs.len(), 1);
            assert!(docs[0].is_error(), "expected error for {}", params);
        }
    }
}
