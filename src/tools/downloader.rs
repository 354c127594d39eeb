//! download_files 工具：并发下载任务文件
//!
//! 每个 URL 取最后一段路径作为文件名交给 CentralaApi（带本地缓存），成功和失败都各产出一个 Document。

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;

use crate::integrations::centrala::{last_segment, CentralaApi};
use crate::memory::Document;
use crate::tools::{Tool, ToolInput, ToolKind};

pub struct DownloadTool {
    api: Arc<dyn CentralaApi>,
    max_chars: usize,
}

impl DownloadTool {
    pub fn new(api: Arc<dyn CentralaApi>, max_chars: usize) -> Self {
        Self { api, max_chars }
    }

    async fn download(&self, url: &str, conversation_id: &str) -> Document {
        let Some(name) = last_segment(url) else {
            return Document::error(format!("Invalid url: {}", url), conversation_id)
                .name(url)
                .source(url)
                .description("Download error")
                .build();
        };
        match self.api.fetch_file(name).await {
            Ok(content) => Document::new(truncate(content, self.max_chars), conversation_id)
                .name(name)
                .source(url)
                .mime_type(mime_guess::from_path(name).first_or_text_plain().to_string())
                .description(format!("This is a result of a downloading from the url: {}", url))
                .build(),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "download failed");
                Document::error(format!("Error downloading {}: {}", url, e), conversation_id)
                    .name(name)
                    .source(url)
                    .description("Download error")
                    .build()
            }
        }
    }
}

fn truncate(content: String, max_chars: usize) -> String {
    if max_chars == 0 || content.chars().count() <= max_chars {
        return content;
    }
    let mut out: String = content.chars().take(max_chars).collect();
    out.push_str("\n\n[... truncated]");
    out
}

#[async_trait]
impl Tool for DownloadTool {
    fn kind(&self) -> ToolKind {
        ToolKind::DownloadFiles
    }

    async fn execute(&self, input: ToolInput<'_>) -> Vec<Document> {
        let urls = input.list_param("url");
        tracing::info!(urls = ?urls, "download_files tool execute");
        if urls.is_empty() {
            return vec![Document::error(
                format!("Missing required parameter: url, current parameters: {}", input.parameters),
                input.conversation_id,
            )
            .source("DownloadTool")
            .description("Parameter validation error")
            .build()];
        }
        join_all(urls.iter().map(|u| self.download(u, input.conversation_id))).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::integrations::CentralaResponse;

    struct FakeCentrala;

    #[async_trait]
    impl CentralaApi for FakeCentrala {
        async fn fetch_file(&self, name: &str) -> Result<String, String> {
            match name {
                "notes.json" => Ok(r#"["first question"]"#.to_string()),
                "long.txt" => Ok("x".repeat(50)),
                _ => Err("connection refused".to_string()),
            }
        }

        async fn submit(&self, _: &str, _: &str, _: Value, _: &str) -> Result<CentralaResponse, String> {
            Err("not used".to_string())
        }
    }

    async fn run(params: Value, max_chars: usize) -> Vec<Document> {
        let tool = DownloadTool::new(Arc::new(FakeCentrala), max_chars);
        tool.execute(ToolInput { parameters: &params, context: &[], conversation_id: "conv-1" })
            .await
    }

    #[tokio::test]
    async fn test_one_document_per_url() {
        let params = json!({ "url": ["https://c.example/data/KEY/notes.json", "https://c.example/gone.txt"] });
        let docs = run(params, 20_000).await;
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, r#"["first question"]"#);
        assert_eq!(docs[0].metadata.name, "notes.json");
        assert_eq!(docs[0].metadata.mime_type, "application/json");
        assert!(docs[1].is_error());
        assert!(docs[1].text.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_truncates_and_validates() {
        let docs = run(json!({ "url": "https://c.example/long.txt" }), 10).await;
        assert!(docs[0].text.starts_with("xxxxxxxxxx\n"));
        assert!(docs[0].text.ends_with("[... truncated]"));

        // 未超限的内容原样保留
        let docs = run(json!({ "url": "https://c.example/notes.json" }), 18).await;
        assert_eq!(docs[0].text, r#"["first question"]"#);

        let docs = run(json!({}), 10).await;
        assert_eq!(docs.len(), 1);
        assert!(docs[0].is_error());
    }
}
