//! 任务服务器（Centrala）客户端
//!
//! - submit：POST `<base>/<suffix>`，JSON body 为 `{task, apikey, [param_name]: payload}`；
//!   服务器在 4xx 时同样返回 `{code, message}`，这里照常解析，交给 Agent 作为观察结果。
//! - fetch_file：GET `<base>/data/<apikey>/<name>`，结果缓存到本地目录，后续运行直接读缓存；
//!   HTML 响应用 html2text 提取可读文本。

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use html2text::from_read;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 服务器应答：至少包含 message，可能附带 hint / code
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CentralaResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 任务服务器能力：下载任务文件、提交答案
#[async_trait]
pub trait CentralaApi: Send + Sync {
    async fn fetch_file(&self, name: &str) -> Result<String, String>;

    async fn submit(
        &self,
        task: &str,
        param_name: &str,
        payload: Value,
        endpoint_suffix: &str,
    ) -> Result<CentralaResponse, String>;
}

pub struct CentralaClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    cache_dir: PathBuf,
}

impl CentralaClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        cache_dir: impl Into<PathBuf>,
        timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            cache_dir: cache_dir.into(),
        }
    }

    fn api_key(&self) -> Result<&str, String> {
        self.api_key
            .as_deref()
            .ok_or_else(|| "Centrala API key not configured (centrala.api_key / POLIGON_API_KEY)".to_string())
    }

    fn endpoint(&self, path: &str) -> Result<String, String> {
        if self.base_url.is_empty() {
            return Err("Centrala base url not configured (centrala.base_url / CENTRALA_URL)".to_string());
        }
        Ok(format!("{}/{}", self.base_url, path))
    }

    fn read_cache(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.cache_dir.join(name)).ok()
    }

    fn write_cache(&self, name: &str, content: &str) {
        if let Err(e) = std::fs::create_dir_all(&self.cache_dir)
            .and_then(|_| std::fs::write(self.cache_dir.join(name), content))
        {
            tracing::warn!(name = %name, error = %e, "failed to cache downloaded file");
        }
    }
}

/// 请求体：task 为空时省略
pub fn submission_body(task: &str, api_key: &str, param_name: &str, payload: Value) -> Value {
    let mut body = Map::new();
    if !task.is_empty() {
        body.insert("task".to_string(), Value::String(task.to_string()));
    }
    body.insert("apikey".to_string(), Value::String(api_key.to_string()));
    body.insert(param_name.to_string(), payload);
    Value::Object(body)
}

/// URL 或后缀 -> 最后一段路径（`https://host/report` -> `report`）
pub fn last_segment(url: &str) -> Option<&str> {
    url.trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
}

#[async_trait]
impl CentralaApi for CentralaClient {
    async fn fetch_file(&self, name: &str) -> Result<String, String> {
        if let Some(cached) = self.read_cache(name) {
            tracing::info!(name = %name, "using cached file");
            return Ok(cached);
        }
        let url = self.endpoint(&format!("data/{}/{}", self.api_key()?, name))?;
        tracing::info!(name = %name, "downloading file from centrala");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("Failed to fetch {}: HTTP {}", name, resp.status()));
        }
        let mut body = resp.text().await.map_err(|e| format!("Read body: {}", e))?;
        if body.starts_with('\u{FEFF}') {
            body = body['\u{FEFF}'.len_utf8()..].to_string();
        }
        let body = if looks_like_html(&body) {
            html_to_text(&body)
        } else {
            body
        };
        self.write_cache(name, &body);
        Ok(body)
    }

    async fn submit(
        &self,
        task: &str,
        param_name: &str,
        payload: Value,
        endpoint_suffix: &str,
    ) -> Result<CentralaResponse, String> {
        let url = self.endpoint(endpoint_suffix)?;
        let body = submission_body(task, self.api_key()?, param_name, payload);
        tracing::info!(task = %task, url = %url, "submitting answer to centrala");
        let resp = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| format!("Read body: {}", e))?;
        if !status.is_success() {
            tracing::warn!(status = %status, body = %text, "centrala rejected submission");
        }
        serde_json::from_str::<CentralaResponse>(&text)
            .map_err(|e| format!("HTTP {} with non-JSON body ({}): {}", status, e, text))
    }
}

/// 判断内容是否像 HTML（需提取可读文本）
fn looks_like_html(s: &str) -> bool {
    let s = s.trim_start();
    s.starts_with("<!") || s.starts_with("<html") || s.starts_with("<HTML")
        || (s.len() > 20 && s.contains('<') && (s.contains("</") || s.contains("<head") || s.contains("<title")))
}

fn html_to_text(html: &str) -> String {
    match from_read(html.as_bytes(), 120) {
        Ok(text) if !text.trim().is_empty() => text,
        _ => html.to_string(),
    }
}
