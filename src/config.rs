//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `DRONE__*` 覆盖（双下划线表示嵌套，如 `DRONE__AGENT__MAX_STEPS=8`）。
//! 密钥与服务地址未配置时回退到 OPENAI_API_KEY / CENTRALA_URL / POLIGON_API_KEY。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub agent: AgentSection,
    pub llm: LlmSection,
    pub centrala: CentralaSection,
    pub tools: ToolsSection,
    pub web: WebSection,
}

/// [app] 段：工作目录与数据目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// file_operations 的沙箱根目录，应包含 data_dir
    pub workspace_root: PathBuf,
    /// 下载缓存、图片与描述缓存所在目录
    pub data_dir: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("."),
            data_dir: PathBuf::from("./data/agent"),
        }
    }
}

/// [agent] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub max_steps: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self { max_steps: 5 }
    }
}

/// [llm] 段：OpenAI 兼容后端、主模型与轻量模型
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// openai / mock
    pub provider: String,
    pub model: String,
    /// 上下文筛选使用的轻量模型
    pub mini_model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            mini_model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key: None,
            temperature: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [centrala] 段：任务服务器
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CentralaSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CentralaSection {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// [tools] 段：工具超时、检索数据库、下载内容上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    pub database_path: PathBuf,
    /// 单个下载文档的最大字符数，0 表示不截断
    pub max_download_chars: usize,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 60,
            database_path: PathBuf::from("./data/knowledge.db"),
            max_download_chars: 20_000,
        }
    }
}

/// [web] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebSection {
    pub bind: String,
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// LLM API Key：配置优先，其次 OPENAI_API_KEY
    pub fn llm_api_key(&self) -> Option<String> {
        self.llm
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| env_non_empty("OPENAI_API_KEY"))
    }

    pub fn centrala_base_url(&self) -> Option<String> {
        self.centrala
            .base_url
            .clone()
            .filter(|u| !u.is_empty())
            .or_else(|| env_non_empty("CENTRALA_URL"))
    }

    pub fn centrala_api_key(&self) -> Option<String> {
        self.centrala
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| env_non_empty("POLIGON_API_KEY"))
    }

    /// 创建工作目录与数据目录
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.app.workspace_root)?;
        std::fs::create_dir_all(&self.app.data_dir)
    }
}

/// 从 config 目录加载配置，环境变量 DRONE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 DRONE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default", "default"] {
        if std::path::Path::new(&format!("{}.toml", name)).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path.filter(|p| p.exists()) {
        builder = builder.add_source(config::File::from(path).required(false));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("DRONE")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
