//! Agent 构建器：统一的组件初始化逻辑
//!
//! CLI 与 Web 共用同一套组件：LLM 客户端、工具目录、执行器与各阶段实现。
//! 组件只读、可在多个会话间共享；会话状态由 agent::new_conversation 每次新建。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::AgentError;
use crate::integrations::{CentralaApi, CentralaClient};
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};
use crate::react::{AnswerSynthesizer, ContextSelector, Describer, Planner};
use crate::tools::{
    DatabaseSearchTool, DescribeImageTool, DownloadTool, FileOperationsTool, SendAnswerTool, ToolExecutor,
    ToolRegistry,
};

/// 预构建的 Agent 组件，可多会话共享
pub struct AgentComponents {
    pub llm: Arc<dyn LlmClient>,
    pub registry: Arc<ToolRegistry>,
    pub planner: Planner,
    pub describer: Describer,
    pub selector: ContextSelector,
    pub executor: ToolExecutor,
    pub answerer: AnswerSynthesizer,
    pub max_steps: usize,
}

/// 按 [llm].provider 创建客户端：openai（需 API Key）或 mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Result<Arc<dyn LlmClient>, AgentError> {
    match cfg.llm.provider.to_lowercase().as_str() {
        "openai" => {
            let api_key = cfg
                .llm_api_key()
                .ok_or_else(|| AgentError::Config("OPENAI_API_KEY (or llm.api_key) is not set".to_string()))?;
            tracing::info!("Using OpenAI LLM ({} / {})", cfg.llm.model, cfg.llm.mini_model);
            Ok(Arc::new(
                OpenAiClient::new(
                    cfg.llm.base_url.as_deref(),
                    &cfg.llm.model,
                    &cfg.llm.mini_model,
                    Some(&api_key),
                )
                .with_temperature(cfg.llm.temperature)
                .with_timeout(cfg.llm.timeouts.request),
            ))
        }
        "mock" => {
            tracing::warn!("Using Mock LLM");
            Ok(Arc::new(MockLlmClient::default()))
        }
        other => Err(AgentError::Config(format!("Unknown llm provider: {}", other))),
    }
}

/// Agent 构建器：默认从配置创建 LLM 与任务服务器客户端，测试可注入替身
pub struct AgentBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    centrala: Option<Arc<dyn CentralaApi>>,
    registry: Option<ToolRegistry>,
}

impl AgentBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            centrala: None,
            registry: None,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_centrala(mut self, centrala: Arc<dyn CentralaApi>) -> Self {
        self.centrala = Some(centrala);
        self
    }

    /// 覆盖默认工具目录
    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    fn build_centrala(&self) -> Arc<dyn CentralaApi> {
        let base_url = self.config.centrala_base_url().unwrap_or_else(|| {
            tracing::warn!("centrala base url not configured, download and submit tools will report errors");
            String::new()
        });
        Arc::new(CentralaClient::new(
            base_url,
            self.config.centrala_api_key(),
            &self.config.app.data_dir,
            self.config.centrala.timeout_secs,
        ))
    }

    /// 构建执行器：每个可执行的工具种类注册一个实例
    pub fn build_executor(&self, llm: Arc<dyn LlmClient>, centrala: Arc<dyn CentralaApi>) -> ToolExecutor {
        let tools = &self.config.tools;
        ToolExecutor::new(tools.tool_timeout_secs)
            .with_tool(DownloadTool::new(centrala.clone(), tools.max_download_chars))
            .with_tool(SendAnswerTool::new(centrala))
            .with_tool(DescribeImageTool::new(&self.config.app.data_dir, llm))
            .with_tool(FileOperationsTool::new(&self.config.app.workspace_root))
            .with_tool(DatabaseSearchTool::new(&tools.database_path))
    }

    pub fn build(self) -> Result<AgentComponents, AgentError> {
        let llm = match &self.llm {
            Some(llm) => llm.clone(),
            None => create_llm_from_config(&self.config)?,
        };
        let centrala = self.centrala.clone().unwrap_or_else(|| self.build_centrala());
        let executor = self.build_executor(llm.clone(), centrala);
        let registry = Arc::new(self.registry.unwrap_or_else(ToolRegistry::default_catalog));
        if let Some(missing) = registry
            .list_tools()
            .iter()
            .map(|t| t.name.as_str())
            .find(|name| *name != crate::tools::FINAL_ANSWER && !executor.can_execute(name))
        {
            return Err(AgentError::Config(format!("Registry tool {} has no handler", missing)));
        }

        Ok(AgentComponents {
            planner: Planner::new(llm.clone()),
            describer: Describer::new(llm.clone()),
            selector: ContextSelector::new(llm.clone()),
            answerer: AnswerSynthesizer::new(llm.clone()),
            llm,
            registry,
            executor,
            max_steps: self.config.agent.max_steps,
        })
    }
}
