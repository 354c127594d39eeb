//! Headless Agent 运行时
//!
//! 供 CLI 与 HTTP 前端调用：new_conversation 为每次触发新建一份会话状态，
//! run_agent 在该状态上跑完整的编排循环并返回答案与最终状态。

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::{AgentComponents, AgentError, ConversationState};
use crate::memory::Message;
use crate::react::{AgentEvent, AgentLoop};

/// 一次运行的结果：最终答案与运行后的会话状态（含文档与 Action 记录）
pub struct AgentRun {
    pub answer: String,
    pub state: ConversationState,
}

/// 会话状态工厂：每次调用返回互不共享的新状态，工具目录以 Arc 共享
pub fn new_conversation(
    components: &AgentComponents,
    messages: Vec<Message>,
    conversation_id: Option<String>,
) -> ConversationState {
    let conversation_id = conversation_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    ConversationState::new(conversation_id, components.registry.clone(), components.max_steps)
        .with_messages(messages)
}

/// 对给定消息跑一次完整循环；可选 event_tx 推送过程事件
pub async fn run_agent(
    components: &AgentComponents,
    messages: Vec<Message>,
    conversation_id: Option<String>,
    event_tx: Option<mpsc::UnboundedSender<AgentEvent>>,
) -> Result<AgentRun, AgentError> {
    let mut state = new_conversation(components, messages, conversation_id);
    tracing::info!(
        conversation = %state.conversation_id,
        messages = state.messages().len(),
        max_steps = state.config.max_steps,
        "agent run started"
    );

    let mut agent = AgentLoop::new(
        &components.planner,
        &components.describer,
        &components.selector,
        &components.executor,
        &components.answerer,
    );
    if let Some(tx) = event_tx.as_ref() {
        agent = agent.with_event_tx(tx);
    }
    let answer = agent.run(&mut state).await?;

    let (prompt, completion, total) = components.llm.token_usage();
    tracing::info!(
        conversation = %state.conversation_id,
        actions = state.actions().len(),
        prompt_tokens = prompt,
        completion_tokens = completion,
        total_tokens = total,
        "agent run finished"
    );
    Ok(AgentRun { answer, state })
}

/// 单条用户输入的便捷入口
pub async fn process_message(components: &AgentComponents, user_input: &str) -> Result<String, AgentError> {
    run_agent(components, vec![Message::user(user_input)], None, None)
        .await
        .map(|run| run.answer)
}
