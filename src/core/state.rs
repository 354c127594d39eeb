//! 会话状态：一次编排循环的全部可变上下文
//!
//! 每个外部触发（HTTP 请求或一次命令行调用）通过 ConversationState::new 构建一份独立状态，
//! 显式传入循环；工具注册表以 Arc 共享且只读，Document 与 Action 由本状态独占。

use std::sync::Arc;

use serde::Serialize;

use crate::memory::{Action, Document, Message, Role};
use crate::tools::{ToolDescriptor, ToolRegistry};

/// 当前正在执行的步骤（Planner 选出的工具与查询）
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActiveStep {
    pub name: String,
    pub query: String,
}

/// 步数预算与快速通道
#[derive(Clone, Debug, Serialize)]
pub struct StateConfig {
    pub max_steps: usize,
    pub current_step: usize,
    pub active_step: Option<ActiveStep>,
    /// 为 true 时循环不执行任何迭代，直接生成答案
    pub fast_track: bool,
}

impl StateConfig {
    pub fn new(max_steps: usize) -> Self {
        Self {
            max_steps,
            current_step: 0,
            active_step: None,
            fast_track: false,
        }
    }

    pub fn budget_exhausted(&self) -> bool {
        self.current_step >= self.max_steps
    }
}

pub struct ConversationState {
    pub conversation_id: String,
    pub config: StateConfig,
    messages: Vec<Message>,
    tools: Arc<ToolRegistry>,
    documents: Vec<Document>,
    actions: Vec<Action>,
}

impl ConversationState {
    pub fn new(conversation_id: impl Into<String>, tools: Arc<ToolRegistry>, max_steps: usize) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            config: StateConfig::new(max_steps),
            messages: Vec::new(),
            tools,
            documents: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// 以外部传入的消息作为初始历史；system 消息由各阶段自行构建，这里丢弃
    pub fn with_messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages
            .extend(messages.into_iter().filter(|m| m.role != Role::System));
        self
    }

    pub fn with_fast_track(mut self, fast_track: bool) -> Self {
        self.config.fast_track = fast_track;
        self
    }

    pub fn push_message(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        self.tools.list_tools()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// 写入一次工具调用：先追加产出的文档，再追加 Action 记录
    pub fn record_action(&mut self, action: Action) {
        self.documents.extend(action.results.iter().cloned());
        self.actions.push(action);
    }

    /// 所有 Action 的结果，按调用顺序展开
    pub fn action_results(&self) -> impl Iterator<Item = &Document> {
        self.actions.iter().flat_map(|a| a.results.iter())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use serde_json::json;

    fn state() -> ConversationState {
        ConversationState::new("conv-1", Arc::new(ToolRegistry::default_catalog()), 5)
    }

    #[test]
    fn test_system_messages_dropped() {
        let s = state().with_messages(vec![
            Message::system("ignored"),
            Message::user("pobierz plik"),
        ]);
        assert_eq!(s.messages().len(), 1);
        assert_eq!(s.last_message().unwrap().content, "pobierz plik");
    }

    #[test]
    fn test_record_action_appends_documents() {
        let mut s = state();
        for _ in 0..3 {
            let docs = vec![
                Document::new("a", "conv-1").build(),
                Document::new("b", "conv-1").build(),
            ];
            s.record_action(Action::new("file_operations", &json!({}), "read", vec![], docs));
        }
        assert_eq!(s.actions().len(), 3);
        assert_eq!(s.documents().len(), 6);
        assert_eq!(s.action_results().count(), 6);
        let ids: HashSet<_> = s.documents().iter().map(|d| d.uuid()).collect();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn test_budget() {
        let mut cfg = StateConfig::new(2);
        assert!(!cfg.budget_exhausted());
        cfg.current_step = 2;
        assert!(cfg.budget_exhausted());
        assert!(StateConfig::new(0).budget_exhausted());
    }
}
