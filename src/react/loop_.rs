//! 编排主循环（显式状态机）
//!
//! Planning -> Describing -> SelectingContext -> Executing -> Planning ... -> Answering -> Done。
//! 每次 Executing 后 current_step + 1，步数用尽或 fast_track 时直接进入 Answering。
//! 各阶段通过 trait 注入，可选 event_tx 向 CLI / Web 推送过程事件。

use tokio::sync::mpsc::UnboundedSender;

use crate::core::{ActiveStep, AgentError, ConversationState};
use crate::memory::{Document, Message};
use crate::react::stages::{Answer, Describe, Plan, SelectContext, UseTool};
use crate::react::{AgentEvent, ParameterResult};
use crate::tools::{ToolKind, FINAL_ANSWER};

/// Observation 预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 循环所处阶段
#[derive(Debug, Clone, PartialEq)]
pub enum AgentPhase {
    Planning,
    Describing {
        tool: String,
        query: String,
    },
    SelectingContext {
        tool: String,
        query: String,
        parameters: ParameterResult,
    },
    Executing {
        tool: String,
        query: String,
        parameters: ParameterResult,
        context: Vec<Document>,
    },
    Answering,
    Done(String),
}

/// 一次运行所需的全部阶段实现（借用，由调用方持有）
pub struct AgentLoop<'a> {
    planner: &'a dyn Plan,
    describer: &'a dyn Describe,
    selector: &'a dyn SelectContext,
    executor: &'a dyn UseTool,
    answerer: &'a dyn Answer,
    event_tx: Option<&'a UnboundedSender<AgentEvent>>,
}

impl<'a> AgentLoop<'a> {
    pub fn new(
        planner: &'a dyn Plan,
        describer: &'a dyn Describe,
        selector: &'a dyn SelectContext,
        executor: &'a dyn UseTool,
        answerer: &'a dyn Answer,
    ) -> Self {
        Self {
            planner,
            describer,
            selector,
            executor,
            answerer,
            event_tx: None,
        }
    }

    /// 设置事件推送通道
    pub fn with_event_tx(mut self, tx: &'a UnboundedSender<AgentEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn send_event(&self, ev: AgentEvent) {
        if let Some(tx) = self.event_tx {
            let _ = tx.send(ev);
        }
    }

    /// 单步状态转移
    pub async fn step(&self, phase: AgentPhase, state: &mut ConversationState) -> Result<AgentPhase, AgentError> {
        match phase {
            AgentPhase::Planning => {
                if state.config.fast_track || state.config.budget_exhausted() {
                    return Ok(AgentPhase::Answering);
                }
                self.send_event(AgentEvent::StepUpdate {
                    step: state.config.current_step + 1,
                    max_steps: state.config.max_steps,
                });
                let plan = self.planner.plan(state).await?;
                self.send_event(AgentEvent::Plan {
                    reasoning: plan.reasoning.clone(),
                    tool: plan.tool.clone(),
                    query: plan.query.clone(),
                });
                let Some(tool) = plan.next_tool() else {
                    state.config.active_step = Some(ActiveStep {
                        name: FINAL_ANSWER.to_string(),
                        query: plan.query,
                    });
                    return Ok(AgentPhase::Answering);
                };
                let executable = ToolKind::from_name(tool).is_some_and(|k| k.is_executable());
                if !executable || !state.registry().contains(tool) {
                    tracing::warn!(tool = %tool, "planner chose a tool outside the registry");
                    return Err(AgentError::UnknownTool(tool.to_string()));
                }
                let tool = tool.to_string();
                state.config.active_step = Some(ActiveStep {
                    name: tool.clone(),
                    query: plan.query.clone(),
                });
                Ok(AgentPhase::Describing { tool, query: plan.query })
            }
            AgentPhase::Describing { tool, query } => {
                let parameters = self.describer.describe(&tool, &query, state).await?;
                self.send_event(AgentEvent::Parameters {
                    tool: tool.clone(),
                    parameters: parameters.to_value(),
                });
                Ok(AgentPhase::SelectingContext { tool, query, parameters })
            }
            AgentPhase::SelectingContext { tool, query, parameters } => {
                let context = self.selector.select_context(&tool, &query, &parameters, state).await?;
                self.send_event(AgentEvent::ContextSelected {
                    tool: tool.clone(),
                    uuids: context.iter().map(|d| d.uuid().to_string()).collect(),
                });
                Ok(AgentPhase::Executing {
                    tool,
                    query,
                    parameters,
                    context,
                })
            }
            AgentPhase::Executing {
                tool,
                parameters,
                context,
                ..
            } => {
                self.executor
                    .use_tool(state, &tool, &parameters.to_value(), &context)
                    .await?;
                state.config.current_step += 1;
                if let Some(action) = state.actions().last() {
                    let errors = action.results.iter().filter(|d| d.is_error()).count();
                    if errors > 0 {
                        tracing::warn!(tool = %tool, errors, "tool returned error documents");
                    }
                    self.send_event(AgentEvent::Observation {
                        tool: tool.clone(),
                        documents: action.results.len(),
                        errors,
                        preview: preview(&action.results),
                    });
                }
                Ok(AgentPhase::Planning)
            }
            AgentPhase::Answering => {
                let answer = self.answerer.answer(state).await?;
                state.push_message(Message::assistant(answer.clone()));
                self.send_event(AgentEvent::Answer { text: answer.clone() });
                Ok(AgentPhase::Done(answer))
            }
            done @ AgentPhase::Done(_) => Ok(done),
        }
    }

    /// 从 Planning 运行到 Done，返回最终答案（已追加到消息历史）
    pub async fn run(&self, state: &mut ConversationState) -> Result<String, AgentError> {
        let mut phase = AgentPhase::Planning;
        loop {
            phase = match self.step(phase, state).await {
                Ok(AgentPhase::Done(answer)) => return Ok(answer),
                Ok(next) => next,
                Err(e) => {
                    tracing::error!(error = %e, step = state.config.current_step, "agent loop failed");
                    self.send_event(AgentEvent::Error { text: e.to_string() });
                    return Err(e);
                }
            };
        }
    }
}

fn preview(docs: &[Document]) -> String {
    let text = docs.first().map(|d| d.text.as_str()).unwrap_or("");
    if text.chars().count() > OBSERVATION_PREVIEW_CHARS {
        format!("{}...", text.chars().take(OBSERVATION_PREVIEW_CHARS).collect::<String>())
    } else {
        text.to_string()
    }
}
