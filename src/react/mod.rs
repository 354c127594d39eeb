//! 认知层：Planner、参数生成、上下文筛选、答案生成与编排主循环

pub mod answer;
pub mod context;
pub mod describe;
pub mod events;
pub mod loop_;
pub mod planner;
pub mod schema;
pub mod stages;

pub use answer::AnswerSynthesizer;
pub use context::{ContextResult, ContextSelector};
pub use describe::{Describer, ParameterResult};
pub use events::AgentEvent;
pub use loop_::{AgentLoop, AgentPhase};
pub use planner::{PlanResult, Planner};
pub use stages::{Answer, Describe, Plan, SelectContext, UseTool};
