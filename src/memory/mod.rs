//! 记忆层：对话消息、工具产出的 Document、工具调用记录 Action

pub mod action;
pub mod conversation;
pub mod document;

pub use action::Action;
pub use conversation::{Message, Role};
pub use document::{ContentType, Document, DocumentBuilder, DocumentMetadata};
