//! 对话历史：角色消息
//!
//! ConversationState 中的消息只追加、不剪枝；单次运行结束后随状态一起丢弃。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// 单条消息；images 为 data URL（仅 user 消息在视觉调用中使用）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            images: Vec::new(),
        }
    }

    /// 带图片的 user 消息（图片为 `data:<mime>;base64,...`）
    pub fn user_with_image(content: impl Into<String>, image_data_url: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            images: vec![image_data_url.into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_format() {
        let msg: Message = serde_json::from_str(r#"{"role":"user","content":"hi"}"#).unwrap();
        assert_eq!(msg.role, Role::User);
        assert!(msg.images.is_empty());
        let back = serde_json::to_string(&Message::assistant("ok")).unwrap();
        assert_eq!(back, r#"{"role":"assistant","content":"ok"}"#);
    }
}
